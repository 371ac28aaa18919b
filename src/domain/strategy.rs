//! Declarative strategy definitions: weighted signal rules plus risk rules.

use crate::domain::condition::{Condition, Indicator};
use crate::domain::error::CallerError;
use crate::domain::trade::Side;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Rsi,
    Macd,
    Trend,
    SupportResistance,
    Volume,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Long,
    Short,
    Exit,
}

impl RuleAction {
    pub fn side(&self) -> Option<Side> {
        match self {
            RuleAction::Long => Some(Side::Long),
            RuleAction::Short => Some(Side::Short),
            RuleAction::Exit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRule {
    pub kind: RuleKind,
    pub action: RuleAction,
    pub condition: Condition,
    /// Entry score added when the condition matches, in (0, 100].
    pub weight: f64,
}

impl SignalRule {
    pub fn new(kind: RuleKind, action: RuleAction, condition: Condition, weight: f64) -> Self {
        SignalRule {
            kind,
            action,
            condition,
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopLossRule {
    FixedPercent(f64),
    Atr {
        multiplier: f64,
    },
    /// Below the nearest support (above resistance for shorts) by
    /// `buffer_percent`, and at least `min_distance_percent` from entry.
    SupportLevel {
        buffer_percent: f64,
        min_distance_percent: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TakeProfitRule {
    FixedPercent(f64),
    /// Target at `ratio` times the initial risk.
    RiskReward(f64),
    /// No fixed target; the stop trails the best price by this percent.
    Trailing(f64),
}

impl Default for StopLossRule {
    fn default() -> Self {
        StopLossRule::FixedPercent(5.0)
    }
}

impl Default for TakeProfitRule {
    fn default() -> Self {
        TakeProfitRule::FixedPercent(10.0)
    }
}

impl fmt::Display for StopLossRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopLossRule::FixedPercent(p) => write!(f, "FIXED_PERCENT {p}%"),
            StopLossRule::Atr { multiplier } => write!(f, "ATR x{multiplier}"),
            StopLossRule::SupportLevel { buffer_percent, .. } => {
                write!(f, "SUPPORT_LEVEL -{buffer_percent}%")
            }
        }
    }
}

impl fmt::Display for TakeProfitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakeProfitRule::FixedPercent(p) => write!(f, "FIXED_PERCENT {p}%"),
            TakeProfitRule::RiskReward(r) => write!(f, "RISK_REWARD {r}R"),
            TakeProfitRule::Trailing(p) => write!(f, "TRAILING {p}%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub signals: Vec<SignalRule>,
    pub stop_loss: StopLossRule,
    pub take_profit: TakeProfitRule,
}

impl Strategy {
    pub fn entry_rules(&self) -> impl Iterator<Item = &SignalRule> {
        self.signals.iter().filter(|r| r.action != RuleAction::Exit)
    }

    pub fn exit_rules(&self) -> impl Iterator<Item = &SignalRule> {
        self.signals.iter().filter(|r| r.action == RuleAction::Exit)
    }

    pub fn needs_levels(&self) -> bool {
        matches!(self.stop_loss, StopLossRule::SupportLevel { .. })
            || self.signals.iter().any(|r| r.condition.needs_levels())
    }

    pub fn validate(&self) -> Result<(), CallerError> {
        let invalid = |reason: String| CallerError::StrategyInvalid {
            strategy: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        if self.entry_rules().next().is_none() {
            return Err(invalid("at least one LONG or SHORT rule is required".into()));
        }

        for (i, rule) in self.signals.iter().enumerate() {
            if !(rule.weight > 0.0 && rule.weight <= 100.0) {
                return Err(invalid(format!(
                    "rule {} weight {} outside (0, 100]",
                    i + 1,
                    rule.weight
                )));
            }
            if let Condition::All(children) = &rule.condition
                && children.is_empty()
            {
                return Err(invalid(format!("rule {} has an empty condition group", i + 1)));
            }
            if !fits(rule.kind, &rule.condition) {
                return Err(invalid(format!(
                    "rule {} condition '{}' does not match its rule type",
                    i + 1,
                    rule.condition
                )));
            }
        }

        let positive = |v: f64| v.is_finite() && v > 0.0;
        let stop_ok = match self.stop_loss {
            StopLossRule::FixedPercent(p) => positive(p) && p < 100.0,
            StopLossRule::Atr { multiplier } => positive(multiplier),
            StopLossRule::SupportLevel {
                buffer_percent,
                min_distance_percent,
            } => buffer_percent >= 0.0 && positive(min_distance_percent),
        };
        if !stop_ok {
            return Err(invalid(format!("invalid stop-loss rule {}", self.stop_loss)));
        }

        let target_ok = match self.take_profit {
            TakeProfitRule::FixedPercent(p) | TakeProfitRule::RiskReward(p) => positive(p),
            TakeProfitRule::Trailing(p) => positive(p) && p < 100.0,
        };
        if !target_ok {
            return Err(invalid(format!(
                "invalid take-profit rule {}",
                self.take_profit
            )));
        }

        Ok(())
    }
}

/// Whether every leaf of `condition` reads an indicator of the rule's kind.
fn fits(kind: RuleKind, condition: &Condition) -> bool {
    condition.leaves().iter().all(|leaf| match (kind, leaf) {
        (RuleKind::Combined, _) => true,
        (
            RuleKind::Rsi,
            Condition::Threshold {
                indicator: Indicator::Rsi,
                ..
            },
        ) => true,
        (
            RuleKind::Macd,
            Condition::Threshold {
                indicator: Indicator::MacdHistogram | Indicator::MacdLine,
                ..
            }
            | Condition::MacdCross(_),
        ) => true,
        (RuleKind::Trend, Condition::Trend(_)) => true,
        (
            RuleKind::SupportResistance,
            Condition::PriceAt(_)
            | Condition::Threshold {
                indicator: Indicator::Price,
                ..
            },
        ) => true,
        (
            RuleKind::Volume,
            Condition::Threshold {
                indicator: Indicator::VolumeRatio,
                ..
            },
        ) => true,
        _ => false,
    })
}
