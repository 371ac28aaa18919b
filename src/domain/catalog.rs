//! Built-in strategy catalog.

use crate::domain::condition::{Condition, CrossDirection, Indicator};
use crate::domain::error::CallerError;
use crate::domain::indicator::TrendDirection;
use crate::domain::strategy::{
    RuleAction, RuleKind, SignalRule, StopLossRule, Strategy, TakeProfitRule,
};

fn rsi_rule(action: RuleAction, condition: Condition, weight: f64) -> SignalRule {
    SignalRule::new(RuleKind::Rsi, action, condition, weight)
}

fn fixed(
    name: &str,
    description: &str,
    signals: Vec<SignalRule>,
    stop_percent: f64,
    target_percent: f64,
) -> Strategy {
    Strategy {
        name: name.to_string(),
        description: description.to_string(),
        signals,
        stop_loss: StopLossRule::FixedPercent(stop_percent),
        take_profit: TakeProfitRule::FixedPercent(target_percent),
    }
}

/// RSI long with the given entry/exit thresholds.
fn rsi_long(
    name: &str,
    description: &str,
    entry_below: f64,
    entry_weight: f64,
    exit_above: f64,
    stop_percent: f64,
    target_percent: f64,
) -> Strategy {
    fixed(
        name,
        description,
        vec![
            rsi_rule(
                RuleAction::Long,
                Condition::below(Indicator::Rsi, entry_below),
                entry_weight,
            ),
            rsi_rule(
                RuleAction::Exit,
                Condition::above(Indicator::Rsi, exit_above),
                50.0,
            ),
        ],
        stop_percent,
        target_percent,
    )
}

pub fn rsi_oversold_long() -> Strategy {
    rsi_long(
        "RSI Oversold Long",
        "Buy when RSI drops below 30 (oversold), sell when RSI exceeds 70 or hits stop-loss",
        30.0,
        60.0,
        70.0,
        5.0,
        10.0,
    )
}

pub fn rsi_extreme_oversold() -> Strategy {
    rsi_long(
        "RSI Extreme Oversold",
        "Buy only when RSI drops below 25 (extreme oversold)",
        25.0,
        70.0,
        65.0,
        7.0,
        15.0,
    )
}

pub fn rsi_overbought_short() -> Strategy {
    fixed(
        "RSI Overbought Short",
        "Short when RSI exceeds 70 (overbought), cover when RSI drops below 30",
        vec![
            rsi_rule(RuleAction::Short, Condition::above(Indicator::Rsi, 70.0), 60.0),
            rsi_rule(RuleAction::Exit, Condition::below(Indicator::Rsi, 30.0), 50.0),
        ],
        5.0,
        10.0,
    )
}

pub fn rsi_trend_aligned() -> Strategy {
    fixed(
        "RSI + Trend Alignment",
        "Buy oversold RSI only when overall trend is bullish",
        vec![
            rsi_rule(RuleAction::Long, Condition::below(Indicator::Rsi, 35.0), 40.0),
            SignalRule::new(
                RuleKind::Trend,
                RuleAction::Long,
                Condition::Trend(TrendDirection::Up),
                30.0,
            ),
            rsi_rule(RuleAction::Exit, Condition::above(Indicator::Rsi, 65.0), 50.0),
        ],
        4.0,
        12.0,
    )
}

pub fn macd_crossover() -> Strategy {
    fixed(
        "MACD Crossover",
        "Buy when MACD crosses above signal line, sell on bearish cross",
        vec![
            SignalRule::new(
                RuleKind::Macd,
                RuleAction::Long,
                Condition::MacdCross(CrossDirection::Above),
                60.0,
            ),
            SignalRule::new(
                RuleKind::Macd,
                RuleAction::Exit,
                Condition::MacdCross(CrossDirection::Below),
                50.0,
            ),
        ],
        6.0,
        12.0,
    )
}

pub fn rsi_macd_combo() -> Strategy {
    fixed(
        "RSI + MACD Combined",
        "Buy when both RSI is oversold and MACD is bullish",
        vec![
            rsi_rule(RuleAction::Long, Condition::below(Indicator::Rsi, 35.0), 35.0),
            SignalRule::new(
                RuleKind::Macd,
                RuleAction::Long,
                Condition::above(Indicator::MacdHistogram, 0.0),
                35.0,
            ),
            rsi_rule(RuleAction::Exit, Condition::above(Indicator::Rsi, 70.0), 50.0),
        ],
        5.0,
        15.0,
    )
}

pub fn rsi_conservative() -> Strategy {
    rsi_long(
        "Conservative RSI",
        "Tight stops and modest targets for higher win rate",
        30.0,
        60.0,
        55.0,
        3.0,
        6.0,
    )
}

pub fn rsi_aggressive() -> Strategy {
    rsi_long(
        "Aggressive RSI",
        "Wide stops and large targets for maximum profit potential",
        30.0,
        60.0,
        75.0,
        8.0,
        20.0,
    )
}

/// Every built-in strategy, in catalog order.
pub fn all() -> Vec<Strategy> {
    vec![
        rsi_oversold_long(),
        rsi_extreme_oversold(),
        rsi_overbought_short(),
        rsi_trend_aligned(),
        macd_crossover(),
        rsi_macd_combo(),
        rsi_conservative(),
        rsi_aggressive(),
    ]
}

pub fn names() -> Vec<String> {
    all().into_iter().map(|s| s.name).collect()
}

/// Case-insensitive lookup by name.
pub fn find(name: &str) -> Result<Strategy, CallerError> {
    let wanted = name.trim();
    all()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| CallerError::UnknownStrategy(name.to_string()))
}
