//! Token identity and the stablecoin guard.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub address: String,
    pub name: String,
    pub decimals: Option<u8>,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Token {
            name: symbol.clone(),
            symbol,
            address: address.into(),
            decimals: None,
        }
    }

    /// Pegged assets carry no directional edge and never get signals.
    pub fn is_stablecoin(&self) -> bool {
        is_stablecoin_symbol(&self.symbol)
    }
}

const STABLECOINS: &[&str] = &[
    "USDT", "USDC", "DAI", "BUSD", "TUSD", "FRAX", "USDD", "USDP", "GUSD", "PYUSD", "FDUSD",
    "UST", "USDN",
];

pub fn is_stablecoin_symbol(symbol: &str) -> bool {
    let upper = symbol.trim().to_ascii_uppercase();
    STABLECOINS.contains(&upper.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolListError {
    #[error("empty symbol in list")]
    EmptyToken,
    #[error("duplicate symbol: {0}")]
    Duplicate(String),
}

/// Parse a comma-separated symbol list, uppercasing and trimming each entry.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, SymbolListError> {
    let mut symbols = Vec::new();
    for part in input.split(',') {
        let symbol = part.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(SymbolListError::EmptyToken);
        }
        if symbols.contains(&symbol) {
            return Err(SymbolListError::Duplicate(symbol));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stablecoins_detected_case_insensitively() {
        assert!(Token::new("usdc", "addr").is_stablecoin());
        assert!(is_stablecoin_symbol("PYUSD"));
        assert!(!is_stablecoin_symbol("SOL"));
        assert!(!is_stablecoin_symbol("USDCX"));
    }

    #[test]
    fn new_defaults_name_to_symbol() {
        let token = Token::new("JUP", "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN");
        assert_eq!(token.name, "JUP");
        assert_eq!(token.decimals, None);
    }

    #[test]
    fn parse_symbols_basic() {
        let result = parse_symbols("  sol , jup,BONK ").unwrap();
        assert_eq!(result, vec!["SOL", "JUP", "BONK"]);
    }

    #[test]
    fn parse_symbols_empty_token() {
        assert_eq!(parse_symbols("SOL,,JUP"), Err(SymbolListError::EmptyToken));
    }

    #[test]
    fn parse_symbols_duplicate() {
        assert_eq!(
            parse_symbols("SOL,JUP,sol"),
            Err(SymbolListError::Duplicate("SOL".into()))
        );
    }
}
