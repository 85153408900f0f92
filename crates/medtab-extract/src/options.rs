use std::str::FromStr;

use crate::error::ExtractError;

pub const DEFAULT_MAX_LINES: usize = 10_000;
pub const DEFAULT_MAX_COLUMNS: usize = 64;

/// What to do when the input has more lines than `max_lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowMode {
    Truncate,
    Strict,
}

impl FromStr for OverflowMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "invalid overflow mode '{other}', expected truncate or strict"
            )),
        }
    }
}

/// How data lines are cut into cells once the header columns are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeMode {
    /// Anchor on whitespace-separated segments and place them under the
    /// header columns they overlap.
    Aligned,
    /// Slice each line at the header's character offsets.
    Fixed,
}

impl FromStr for TokenizeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "aligned" => Ok(Self::Aligned),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!(
                "invalid tokenize mode '{other}', expected aligned or fixed"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub max_lines: usize,
    pub max_columns: usize,
    pub overflow: OverflowMode,
    pub tokenize_mode: TokenizeMode,
    pub delimiter: u8,
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.max_lines == 0 {
            return Err(ExtractError::InvalidOption(
                "max_lines must be at least 1".to_string(),
            ));
        }
        if self.max_columns < 2 {
            return Err(ExtractError::InvalidOption(
                "max_columns must be at least 2".to_string(),
            ));
        }
        if !self.delimiter.is_ascii() || self.delimiter == b'"' {
            return Err(ExtractError::InvalidOption(
                "delimiter must be an ASCII character other than '\"'".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            max_columns: DEFAULT_MAX_COLUMNS,
            overflow: OverflowMode::Truncate,
            tokenize_mode: TokenizeMode::Aligned,
            delimiter: b',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtractOptions, OverflowMode, TokenizeMode};
    use std::str::FromStr;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!(
            OverflowMode::from_str("Strict").expect("mode should parse"),
            OverflowMode::Strict
        );
        assert_eq!(
            TokenizeMode::from_str(" fixed ").expect("mode should parse"),
            TokenizeMode::Fixed
        );
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = TokenizeMode::from_str("grid").expect_err("unknown mode should fail");
        assert!(err.contains("expected aligned or fixed"));
    }

    #[test]
    fn rejects_degenerate_limits() {
        let options = ExtractOptions {
            max_columns: 1,
            ..ExtractOptions::default()
        };
        assert!(options.validate().is_err());

        let options = ExtractOptions {
            max_lines: 0,
            ..ExtractOptions::default()
        };
        assert!(options.validate().is_err());

        assert!(ExtractOptions::default().validate().is_ok());
    }
}
