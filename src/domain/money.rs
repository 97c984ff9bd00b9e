use std::fmt;

/// Charge amounts are plain floating-point currency values, as persisted in the
/// `valor` field. Display always uses two decimals.
pub type Amount = f64;

/// Format an amount with two decimals.
/// Example: 50.0 -> "50.00", 1234.5 -> "1234.50"
pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount)
}

/// Format an amount as Brazilian reais, the way the reports print it.
/// Example: 50.0 -> "R$ 50.00"
pub fn format_brl(amount: Amount) -> String {
    format!("R$ {}", format_amount(amount))
}

/// Coerce user input into an amount.
/// Accepts anything `f64` parsing accepts after trimming ("50", "12.5", "1e3"),
/// but rejects NaN and infinities.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let amount: f64 = trimmed
        .parse()
        .map_err(|_| ParseAmountError::NotNumeric(trimmed.to_string()))?;

    if !amount.is_finite() {
        return Err(ParseAmountError::NotFinite(trimmed.to_string()));
    }

    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    NotNumeric(String),
    NotFinite(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::NotNumeric(s) => write!(f, "'{}' is not a number", s),
            ParseAmountError::NotFinite(s) => write!(f, "'{}' is not a finite amount", s),
        }
    }
}

impl std::error::Error for ParseAmountError {}
