//! token amounts in smallest denomination, and the recipient selections built
//! from them.

use num_traits::checked_pow;
use serde::Deserialize;
use serde::Serialize;

use crate::models::address;

/// An ERC-20 token (or the wrapped base token).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A spendable balance of one token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: TokenInfo,
    pub amount: u128,
}

/// One (token, amount, recipient) entry of a transaction.
///
/// `amount` must be positive. Entries sharing a (token, recipient) pair are
/// summed by [`consolidate`] before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAmount {
    pub token_address: String,
    pub amount: u128,
    pub recipient_address: String,
    pub decimals: u8,
    pub symbol: String,
}

impl SelectedAmount {
    pub fn new(token: &TokenInfo, amount: u128, recipient_address: impl Into<String>) -> Self {
        Self {
            token_address: token.address.clone(),
            amount,
            recipient_address: recipient_address.into(),
            decimals: token.decimals,
            symbol: token.symbol.clone(),
        }
    }

    pub fn token(&self) -> TokenInfo {
        TokenInfo {
            address: self.token_address.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
        }
    }

    fn key(&self) -> (String, String) {
        (
            address::normalize(&self.token_address),
            address::normalize(&self.recipient_address),
        )
    }

    /// amount formatted with the token's decimals, eg `1.5 WETH`
    pub fn display_amount(&self) -> String {
        format!("{} {}", format_units(self.amount, self.decimals), self.symbol)
    }
}

/// Sums entries that share a (token, recipient) pair.
///
/// First-seen order is kept. Address comparison ignores case. Returns `None`
/// if a sum overflows.
pub fn consolidate(selections: &[SelectedAmount]) -> Option<Vec<SelectedAmount>> {
    let mut consolidated: Vec<SelectedAmount> = Vec::with_capacity(selections.len());
    for selection in selections {
        match consolidated.iter_mut().find(|c| c.key() == selection.key()) {
            Some(existing) => {
                existing.amount = existing.amount.checked_add(selection.amount)?;
            }
            None => consolidated.push(selection.clone()),
        }
    }
    Some(consolidated)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    NotANumber(String),

    #[error("too many decimal places: token supports {0}")]
    TooPrecise(u8),

    #[error("amount is too large")]
    Overflow,
}

fn unit(decimals: u8) -> Option<u128> {
    checked_pow(10u128, usize::from(decimals))
}

/// Parses a human decimal string like `"12.5"` into smallest units.
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, AmountParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let (whole, fraction) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountParseError::NotANumber(input.to_string()));
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > usize::from(decimals) {
        return Err(AmountParseError::TooPrecise(decimals));
    }

    let unit = unit(decimals).ok_or(AmountParseError::Overflow)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountParseError::Overflow)?
    };
    let fraction_units: u128 = if fraction.is_empty() {
        0
    } else {
        let scale = unit
            / checked_pow(10u128, fraction.len()).ok_or(AmountParseError::Overflow)?;
        fraction
            .parse::<u128>()
            .map_err(|_| AmountParseError::Overflow)?
            * scale
    };

    whole
        .checked_mul(unit)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or(AmountParseError::Overflow)
}

/// Formats smallest units as a decimal string, trimming trailing zeros.
pub fn format_units(amount: u128, decimals: u8) -> String {
    let Some(unit) = unit(decimals) else {
        return amount.to_string();
    };
    let whole = amount / unit;
    let fraction = amount % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = usize::from(decimals));
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Formats smallest units with exactly `precision` decimal places (truncating).
pub fn format_units_fixed(amount: u128, decimals: u8, precision: u8) -> String {
    let Some(unit) = unit(decimals) else {
        return amount.to_string();
    };
    let whole = amount / unit;
    let fraction = format!(
        "{:0width$}",
        amount % unit,
        width = usize::from(decimals)
    );
    let mut fraction = fraction
        .chars()
        .take(usize::from(precision))
        .collect::<String>();
    while fraction.len() < usize::from(precision) {
        fraction.push('0');
    }
    if precision == 0 {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::collection::vec;
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    fn token(address: &str) -> TokenInfo {
        TokenInfo {
            address: address.to_string(),
            symbol: "TKN".to_string(),
            decimals: 18,
        }
    }

    #[test]
    fn duplicate_token_recipient_pairs_are_summed() {
        let x = token("0xaaaa");
        let selections = vec![
            SelectedAmount::new(&x, 30, "0zkrecipienty"),
            SelectedAmount::new(&x, 70, "0zkrecipienty"),
        ];

        let consolidated = consolidate(&selections).unwrap();
        assert_eq!(1, consolidated.len());
        assert_eq!(100, consolidated[0].amount);
    }

    #[test]
    fn consolidation_ignores_address_case() {
        let selections = vec![
            SelectedAmount::new(&token("0xAAAA"), 1, "0xBB"),
            SelectedAmount::new(&token("0xaaaa"), 2, "0xbb"),
            SelectedAmount::new(&token("0xaaaa"), 4, "0xcc"),
        ];

        let consolidated = consolidate(&selections).unwrap();
        assert_eq!(
            vec![3, 4],
            consolidated.iter().map(|s| s.amount).collect::<Vec<_>>()
        );
    }

    #[test]
    fn consolidation_overflow_is_reported() {
        let x = token("0xaaaa");
        let selections = vec![
            SelectedAmount::new(&x, u128::MAX, "0xbb"),
            SelectedAmount::new(&x, 1, "0xbb"),
        ];
        assert!(consolidate(&selections).is_none());
    }

    #[proptest]
    fn consolidated_pairs_are_unique_and_totals_preserved(
        #[strategy(vec((0usize..3, 0usize..3, 1u128..1_000_000), 0..20))] entries: Vec<(
            usize,
            usize,
            u128,
        )>,
    ) {
        let tokens = ["0xt0", "0xt1", "0xt2"];
        let recipients = ["0zkr0", "0zkr1", "0zkr2"];
        let selections = entries
            .iter()
            .map(|(t, r, a)| SelectedAmount::new(&token(tokens[*t]), *a, recipients[*r]))
            .collect::<Vec<_>>();

        let consolidated = consolidate(&selections).unwrap();

        for (i, a) in consolidated.iter().enumerate() {
            for b in &consolidated[i + 1..] {
                prop_assert_ne!(a.key(), b.key());
            }
        }
        let before: u128 = selections.iter().map(|s| s.amount).sum();
        let after: u128 = consolidated.iter().map(|s| s.amount).sum();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(Ok(1_500_000_000_000_000_000), parse_units("1.5", 18));
        assert_eq!(Ok(100_000_000), parse_units("100", 6));
        assert_eq!(Ok(500_000), parse_units(".5", 6));
        assert_eq!(Ok(1_000_000), parse_units("1.000000000", 6));
        assert_eq!(Err(AmountParseError::Empty), parse_units(" ", 6));
        assert_eq!(Err(AmountParseError::TooPrecise(6)), parse_units("0.0000001", 6));
        assert!(matches!(
            parse_units("1,5", 6),
            Err(AmountParseError::NotANumber(_))
        ));
        assert!(matches!(
            parse_units(".", 6),
            Err(AmountParseError::NotANumber(_))
        ));
    }

    #[test]
    fn formats_amounts() {
        assert_eq!("1.5", format_units(1_500_000, 6));
        assert_eq!("100", format_units(100_000_000, 6));
        assert_eq!("0.000105", format_units(105_000_000_000_000, 18));
        assert_eq!("0.00010500", format_units_fixed(105_000_000_000_000, 18, 8));
        assert_eq!("2", format_units_fixed(2_000_000, 6, 0));
    }

    #[proptest]
    fn format_then_parse_is_identity(amount: u64, #[strategy(0u8..=18)] decimals: u8) {
        let amount = u128::from(amount);
        prop_assert_eq!(Ok(amount), parse_units(&format_units(amount, decimals), decimals));
    }
}
