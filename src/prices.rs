//! Price parsing and range matching for festival price lists.
//!
//! A festival stores its prices as free text: a space-separated list of
//! tokens, each one integer magnitude glued to a currency label (`"$50"`,
//! `"50e"`, `"50 e"`, `"$ 50"`). The field is never validated when a
//! festival is saved; tokens are parsed lazily whenever a price-range
//! query inspects them, and a malformed token fails that query instead of
//! being treated as a non-match.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"[+-]?\d+").unwrap();
}

/// A single parsed price: an integer magnitude and a currency label.
///
/// Currency labels are compared by exact string equality; `"$"` and `"e"`
/// are simply different currencies, and so are `"$"` and `"$$"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub value: i64,
    pub currency: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{token}` is not a valid price token")]
pub struct ParsePriceError {
    token: String,
}

/// Errors raised when a price-range query cannot be evaluated.
///
/// Callers must be able to tell a malformed query apart from a query that
/// simply matched nothing, so these never collapse into a boolean.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("a price range needs at least one bound")]
    MissingBounds,
    #[error(transparent)]
    Parse(#[from] ParsePriceError),
    #[error("price bounds cannot be negative")]
    NegativeBound,
    #[error("price bounds use different currencies")]
    CurrencyMismatch,
    #[error("minimum price exceeds maximum price")]
    MinAboveMax,
}

/// Splits a price token into its integer value and currency label.
///
/// The token must contain exactly one maximal signed-integer substring.
/// Whatever remains once that substring is removed must reduce to a
/// single non-empty word, which becomes the currency label verbatim.
pub fn parse_price(token: &str) -> Result<Price, ParsePriceError> {
    let error = || ParsePriceError {
        token: token.to_string(),
    };

    let mut numbers = INTEGER.find_iter(token);
    let number = numbers.next().ok_or_else(error)?;
    if numbers.next().is_some() {
        return Err(error());
    }

    let remainder = format!("{}{}", &token[..number.start()], &token[number.end()..]);
    let mut words = remainder.split_whitespace();
    let currency = words.next().ok_or_else(error)?;
    if words.next().is_some() {
        return Err(error());
    }

    let value = number.as_str().parse().map_err(|_| error())?;

    Ok(Price {
        value,
        currency: currency.to_string(),
    })
}

/// Returns whether any price in `prices` falls strictly inside the given
/// bounds.
///
/// Both bounds are exclusive: a min-only query matches values strictly
/// above the minimum, a max-only query values strictly below the maximum,
/// and a two-sided query values strictly between the two. An empty price
/// list stands for a single zero-value price of any currency.
///
/// Every token compared against a bound must use that bound's currency; a
/// mismatch is an error, not a non-match.
pub fn price_in_range(
    prices: &str,
    min_price: Option<&str>,
    max_price: Option<&str>,
) -> Result<bool, RangeError> {
    let min = min_price.map(parse_price).transpose()?;
    let max = max_price.map(parse_price).transpose()?;

    if min.is_none() && max.is_none() {
        return Err(RangeError::MissingBounds);
    }

    if min.as_ref().is_some_and(|bound| bound.value < 0)
        || max.as_ref().is_some_and(|bound| bound.value < 0)
    {
        return Err(RangeError::NegativeBound);
    }

    if let (Some(min), Some(max)) = (&min, &max) {
        if min.currency != max.currency {
            return Err(RangeError::CurrencyMismatch);
        }
        if min.value > max.value {
            return Err(RangeError::MinAboveMax);
        }
    }

    let fits = |value: i64| {
        min.as_ref().is_none_or(|bound| bound.value < value)
            && max.as_ref().is_none_or(|bound| value < bound.value)
    };

    let tokens: Vec<&str> = prices.split_whitespace().collect();

    // An empty list is an implicit zero that satisfies any currency.
    if tokens.is_empty() {
        return Ok(fits(0));
    }

    for token in tokens {
        let price = parse_price(token)?;
        if let Some(bound) = min.as_ref().or(max.as_ref()) {
            if price.currency != bound.currency {
                return Err(RangeError::CurrencyMismatch);
            }
        }
        if fits(price.value) {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(value: i64, currency: &str) -> Price {
        Price {
            value,
            currency: currency.to_string(),
        }
    }

    #[test]
    fn parses_tokens_regardless_of_whitespace_placement() {
        assert_eq!(parse_price("50e"), Ok(price(50, "e")));
        assert_eq!(parse_price("50 e"), Ok(price(50, "e")));
        assert_eq!(parse_price("$50"), Ok(price(50, "$")));
        assert_eq!(parse_price("$ 50"), Ok(price(50, "$")));
        assert_eq!(parse_price("-3e"), Ok(price(-3, "e")));
        assert_eq!(parse_price("+7 kr"), Ok(price(7, "kr")));
    }

    #[test]
    fn rejects_tokens_without_exactly_one_number() {
        assert!(parse_price("").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("a50b60").is_err());
        assert!(parse_price("50e60").is_err());
    }

    #[test]
    fn rejects_tokens_without_exactly_one_currency_word() {
        assert!(parse_price("50").is_err());
        assert!(parse_price("a 50 b").is_err());
        assert!(parse_price(" 50 ").is_err());
    }

    #[test]
    fn empty_prices_count_as_a_zero_price_of_any_currency() {
        assert_eq!(price_in_range("", None, Some("$10")), Ok(true));
        assert_eq!(price_in_range("", Some("5e"), None), Ok(false));
        assert_eq!(price_in_range("", Some("5e"), Some("10e")), Ok(false));
        assert_eq!(price_in_range("   ", None, Some("$10")), Ok(true));
    }

    #[test]
    fn matches_when_some_price_is_strictly_inside_the_range() {
        assert_eq!(
            price_in_range("3e 50e 200e", Some("5e"), Some("100e")),
            Ok(true)
        );
        assert_eq!(
            price_in_range("3e 50e 200e", Some("5 e"), Some("100 e")),
            Ok(true)
        );
        assert_eq!(
            price_in_range("$3 $50 $200", Some("$3"), Some("$100")),
            Ok(true)
        );
        assert_eq!(
            price_in_range("$3 $50 $200", Some("$ 3"), Some("$ 100")),
            Ok(true)
        );
    }

    #[test]
    fn does_not_match_when_no_price_is_inside_the_range() {
        assert_eq!(
            price_in_range("3e 50e 200e", Some("4e"), Some("10e")),
            Ok(false)
        );
        assert_eq!(
            price_in_range("3e 50e 200e", Some("4 e"), Some("10 e")),
            Ok(false)
        );
        assert_eq!(
            price_in_range("$25 $50 $200", Some("$1"), Some("$10")),
            Ok(false)
        );
    }

    #[test]
    fn bounds_are_strict_on_both_sides() {
        assert_eq!(price_in_range("50e", Some("50e"), None), Ok(false));
        assert_eq!(price_in_range("50e", None, Some("50e")), Ok(false));
        assert_eq!(price_in_range("50e", Some("49e"), Some("51e")), Ok(true));
    }

    #[test]
    fn min_only_matches_prices_above_the_minimum() {
        assert_eq!(price_in_range("3e 50e 200e", Some("5e"), None), Ok(true));
        assert_eq!(price_in_range("3e 50e 200e", Some("5 e"), None), Ok(true));
        assert_eq!(price_in_range("$3 $50 $200", Some("$3"), None), Ok(true));
        assert_eq!(price_in_range("$3 $50 $200", Some("$ 3"), None), Ok(true));
    }

    #[test]
    fn max_only_matches_prices_below_the_maximum() {
        assert_eq!(price_in_range("3e 50e 200e", None, Some("100e")), Ok(true));
        assert_eq!(price_in_range("3e 50e 200e", None, Some("100 e")), Ok(true));
        assert_eq!(price_in_range("$3 $50 $200", None, Some("$100")), Ok(true));
        assert_eq!(price_in_range("$3 $50 $200", None, Some("$ 100")), Ok(true));
    }

    #[test]
    fn mismatched_bound_currencies_are_an_error() {
        assert_eq!(
            price_in_range("3e 50e 200e", Some("$3"), Some("$5")),
            Err(RangeError::CurrencyMismatch)
        );
    }

    #[test]
    fn token_currency_differing_from_the_bound_is_an_error() {
        assert_eq!(
            price_in_range("3e $50", Some("1e"), None),
            Err(RangeError::CurrencyMismatch)
        );
    }

    #[test]
    fn negative_bounds_are_an_error() {
        assert_eq!(
            price_in_range("3e", Some("-3e"), Some("5e")),
            Err(RangeError::NegativeBound)
        );
        assert_eq!(
            price_in_range("3e", Some("3e"), Some("-5e")),
            Err(RangeError::NegativeBound)
        );
        assert_eq!(
            price_in_range("3e", Some("-3e"), Some("-5e")),
            Err(RangeError::NegativeBound)
        );
    }

    #[test]
    fn min_above_max_is_an_error() {
        assert_eq!(
            price_in_range("3e", Some("10e"), Some("5e")),
            Err(RangeError::MinAboveMax)
        );
    }

    #[test]
    fn missing_bounds_are_an_error() {
        assert_eq!(price_in_range("3e", None, None), Err(RangeError::MissingBounds));
    }

    #[test]
    fn malformed_tokens_fail_the_query_rather_than_the_match() {
        assert!(matches!(
            price_in_range("3e fifty", Some("1e"), None),
            Err(RangeError::Parse(_))
        ));
    }

    #[test]
    fn stops_at_the_first_matching_token() {
        // The malformed trailing token is never reached.
        assert_eq!(
            price_in_range("50e garbage", Some("5e"), Some("100e")),
            Ok(true)
        );
    }
}
