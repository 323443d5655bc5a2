//! Defines the record model, validated amounts and the date policy.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

use crate::Error;

/// Alias for the integer type used for record IDs.
///
/// IDs are assigned by the store, increase monotonically and are never reused.
pub type RecordId = i64;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A single monetary amount entered by the user, with an optional date.
///
/// Records are immutable once stored; they can only be deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The surrogate key assigned by the store on insertion.
    pub id: RecordId,
    /// The amount in major currency units.
    pub amount: f64,
    /// The day the amount refers to, if dates are in use.
    #[serde(with = "iso_date::option")]
    pub date: Option<Date>,
}

/// Parse a date written as `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns an [Error::InvalidInput] if `text` is not a valid calendar date in
/// that format.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|error| Error::InvalidInput(format!("\"{text}\" is not a YYYY-MM-DD date: {error}")))
}

/// Sum the amounts of `records` in order, starting from zero.
pub fn sum_amounts(records: &[Record]) -> f64 {
    records
        .iter()
        .fold(0.0, |total, record| total + record.amount)
}

/// A monetary amount that is known to be a finite number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    /// Create an amount.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] if `value` is NaN or infinite.
    pub fn new(value: f64) -> Result<Self, Error> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(Error::InvalidInput(format!(
                "{value} is not a finite number"
            )))
        }
    }

    /// The amount as a plain number.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Parse an amount such as `"150"`, `"-20.5"` or `"200,50"`.
    ///
    /// A single comma is treated as the decimal separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(Error::InvalidInput("amount cannot be empty".to_owned()));
        }

        let normalised = match trimmed.matches(',').count() {
            0 => trimmed.to_owned(),
            1 if !trimmed.contains('.') => trimmed.replace(',', "."),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "\"{trimmed}\" is not a number"
                )));
            }
        };

        let value = normalised
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(format!("\"{trimmed}\" is not a number")))?;

        Amount::new(value)
    }
}

impl TryFrom<f64> for Amount {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Controls whether records carry a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateMode {
    /// Records may have a date or not.
    #[default]
    Optional,
    /// Every record must have a date.
    Required,
    /// Dates are discarded before records are stored.
    Disabled,
}

impl DateMode {
    /// Apply the policy to the `date` given for a new record.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidInput] if the mode is [DateMode::Required]
    /// and `date` is `None`.
    pub fn apply(self, date: Option<Date>) -> Result<Option<Date>, Error> {
        match (self, date) {
            (DateMode::Required, None) => Err(Error::InvalidInput(
                "a date is required for every record".to_owned(),
            )),
            (DateMode::Disabled, Some(date)) => {
                tracing::debug!("dates are disabled, discarding {date}");
                Ok(None)
            }
            (_, date) => Ok(date),
        }
    }
}

impl FromStr for DateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optional" => Ok(DateMode::Optional),
            "required" => Ok(DateMode::Required),
            "disabled" => Ok(DateMode::Disabled),
            other => Err(Error::InvalidInput(format!(
                "unknown date mode \"{other}\", expected optional, required or disabled"
            ))),
        }
    }
}

#[cfg(test)]
mod amount_tests {
    use crate::{Error, record::Amount};

    #[test]
    fn new_rejects_nan() {
        let amount = Amount::new(f64::NAN);

        assert!(matches!(amount, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn new_rejects_infinity() {
        assert!(matches!(
            Amount::new(f64::INFINITY),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Amount::new(f64::NEG_INFINITY),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn parses_plain_decimal() {
        let amount: Amount = "200.50".parse().unwrap();

        assert_eq!(amount.value(), 200.5);
    }

    #[test]
    fn parses_negative_with_whitespace() {
        let amount: Amount = "  -20 ".parse().unwrap();

        assert_eq!(amount.value(), -20.0);
    }

    #[test]
    fn parses_comma_as_decimal_separator() {
        let amount: Amount = "200,50".parse().unwrap();

        assert_eq!(amount.value(), 200.5);
    }

    #[test]
    fn rejects_mixed_separators() {
        let amount = "1.200,50".parse::<Amount>();

        assert!(matches!(amount, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn rejects_text() {
        assert!(matches!(
            "twelve".parse::<Amount>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!("".parse::<Amount>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn rejects_non_finite_text() {
        assert!(matches!(
            "NaN".parse::<Amount>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            "inf".parse::<Amount>(),
            Err(Error::InvalidInput(_))
        ));
    }
}


#[cfg(test)]
mod parse_date_tests {
    use time::macros::date;

    use crate::{Error, record::parse_date};

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date("2024-01-10"), Ok(date!(2024 - 01 - 10)));
    }

    #[test]
    fn rejects_other_formats() {
        assert!(matches!(parse_date("10/01/2024"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_date("2024-02-30"), Err(Error::InvalidInput(_))));
    }
}

#[cfg(test)]
mod date_mode_tests {
    use time::macros::date;

    use crate::{Error, record::DateMode};

    #[test]
    fn optional_keeps_whatever_is_given() {
        assert_eq!(DateMode::Optional.apply(None), Ok(None));
        assert_eq!(
            DateMode::Optional.apply(Some(date!(2024 - 01 - 10))),
            Ok(Some(date!(2024 - 01 - 10)))
        );
    }

    #[test]
    fn required_rejects_missing_date() {
        assert!(matches!(
            DateMode::Required.apply(None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn disabled_discards_date() {
        assert_eq!(DateMode::Disabled.apply(Some(date!(2024 - 01 - 10))), Ok(None));
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("Required".parse::<DateMode>(), Ok(DateMode::Required));
        assert!("sometimes".parse::<DateMode>().is_err());
    }
}
