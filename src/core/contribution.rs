use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use colored::Colorize;

use crate::core::error::{LedgerError, LedgerResult};

pub type Amount = f64;

/// A single savings event. Once recorded it is never edited;
/// the only way to get rid of it is clearing the whole ledger.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Contribution {
    pub amount: Amount,
    #[serde(with = "iso_millis")]
    pub time: DateTime<Utc>
}

impl Contribution {
    pub fn new(amount: Amount, time: DateTime<Utc>) -> Contribution {
        Contribution { amount, time }
    }

    /// Timestamp in the same shape it is persisted in.
    pub fn time_string(&self) -> String {
        iso_millis::format(&self.time)
    }
}

impl std::fmt::Display for Contribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.time_string(), self.amount.to_string().bold())
    }
}

/// Checks that an already numeric amount can be recorded.
pub fn validate_amount(amount: Amount) -> LedgerResult<Amount> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(LedgerError::InvalidAmount)
    }
}

/// Turns caller input into an amount. JSON numbers are taken as they are,
/// strings only if the whole (trimmed) text is a number: "12abc" is rejected.
pub fn parse_amount(value: &serde_json::Value) -> LedgerResult<Amount> {
    match value {
        serde_json::Value::Number(num) => num.as_f64()
            .ok_or(LedgerError::InvalidAmount)
            .and_then(validate_amount),
        serde_json::Value::String(text) => parse_amount_str(text),
        _ => Err(LedgerError::InvalidAmount)
    }
}

pub fn parse_amount_str(text: &str) -> LedgerResult<Amount> {
    text.trim().parse::<Amount>()
        .map_err(|_| LedgerError::InvalidAmount)
        .and_then(validate_amount)
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(time: &DateTime<Utc>) -> String {
        time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|time| time.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
