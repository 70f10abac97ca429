use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::contribution::{Amount, Contribution};

/// The single persisted record: running total and every contribution
/// in the order they were committed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default, deserialize_with = "total_or_zero")]
    total_saved: Amount,
    #[serde(default, deserialize_with = "history_or_empty")]
    history: Vec<Contribution>
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn total_saved(&self) -> Amount {
        self.total_saved
    }

    pub fn history(&self) -> &[Contribution] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Contribution> {
        self.history
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Appends a contribution and bumps the total by exactly `amount`.
    /// The recorded time never goes backwards relative to the last entry,
    /// so history order stays chronological even if the clock regresses.
    pub fn record(&mut self, amount: Amount, now: DateTime<Utc>) -> &Contribution {
        let time = match self.history.last() {
            Some(last) if last.time > now => last.time,
            _ => now
        };
        self.total_saved += amount;
        self.history.push(Contribution::new(amount, time));
        &self.history[self.history.len() - 1]
    }

    pub fn clear(&mut self) {
        *self = Ledger::default();
    }

    fn history_sum(&self) -> Amount {
        self.history.iter()
            .fold(0.0, |total, contribution| total + contribution.amount)
    }

    pub fn is_consistent(&self) -> bool {
        self.total_saved == self.history_sum()
    }

    /// Recomputes the total from the history, which is authoritative.
    /// Returns the stale total if it had to be corrected.
    pub fn reconcile(&mut self) -> Option<Amount> {
        if self.is_consistent() {
            return None;
        }
        let stale = self.total_saved;
        self.total_saved = self.history_sum();
        Some(stale)
    }
}

/// Anything other than a number under `totalSaved` is read as zero;
/// `reconcile` recomputes it from the history on load anyway.
fn total_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or(0.0))
}

/// Anything other than an array under `history` is read as no history at all.
fn history_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Contribution>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => serde_json::from_value(value).map_err(serde::de::Error::custom),
        _ => Ok(Vec::new())
    }
}
