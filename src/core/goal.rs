use serde::{Deserialize, Serialize};

use crate::core::contribution::{validate_amount, Amount};
use crate::core::error::{LedgerError, LedgerResult};

/// The target the user is saving towards. Kept apart from the ledger:
/// it never takes part in the total/history bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Amount")]
pub struct Goal(Amount);

impl Goal {
    pub const DEFAULT: Amount = 1000.0;

    pub fn new(target: Amount) -> LedgerResult<Goal> {
        validate_amount(target).map(Goal)
    }

    pub fn target(&self) -> Amount {
        self.0
    }

    /// Whole percentage of the goal reached, capped at 100.
    pub fn progress(&self, total: Amount) -> u8 {
        let percent = (total / self.0 * 100.0).floor();
        percent.clamp(0.0, 100.0) as u8
    }
}

impl TryFrom<Amount> for Goal {
    type Error = LedgerError;

    fn try_from(target: Amount) -> LedgerResult<Goal> {
        Goal::new(target)
    }
}

impl Default for Goal {
    fn default() -> Self {
        Goal(Goal::DEFAULT)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(150.0, 15)]
    #[case(999.99, 99)]
    #[case(1000.0, 100)]
    #[case(2500.0, 100)]
    fn progress_against_default(#[case] total: Amount, #[case] expected: u8) {
        assert_eq!(Goal::default().progress(total), expected);
    }

    #[test]
    fn goal_must_be_positive() {
        assert!(Goal::new(0.0).is_err());
        assert!(Goal::new(-10.0).is_err());
        assert_eq!(Goal::new(250.0).unwrap().target(), 250.0);
    }

    #[rstest]
    #[case("0")]
    #[case("-5")]
    fn stored_goal_is_validated(#[case] text: &str) {
        assert!(serde_json::from_str::<Goal>(text).is_err());
    }

    #[test]
    fn stored_goal_round_trips() {
        let goal: Goal = serde_json::from_str("250").unwrap();
        assert_eq!(goal.target(), 250.0);
        assert_eq!(serde_json::to_string(&goal).unwrap(), "250.0");
    }
}
