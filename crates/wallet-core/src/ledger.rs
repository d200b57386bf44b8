//! Per-user ledger aggregate.

use serde::{Deserialize, Serialize};

use crate::{DepositId, TransactionId, UserId};

/// The aggregate state of one user's wallet.
///
/// This is the value persisted in the `Users` namespace. Individual deposits and
/// transactions are stored separately; only the counters live here.
///
/// Invariant: `balance == initial_balance + deposit_sum + win_sum - bet_sum`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UserLedger {
    /// Current balance.
    pub balance: f64,

    /// Number of accepted deposits.
    pub deposit_count: u64,

    /// Sum of accepted deposit amounts.
    pub deposit_sum: f64,

    /// Number of accepted wins.
    pub win_count: u64,

    /// Sum of accepted win amounts.
    pub win_sum: f64,

    /// Number of accepted bets.
    pub bet_count: u64,

    /// Sum of accepted bet amounts.
    pub bet_sum: f64,
}

impl UserLedger {
    /// Create a ledger with the given starting balance and zeroed counters.
    #[must_use]
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            ..Self::default()
        }
    }

    /// The only deposit id that will be accepted next.
    #[must_use]
    pub const fn next_deposit_id(&self) -> DepositId {
        DepositId::new(self.deposit_count + 1)
    }

    /// The only transaction id that will be accepted next.
    #[must_use]
    pub const fn next_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.bet_count + self.win_count + 1)
    }

    /// Take a read-only snapshot for the given user.
    #[must_use]
    pub const fn snapshot(&self, id: UserId) -> UserSnapshot {
        UserSnapshot {
            id,
            balance: self.balance,
            deposit_count: self.deposit_count,
            deposit_sum: self.deposit_sum,
            bet_count: self.bet_count,
            bet_sum: self.bet_sum,
            win_count: self.win_count,
            win_sum: self.win_sum,
        }
    }
}

/// Immutable copy of a user's counters, as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    /// User id.
    pub id: UserId,
    /// Current balance.
    pub balance: f64,
    /// Number of accepted deposits.
    pub deposit_count: u64,
    /// Sum of accepted deposits.
    pub deposit_sum: f64,
    /// Number of accepted bets.
    pub bet_count: u64,
    /// Sum of accepted bets.
    pub bet_sum: f64,
    /// Number of accepted wins.
    pub win_count: u64,
    /// Sum of accepted wins.
    pub win_sum: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_starts_both_sequences_at_one() {
        let ledger = UserLedger::new(0.0);
        assert_eq!(ledger.next_deposit_id(), DepositId::new(1));
        assert_eq!(ledger.next_transaction_id(), TransactionId::new(1));
    }

    #[test]
    fn bets_and_wins_share_the_transaction_sequence() {
        let ledger = UserLedger {
            bet_count: 2,
            win_count: 3,
            ..UserLedger::default()
        };
        assert_eq!(ledger.next_transaction_id(), TransactionId::new(6));
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let ledger = UserLedger {
            balance: 85.0,
            deposit_count: 1,
            deposit_sum: 100.0,
            bet_count: 1,
            bet_sum: 40.0,
            win_count: 1,
            win_sum: 25.0,
        };
        let json = serde_json::to_value(ledger.snapshot(UserId::new(1))).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["balance"], 85.0);
        assert_eq!(json["depositCount"], 1);
        assert_eq!(json["depositSum"], 100.0);
        assert_eq!(json["betSum"], 40.0);
        assert_eq!(json["winCount"], 1);
        assert_eq!(json["winSum"], 25.0);
    }
}
