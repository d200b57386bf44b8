//! Atomic multi-key updates.

use wallet_core::{Deposit, DepositId, Transaction, TransactionId, UserId, UserLedger};

/// One write inside an [`UpdateBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    /// A user aggregate in the root namespace.
    User {
        /// Owner.
        user_id: UserId,
        /// Aggregate value.
        ledger: UserLedger,
    },

    /// A deposit in the user's child namespace.
    Deposit {
        /// Owner.
        user_id: UserId,
        /// Key within the child namespace.
        deposit_id: DepositId,
        /// Record value.
        deposit: Deposit,
    },

    /// A transaction in the user's child namespace.
    Transaction {
        /// Owner.
        user_id: UserId,
        /// Key within the child namespace.
        transaction_id: TransactionId,
        /// Record value.
        transaction: Transaction,
    },
}

/// A set of writes applied all-or-nothing by [`crate::Store::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBatch {
    entries: Vec<BatchEntry>,
}

impl UpdateBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a user aggregate.
    pub fn put_user(&mut self, user_id: UserId, ledger: UserLedger) -> &mut Self {
        self.entries.push(BatchEntry::User { user_id, ledger });
        self
    }

    /// Write a deposit record.
    pub fn put_deposit(
        &mut self,
        user_id: UserId,
        deposit_id: DepositId,
        deposit: Deposit,
    ) -> &mut Self {
        self.entries.push(BatchEntry::Deposit {
            user_id,
            deposit_id,
            deposit,
        });
        self
    }

    /// Write a transaction record.
    pub fn put_transaction(
        &mut self,
        user_id: UserId,
        transaction_id: TransactionId,
        transaction: Transaction,
    ) -> &mut Self {
        self.entries.push(BatchEntry::Transaction {
            user_id,
            transaction_id,
            transaction,
        });
        self
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::{Deposit, DepositId, UserId, UserLedger};

    #[test]
    fn entries_keep_insertion_order() {
        let mut batch = UpdateBatch::new();
        assert!(batch.is_empty());

        batch
            .put_user(UserId::new(1), UserLedger::new(0.0))
            .put_deposit(UserId::new(1), DepositId::new(1), Deposit::new(0.0, 10.0));

        assert_eq!(batch.len(), 2);
        assert!(matches!(batch.entries()[0], BatchEntry::User { .. }));
        assert!(matches!(
            batch.entries()[1],
            BatchEntry::Deposit { deposit_id, .. } if deposit_id == DepositId::new(1)
        ));
    }
}
