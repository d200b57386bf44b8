//! Per-user ledger record.
//!
//! A record owns one user's aggregate plus the deposits and transactions applied
//! since its last successful flush. All access goes through [`LedgerRecord::lock`],
//! whose guard is released on every exit path.

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};

use wallet_core::{
    Deposit, DepositId, Rejection, Transaction, TransactionId, TransactionType, UserId,
    UserLedger, UserSnapshot, Violation,
};

/// Mutable state guarded by the record lock.
#[derive(Debug)]
pub(crate) struct RecordState {
    pub(crate) ledger: UserLedger,
    pub(crate) pending_deposits: BTreeMap<DepositId, Deposit>,
    pub(crate) pending_transactions: BTreeMap<TransactionId, Transaction>,
    pub(crate) dirty: bool,
    /// Bumped on every accepted mutation.
    pub(crate) version: u64,
}

/// Copy of a dirty record taken by a flush pass.
#[derive(Debug, Clone)]
pub(crate) struct PendingFlush {
    pub(crate) user_id: UserId,
    pub(crate) ledger: UserLedger,
    pub(crate) deposits: Vec<(DepositId, Deposit)>,
    pub(crate) transactions: Vec<(TransactionId, Transaction)>,
    pub(crate) version: u64,
}

/// One user's ledger and its exclusive lock.
#[derive(Debug)]
pub struct LedgerRecord {
    user_id: UserId,
    state: Mutex<RecordState>,
}

impl LedgerRecord {
    /// A newly created user: dirty until first flushed.
    pub(crate) fn created(user_id: UserId, initial_balance: f64) -> Self {
        Self::with_state(user_id, UserLedger::new(initial_balance), true)
    }

    /// A user loaded from durable storage: clean, with no pending detail.
    pub(crate) fn recovered(user_id: UserId, ledger: UserLedger) -> Self {
        Self::with_state(user_id, ledger, false)
    }

    fn with_state(user_id: UserId, ledger: UserLedger, dirty: bool) -> Self {
        Self {
            user_id,
            state: Mutex::new(RecordState {
                ledger,
                pending_deposits: BTreeMap::new(),
                pending_transactions: BTreeMap::new(),
                dirty,
                version: 0,
            }),
        }
    }

    /// Enter the record's exclusive section.
    pub(crate) fn lock(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock()
    }

    /// Copy of the aggregate counters.
    #[must_use]
    pub fn snapshot(&self) -> UserSnapshot {
        self.lock().ledger.snapshot(self.user_id)
    }

    /// Whether the record has changes not yet written to storage.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Number of deposits and transactions waiting for the next flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        let state = self.lock();
        state.pending_deposits.len() + state.pending_transactions.len()
    }

    /// Validate and apply a deposit, returning the new balance.
    pub(crate) fn apply_deposit(
        &self,
        deposit_id: DepositId,
        amount: f64,
    ) -> Result<f64, Rejection> {
        let mut state = self.lock();

        let mut violations = Vec::new();
        let expected = state.ledger.next_deposit_id();
        if deposit_id != expected {
            violations.push(Violation::OutOfSequence {
                expected: expected.get(),
                received: deposit_id.get(),
            });
        }
        if !is_valid_amount(amount) {
            violations.push(Violation::InvalidAmount(amount));
        }
        if let Some(rejection) = Rejection::from_violations(violations) {
            return Err(rejection);
        }

        let deposit = Deposit::new(state.ledger.balance, amount);
        let balance = deposit.balance_after;

        state.ledger.balance = balance;
        state.ledger.deposit_count += 1;
        state.ledger.deposit_sum += amount;
        state.pending_deposits.insert(deposit_id, deposit);
        state.touch();

        Ok(balance)
    }

    /// Validate and apply a bet or win, returning the new balance.
    ///
    /// `kind` is the caller's raw type string; anything other than `Bet` or `Win`
    /// is reported alongside any other broken rule.
    pub(crate) fn apply_transaction(
        &self,
        transaction_id: TransactionId,
        kind: &str,
        amount: f64,
    ) -> Result<f64, Rejection> {
        let mut state = self.lock();

        let mut violations = Vec::new();
        let kind = kind.parse::<TransactionType>();
        if let Err(violation) = &kind {
            violations.push(violation.clone());
        }

        let expected = state.ledger.next_transaction_id();
        if transaction_id != expected {
            violations.push(Violation::OutOfSequence {
                expected: expected.get(),
                received: transaction_id.get(),
            });
        }

        let amount_ok = is_valid_amount(amount);
        if !amount_ok {
            violations.push(Violation::InvalidAmount(amount));
        }

        // The balance must stay strictly positive after a bet
        if matches!(kind, Ok(TransactionType::Bet))
            && amount_ok
            && state.ledger.balance - amount <= 0.0
        {
            violations.push(Violation::InsufficientFunds {
                balance: state.ledger.balance,
                amount,
            });
        }

        let kind = match (kind, Rejection::from_violations(violations)) {
            (Ok(kind), None) => kind,
            (_, Some(rejection)) => return Err(rejection),
            (Err(violation), None) => return Err(violation.into()),
        };

        let transaction = Transaction::new(kind, state.ledger.balance, amount);
        let balance = transaction.balance_after;

        state.ledger.balance = balance;
        match kind {
            TransactionType::Bet => {
                state.ledger.bet_count += 1;
                state.ledger.bet_sum += amount;
            }
            TransactionType::Win => {
                state.ledger.win_count += 1;
                state.ledger.win_sum += amount;
            }
        }
        state.pending_transactions.insert(transaction_id, transaction);
        state.touch();

        Ok(balance)
    }

    /// Copy the record's state for a flush pass, if it is dirty.
    pub(crate) fn pending_flush(&self) -> Option<PendingFlush> {
        let state = self.lock();
        if !state.dirty {
            return None;
        }

        Some(PendingFlush {
            user_id: self.user_id,
            ledger: state.ledger,
            deposits: state
                .pending_deposits
                .iter()
                .map(|(id, deposit)| (*id, deposit.clone()))
                .collect(),
            transactions: state
                .pending_transactions
                .iter()
                .map(|(id, transaction)| (*id, transaction.clone()))
                .collect(),
            version: state.version,
        })
    }

    /// Drop the entries that a successful flush wrote.
    ///
    /// Entries applied after the snapshot stay pending and keep the record dirty.
    pub(crate) fn mark_flushed(&self, flushed: &PendingFlush) {
        let mut state = self.lock();

        for (id, _) in &flushed.deposits {
            state.pending_deposits.remove(id);
        }
        for (id, _) in &flushed.transactions {
            state.pending_transactions.remove(id);
        }
        if state.version == flushed.version {
            state.dirty = false;
        }
    }
}

impl RecordState {
    fn touch(&mut self) {
        self.dirty = true;
        self.version += 1;
    }
}

fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount > 0.0
}
