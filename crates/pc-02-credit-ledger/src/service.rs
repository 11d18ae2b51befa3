//! Credit Ledger Service - Core business logic
//!
//! ## Locking
//!
//! - Each identity has its own mutex. `try_debit` and `refund` take only that.
//! - `credit` takes the `applied` entry for the transaction id first, then the
//!   identity mutex, then writes balance and applied marker in one atomic
//!   batch. No path takes them in the opposite order.

use crate::domain::account::{
    applied_key, balance_key, decode_applied, decode_balance, encode_applied, encode_balance,
    APPLIED_PREFIX, BALANCE_PREFIX,
};
use crate::domain::{
    Account, AppliedCredit, CreditOutcome, DebitOutcome, DenialReason, RejectionReason,
};
use crate::error::{LedgerError, LedgerResult};
use crate::ports::inbound::CreditLedgerApi;
use crate::ports::outbound::{BatchOperation, EventPublisher, KeyValueStore, TimeSource};
use async_trait::async_trait;
use canvas_telemetry::{log_tx_event, CREDITED_UNITS, CREDITS_TOTAL};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_bus::CanvasEvent;
use shared_types::{Identity, TransactionId};
use std::sync::Arc;
use tracing::{debug, info};

const SUBSYSTEM: &str = "pc-02";

/// Summary of a startup reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerLoadReport {
    pub accounts: usize,
    pub applied_transactions: usize,
}

pub struct CreditLedgerService<K, P>
where
    K: KeyValueStore,
    P: EventPublisher,
{
    accounts: DashMap<Identity, Arc<Mutex<Account>>>,
    applied: DashMap<TransactionId, AppliedCredit>,
    store: Arc<K>,
    publisher: Arc<P>,
    clock: Arc<dyn TimeSource>,
}

impl<K, P> CreditLedgerService<K, P>
where
    K: KeyValueStore,
    P: EventPublisher,
{
    pub fn new(store: Arc<K>, publisher: Arc<P>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            accounts: DashMap::new(),
            applied: DashMap::new(),
            store,
            publisher,
            clock,
        }
    }

    /// Reload balances and applied transaction markers.
    pub fn load_from_store(&self) -> LedgerResult<LedgerLoadReport> {
        let mut report = LedgerLoadReport::default();

        for (key, value) in self.store.prefix_scan(BALANCE_PREFIX)? {
            let balance = decode_balance(&key, &value)?;
            let raw = String::from_utf8_lossy(&key[BALANCE_PREFIX.len()..]).into_owned();
            let identity = Identity::new(raw).map_err(|e| LedgerError::Corrupted {
                key: String::from_utf8_lossy(&key).into_owned(),
                reason: e.to_string(),
            })?;
            self.accounts
                .insert(identity, Arc::new(Mutex::new(Account { balance })));
            report.accounts += 1;
        }

        for (key, value) in self.store.prefix_scan(APPLIED_PREFIX)? {
            let record = decode_applied(&key, &value)?;
            let raw = String::from_utf8_lossy(&key[APPLIED_PREFIX.len()..]).into_owned();
            let tx = TransactionId::parse(&raw).map_err(|e| LedgerError::Corrupted {
                key: String::from_utf8_lossy(&key).into_owned(),
                reason: e.to_string(),
            })?;
            self.applied.insert(tx, record);
            report.applied_transactions += 1;
        }

        info!(
            subsystem = SUBSYSTEM,
            accounts = report.accounts,
            applied = report.applied_transactions,
            "Ledger loaded from store"
        );
        Ok(report)
    }

    fn account(&self, identity: &Identity) -> Arc<Mutex<Account>> {
        self.accounts
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Account::default())))
            .clone()
    }

    /// Check-and-insert under the applied entry and identity lock.
    fn apply_credit(
        &self,
        identity: &Identity,
        transaction_id: &TransactionId,
        units: u64,
    ) -> LedgerResult<CreditOutcome> {
        match self.applied.entry(transaction_id.clone()) {
            Entry::Occupied(existing) => Ok(CreditOutcome::Rejected(
                RejectionReason::DuplicateTransaction {
                    credited_to: existing.get().identity.clone(),
                },
            )),
            Entry::Vacant(slot) => {
                let account = self.account(identity);
                let mut account = account.lock();

                let balance = account.balance.checked_add(units).ok_or_else(|| {
                    LedgerError::BalanceOverflow {
                        identity: identity.clone(),
                    }
                })?;
                let record = AppliedCredit {
                    identity: identity.clone(),
                    units,
                    applied_at: self.clock.now(),
                };

                self.store.atomic_batch_write(vec![
                    BatchOperation::put(balance_key(identity), encode_balance(balance)?),
                    BatchOperation::put(applied_key(transaction_id), encode_applied(&record)?),
                ])?;

                account.balance = balance;
                slot.insert(record);
                Ok(CreditOutcome::Applied { balance })
            }
        }
    }
}

#[async_trait]
impl<K, P> CreditLedgerApi for CreditLedgerService<K, P>
where
    K: KeyValueStore + 'static,
    P: EventPublisher + 'static,
{
    fn try_debit(&self, identity: &Identity, units: u64) -> LedgerResult<DebitOutcome> {
        if units == 0 {
            return Err(LedgerError::InvalidUnits);
        }

        // Unknown wallets are denied without creating an account.
        let Some(account) = self
            .accounts
            .get(identity)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return Ok(DebitOutcome::Denied(DenialReason::InsufficientCredit {
                balance: 0,
            }));
        };
        let mut account = account.lock();

        if account.balance < units {
            return Ok(DebitOutcome::Denied(DenialReason::InsufficientCredit {
                balance: account.balance,
            }));
        }

        let remaining = account.balance - units;
        self.store
            .put(&balance_key(identity), &encode_balance(remaining)?)?;
        account.balance = remaining;

        debug!(subsystem = SUBSYSTEM, identity = %identity, remaining, "Debit granted");
        Ok(DebitOutcome::Granted { remaining })
    }

    fn refund(&self, identity: &Identity, units: u64) -> LedgerResult<u64> {
        let account = self.account(identity);
        let mut account = account.lock();

        let balance = account.balance.checked_add(units).ok_or_else(|| {
            LedgerError::BalanceOverflow {
                identity: identity.clone(),
            }
        })?;
        self.store
            .put(&balance_key(identity), &encode_balance(balance)?)?;
        account.balance = balance;

        debug!(subsystem = SUBSYSTEM, identity = %identity, balance, "Debit refunded");
        Ok(balance)
    }

    async fn credit(
        &self,
        identity: &Identity,
        transaction_id: &TransactionId,
        units: u64,
    ) -> LedgerResult<CreditOutcome> {
        if units == 0 {
            return Err(LedgerError::InvalidUnits);
        }

        let outcome = self.apply_credit(identity, transaction_id, units)?;

        match &outcome {
            CreditOutcome::Applied { balance } => {
                CREDITS_TOTAL.with_label_values(&["applied"]).inc();
                CREDITED_UNITS.inc_by(units as f64);
                log_tx_event!(
                    info,
                    SUBSYSTEM,
                    "Credit applied",
                    transaction_id,
                    identity = %identity,
                    units,
                    balance = *balance
                );
                self.publisher
                    .publish(CanvasEvent::CreditApplied {
                        identity: identity.clone(),
                        transaction_id: transaction_id.clone(),
                        units,
                        balance: *balance,
                    })
                    .await;
            }
            CreditOutcome::Rejected(_) => {
                CREDITS_TOTAL.with_label_values(&["duplicate"]).inc();
                log_tx_event!(
                    debug,
                    SUBSYSTEM,
                    "Duplicate credit ignored",
                    transaction_id,
                    identity = %identity
                );
            }
        }

        Ok(outcome)
    }

    fn balance_of(&self, identity: &Identity) -> u64 {
        self.accounts
            .get(identity)
            .map(|account| account.lock().balance)
            .unwrap_or(0)
    }

    fn is_credited(&self, transaction_id: &TransactionId) -> bool {
        self.applied.contains_key(transaction_id)
    }
}
