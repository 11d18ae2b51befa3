//! # Ledger Credit Sink
//!
//! Lets payment verification (pc-03) credit confirmed purchases into the
//! credit ledger (pc-02). A transaction id the ledger already applied comes
//! back as [`CreditReceipt::AlreadyApplied`], not as an error.

use async_trait::async_trait;
use pc_02_credit_ledger::{CreditLedgerApi, CreditOutcome};
use pc_03_payment_verification::{CreditReceipt, CreditSink, CreditSinkError};
use shared_types::{Identity, TransactionId};
use std::sync::Arc;

pub struct LedgerCreditSink<L: CreditLedgerApi> {
    ledger: Arc<L>,
}

impl<L: CreditLedgerApi> LedgerCreditSink<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<L: CreditLedgerApi + 'static> CreditSink for LedgerCreditSink<L> {
    async fn credit(
        &self,
        identity: &Identity,
        transaction_id: &TransactionId,
        units: u64,
    ) -> Result<CreditReceipt, CreditSinkError> {
        match self.ledger.credit(identity, transaction_id, units).await {
            Ok(CreditOutcome::Applied { balance }) => Ok(CreditReceipt::Applied { balance }),
            Ok(CreditOutcome::Rejected(_)) => Ok(CreditReceipt::AlreadyApplied),
            Err(e) => Err(CreditSinkError {
                reason: e.to_string(),
            }),
        }
    }

    fn balance_of(&self, identity: &Identity) -> u64 {
        self.ledger.balance_of(identity)
    }

    fn is_credited(&self, transaction_id: &TransactionId) -> bool {
        self.ledger.is_credited(transaction_id)
    }
}
