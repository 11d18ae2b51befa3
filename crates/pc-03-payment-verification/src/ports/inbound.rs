//! Driving Ports (API - Inbound)

use crate::domain::PendingPayment;
use crate::error::VerificationResult;
use async_trait::async_trait;
use shared_types::{Identity, MetricsSummary, TransactionId, TransactionMetrics};

/// A purchase to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub transaction_id: TransactionId,
    pub identity: Identity,
    pub amount_sompi: u64,
}

/// Answer to a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub payment: PendingPayment,
    /// False when the id was already known and its current status is returned.
    pub started: bool,
    pub current_balance: u64,
}

/// Payment verification API
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Register a payment and start its verification task.
    ///
    /// A known id in flight or confirmed returns its status. A TimedOut or
    /// Failed id starts a fresh verification.
    async fn submit(&self, request: PaymentRequest) -> VerificationResult<SubmitOutcome>;

    fn status(&self, transaction_id: &TransactionId) -> Option<PendingPayment>;

    fn transaction_metrics(&self, transaction_id: &TransactionId) -> Option<TransactionMetrics>;

    fn summary(&self) -> MetricsSummary;

    /// One oracle query for a payment that stopped without credit.
    async fn reconcile(&self, transaction_id: &TransactionId)
        -> VerificationResult<PendingPayment>;

    /// Stop polling a payment and close it as TimedOut, so the id can be
    /// resubmitted or reconciled.
    async fn cancel(&self, transaction_id: &TransactionId) -> bool;

    /// Payments not yet terminal.
    fn in_flight(&self) -> usize;
}
