//! Admission Gate - credit check in front of the canonical store
//!
//! Write path:
//! 1. bounds check (nothing debited for an out-of-grid write)
//! 2. claim the write id for this identity (a committed id replays its
//!    original cell)
//! 3. debit one write's worth of units
//! 4. commit through the store
//! 5. on commit failure, refund the debit and release the write id

use crate::domain::{AdmissionConfig, Claim, DebitOutcome, DenialReason, WriteRegistry};
use crate::error::{AdmissionError, AdmissionResult};
use crate::ports::inbound::{AdmissionApi, CreditLedgerApi, WriteReceipt, WriteRequest};
use crate::ports::outbound::{AdmittedWrite, CellCommitter, CommitFailure};
use async_trait::async_trait;
use canvas_telemetry::{log_cell_event, WRITES_TOTAL};
use std::sync::Arc;
use tracing::error;

const SUBSYSTEM: &str = "pc-02";

pub struct AdmissionGate<L, C>
where
    L: CreditLedgerApi,
    C: CellCommitter,
{
    ledger: Arc<L>,
    committer: Arc<C>,
    registry: WriteRegistry,
    units_per_write: u64,
}

impl<L, C> AdmissionGate<L, C>
where
    L: CreditLedgerApi,
    C: CellCommitter,
{
    pub fn new(config: &AdmissionConfig, ledger: Arc<L>, committer: Arc<C>) -> Self {
        Self {
            ledger,
            committer,
            registry: WriteRegistry::new(config.max_tracked_writes),
            units_per_write: config.units_per_write,
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    fn reject(&self, outcome: &'static str, err: AdmissionError) -> AdmissionError {
        WRITES_TOTAL.with_label_values(&[outcome]).inc();
        err
    }
}

#[async_trait]
impl<L, C> AdmissionApi for AdmissionGate<L, C>
where
    L: CreditLedgerApi + 'static,
    C: CellCommitter + 'static,
{
    async fn write(&self, request: WriteRequest) -> AdmissionResult<WriteReceipt> {
        let WriteRequest {
            coord,
            color,
            identity,
            write_id,
        } = request;

        let dims = self.committer.dimensions();
        if !dims.contains(coord) {
            return Err(self.reject(
                "out_of_bounds",
                AdmissionError::OutOfBounds {
                    x: coord.x,
                    y: coord.y,
                    width: dims.width,
                    height: dims.height,
                },
            ));
        }

        match self.registry.claim(&identity, &write_id) {
            Claim::Fresh => {}
            Claim::Replay(cell) => {
                WRITES_TOTAL.with_label_values(&["replayed"]).inc();
                return Ok(WriteReceipt {
                    cell,
                    remaining_balance: self.ledger.balance_of(&identity),
                    replayed: true,
                });
            }
            Claim::InProgress => {
                return Err(self.reject(
                    "in_progress",
                    AdmissionError::WriteInProgress { write_id },
                ));
            }
        }

        let remaining = match self.ledger.try_debit(&identity, self.units_per_write) {
            Ok(DebitOutcome::Granted { remaining }) => remaining,
            Ok(DebitOutcome::Denied(DenialReason::InsufficientCredit { balance })) => {
                self.registry.release(&identity, &write_id);
                return Err(self.reject(
                    "insufficient_credit",
                    AdmissionError::InsufficientCredit { identity, balance },
                ));
            }
            Err(e) => {
                self.registry.release(&identity, &write_id);
                return Err(self.reject("ledger_error", e.into()));
            }
        };

        let admitted = AdmittedWrite {
            coord,
            color,
            owner: identity.clone(),
            write_id: write_id.clone(),
        };

        match self.committer.commit(admitted).await {
            Ok(cell) => {
                self.registry.complete(&identity, &write_id, cell.clone());
                WRITES_TOTAL.with_label_values(&["accepted"]).inc();
                log_cell_event!(
                    debug,
                    SUBSYSTEM,
                    "Write admitted",
                    cell.x,
                    cell.y,
                    identity = %identity,
                    remaining
                );
                Ok(WriteReceipt {
                    cell,
                    remaining_balance: remaining,
                    replayed: false,
                })
            }
            Err(failure) => {
                if let Err(e) = self.ledger.refund(&identity, self.units_per_write) {
                    error!(
                        subsystem = SUBSYSTEM,
                        identity = %identity,
                        error = %e,
                        "Refund after failed commit did not apply"
                    );
                }
                self.registry.release(&identity, &write_id);

                let err = match failure {
                    CommitFailure::OutOfBounds(c) => AdmissionError::OutOfBounds {
                        x: c.x,
                        y: c.y,
                        width: dims.width,
                        height: dims.height,
                    },
                    CommitFailure::Store(reason) => AdmissionError::CommitFailed { reason },
                };
                Err(self.reject("commit_failed", err))
            }
        }
    }
}
