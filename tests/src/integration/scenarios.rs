//! # Cross-Subsystem Scenarios
//!
//! Canvas store, credit ledger, admission gate and payment verification wired
//! the way the node wires them, driven without HTTP.
//!
//! ## Flows Tested
//!
//! 1. **Admission → Ledger**: a write without credit is denied and leaves the
//!    grid untouched
//! 2. **Verification → Ledger → Admission**: a confirmed purchase funds exactly
//!    the writes it paid for
//! 3. **Idempotent credit**: a transaction id credits once, however often it
//!    is reported
//! 4. **Late confirmation**: a payment confirmed after its window only credits
//!    through reconciliation

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use node_runtime::{NodeConfig, SubsystemContainer};
    use pc_01_canvas_store::CanvasStoreApi;
    use pc_02_credit_ledger::{
        AdmissionApi, AdmissionError, CreditLedgerApi, CreditOutcome, WriteRequest,
    };
    use pc_03_payment_verification::{PaymentRequest, VerificationApi, VerificationError};
    use shared_bus::{CanvasEvent, EventFilter, EventTopic};
    use shared_types::{Color, Coord, Identity, PaymentState, TransactionId, WriteId};

    use crate::fixtures::{create_test_container, eventually, ConfirmAt, ScriptedOracle};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const PACK_COST: u64 = 20_000_000;

    fn alice() -> Identity {
        Identity::new("kaspa:alice").unwrap()
    }

    fn tx(id: &str) -> TransactionId {
        TransactionId::parse(id).unwrap()
    }

    fn write(identity: &Identity, x: u32, y: u32, color: &str) -> WriteRequest {
        WriteRequest {
            coord: Coord::new(x, y),
            color: Color::parse(color).unwrap(),
            identity: identity.clone(),
            write_id: WriteId::generate(),
        }
    }

    fn container(confirm_at: ConfirmAt) -> (SubsystemContainer<ScriptedOracle>, Arc<ScriptedOracle>) {
        let oracle = Arc::new(ScriptedOracle::new(confirm_at));
        let container = create_test_container(NodeConfig::for_testing(), Arc::clone(&oracle));
        (container, oracle)
    }

    async fn wait_for_state(
        container: &SubsystemContainer<ScriptedOracle>,
        transaction_id: &TransactionId,
        state: PaymentState,
    ) -> bool {
        eventually(Duration::from_secs(5), || {
            container
                .verification
                .status(transaction_id)
                .is_some_and(|p| p.state == state)
        })
        .await
    }

    // =============================================================================
    // ADMISSION
    // =============================================================================

    #[tokio::test]
    async fn test_write_without_credit_denied_and_grid_unchanged() {
        let (container, _) = container(ConfirmAt::Check(1));

        let result = container
            .admission
            .write(write(&alice(), 5, 5, "#FF0000"))
            .await;

        assert!(matches!(
            result,
            Err(AdmissionError::InsufficientCredit { balance: 0, .. })
        ));
        assert!(container.canvas.snapshot().cells.is_empty());
        assert_eq!(container.canvas.revision(), 0);
        assert_eq!(container.ledger.balance_of(&alice()), 0);
    }

    #[tokio::test]
    async fn test_snapshot_after_three_writes_has_exactly_those_cells() {
        let (container, _) = container(ConfirmAt::Check(1));
        container.ledger.credit(&alice(), &tx("seed"), 3).await.unwrap();

        let mut committed = Vec::new();
        for (x, y, color) in [(0, 0, "#FF0000"), (1, 2, "#00FF00"), (3, 3, "#0000FF")] {
            let receipt = container
                .admission
                .write(write(&alice(), x, y, color))
                .await
                .unwrap();
            committed.push(receipt.cell);
        }

        let mut snapshot = container.canvas.snapshot();
        snapshot.cells.sort_by_key(|c| c.revision);
        assert_eq!(snapshot.revision, 3);
        assert_eq!(snapshot.cells, committed);
        assert_eq!(container.ledger.balance_of(&alice()), 0);
    }

    #[tokio::test]
    async fn test_last_writer_wins_on_one_cell() {
        let (container, _) = container(ConfirmAt::Check(1));
        let bob = Identity::new("kaspa:bob").unwrap();
        container.ledger.credit(&alice(), &tx("a"), 1).await.unwrap();
        container.ledger.credit(&bob, &tx("b"), 1).await.unwrap();

        let first = container
            .admission
            .write(write(&alice(), 0, 0, "#FF0000"))
            .await
            .unwrap();
        let second = container
            .admission
            .write(write(&bob, 0, 0, "#0000FF"))
            .await
            .unwrap();

        assert!(second.cell.revision > first.cell.revision);
        let cell = container.canvas.get(Coord::new(0, 0)).unwrap().unwrap();
        assert_eq!(cell.color, Color::parse("#0000FF").unwrap());
        assert_eq!(cell.owner, bob);
    }

    #[tokio::test]
    async fn test_commits_are_broadcast_in_revision_order() {
        let (container, _) = container(ConfirmAt::Check(1));
        let mut subscription = container
            .event_bus
            .subscribe(EventFilter::topics(vec![EventTopic::Canvas]));
        container.ledger.credit(&alice(), &tx("seed"), 3).await.unwrap();

        for x in 0..3 {
            container
                .admission
                .write(write(&alice(), x, 0, "#123456"))
                .await
                .unwrap();
        }

        let mut revisions = Vec::new();
        while revisions.len() < 3 {
            match subscription.recv().await.unwrap() {
                CanvasEvent::CellCommitted(cell) => revisions.push(cell.revision),
                _ => {}
            }
        }
        assert_eq!(revisions, vec![1, 2, 3]);
    }

    // =============================================================================
    // VERIFICATION → LEDGER → ADMISSION
    // =============================================================================

    #[tokio::test]
    async fn test_purchase_confirmed_after_three_polls_funds_ten_writes() {
        let (container, oracle) = container(ConfirmAt::Check(3));
        let payment = tx("pay-1");

        let outcome = container
            .verification
            .submit(PaymentRequest {
                transaction_id: payment.clone(),
                identity: alice(),
                amount_sompi: PACK_COST,
            })
            .await
            .unwrap();
        assert!(outcome.started);
        assert_eq!(outcome.payment.expected_units, 10);

        assert!(wait_for_state(&container, &payment, PaymentState::Confirmed).await);
        let settled = container.verification.status(&payment).unwrap();
        assert_eq!(settled.poll_count, 3);
        assert!(settled.credited);
        assert_eq!(oracle.checks_of(&payment), 3);
        assert_eq!(container.ledger.balance_of(&alice()), 10);

        for i in 0..10 {
            container
                .admission
                .write(write(&alice(), i, 0, "#FF0000"))
                .await
                .unwrap();
        }
        assert!(matches!(
            container
                .admission
                .write(write(&alice(), 10, 0, "#FF0000"))
                .await,
            Err(AdmissionError::InsufficientCredit { balance: 0, .. })
        ));
        assert_eq!(container.canvas.snapshot().cells.len(), 10);
    }

    #[tokio::test]
    async fn test_resubmitting_confirmed_payment_does_not_credit_again() {
        let (container, _) = container(ConfirmAt::Check(1));
        let payment = tx("pay-2");
        let request = PaymentRequest {
            transaction_id: payment.clone(),
            identity: alice(),
            amount_sompi: PACK_COST,
        };

        container.verification.submit(request.clone()).await.unwrap();
        assert!(wait_for_state(&container, &payment, PaymentState::Confirmed).await);

        let again = container.verification.submit(request).await.unwrap();
        assert!(!again.started);
        assert_eq!(again.payment.state, PaymentState::Confirmed);
        assert_eq!(again.current_balance, 10);
        assert_eq!(container.ledger.balance_of(&alice()), 10);
    }

    #[tokio::test]
    async fn test_crediting_same_transaction_twice_equals_once() {
        let (container, _) = container(ConfirmAt::Check(1));

        let first = container.ledger.credit(&alice(), &tx("dup"), 10).await.unwrap();
        let second = container.ledger.credit(&alice(), &tx("dup"), 10).await.unwrap();

        assert_eq!(first, CreditOutcome::Applied { balance: 10 });
        assert!(matches!(second, CreditOutcome::Rejected(_)));
        assert_eq!(container.ledger.balance_of(&alice()), 10);
    }

    #[tokio::test]
    async fn test_quoted_and_object_transaction_ids_are_one_payment() {
        let (container, _) = container(ConfirmAt::Check(1));
        let plain = tx("abc123");

        container
            .verification
            .submit(PaymentRequest {
                transaction_id: plain.clone(),
                identity: alice(),
                amount_sompi: PACK_COST,
            })
            .await
            .unwrap();
        assert!(wait_for_state(&container, &plain, PaymentState::Confirmed).await);

        for raw in ["\"abc123\"", r#"{"id": "abc123"}"#, r#"{"transactionId": "abc123"}"#] {
            let again = container
                .verification
                .submit(PaymentRequest {
                    transaction_id: TransactionId::parse(raw).unwrap(),
                    identity: alice(),
                    amount_sompi: PACK_COST,
                })
                .await
                .unwrap();
            assert!(!again.started, "{raw} was not recognized");
        }
        assert_eq!(container.ledger.balance_of(&alice()), 10);
    }

    // =============================================================================
    // LATE CONFIRMATION
    // =============================================================================

    #[tokio::test]
    async fn test_confirmation_after_timeout_needs_reconciliation() {
        let (container, oracle) = container(ConfirmAt::Released);
        let payment = tx("late");

        container
            .verification
            .submit(PaymentRequest {
                transaction_id: payment.clone(),
                identity: alice(),
                amount_sompi: PACK_COST,
            })
            .await
            .unwrap();
        assert!(wait_for_state(&container, &payment, PaymentState::TimedOut).await);

        // The chain confirms it now, but nothing is polling any more.
        oracle.release();
        let checks = oracle.total_checks();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(oracle.total_checks(), checks);
        assert_eq!(container.ledger.balance_of(&alice()), 0);

        let reconciled = container.verification.reconcile(&payment).await.unwrap();
        assert_eq!(reconciled.state, PaymentState::Confirmed);
        assert!(reconciled.credited);
        assert_eq!(container.ledger.balance_of(&alice()), 10);

        // Already credited: reconciling again changes nothing.
        container.verification.reconcile(&payment).await.unwrap();
        assert_eq!(container.ledger.balance_of(&alice()), 10);
    }

    #[tokio::test]
    async fn test_reconcile_rejects_payment_still_polling() {
        let (container, _) = container(ConfirmAt::Released);
        let payment = tx("busy");

        container
            .verification
            .submit(PaymentRequest {
                transaction_id: payment.clone(),
                identity: alice(),
                amount_sompi: PACK_COST,
            })
            .await
            .unwrap();

        assert!(matches!(
            container.verification.reconcile(&payment).await,
            Err(VerificationError::NotReconcilable { .. })
        ));
        assert!(matches!(
            container.verification.reconcile(&tx("never-submitted")).await,
            Err(VerificationError::UnknownTransaction(_))
        ));
        container.verification.cancel(&payment).await;
    }

    #[tokio::test]
    async fn test_timed_out_payment_can_be_resubmitted() {
        let (container, oracle) = container(ConfirmAt::Released);
        let payment = tx("retry");
        let request = PaymentRequest {
            transaction_id: payment.clone(),
            identity: alice(),
            amount_sompi: PACK_COST,
        };

        container.verification.submit(request.clone()).await.unwrap();
        assert!(wait_for_state(&container, &payment, PaymentState::TimedOut).await);

        oracle.release();
        let again = container.verification.submit(request).await.unwrap();
        assert!(again.started);
        assert!(wait_for_state(&container, &payment, PaymentState::Confirmed).await);
        assert_eq!(container.ledger.balance_of(&alice()), 10);
    }

    #[tokio::test]
    async fn test_amount_below_pack_cost_rejected() {
        let (container, _) = container(ConfirmAt::Check(1));
        let result = container
            .verification
            .submit(PaymentRequest {
                transaction_id: tx("tiny"),
                identity: alice(),
                amount_sompi: PACK_COST - 1,
            })
            .await;
        assert!(matches!(result, Err(VerificationError::AmountTooSmall { .. })));
        assert_eq!(container.verification.in_flight(), 0);
    }
}
