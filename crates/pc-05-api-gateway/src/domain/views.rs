//! Response bodies built from subsystem state.

use pc_03_payment_verification::PendingPayment;
use shared_types::{
    CanvasSnapshot, CanvasStateResponse, PaymentState, PurchaseResponse, PurchaseStatus,
    VerifyResponse,
};

/// `GET /api/v1/transactions/{id}/verify` for one payment.
pub fn verify_response(payment: &PendingPayment, fastest_time: Option<f64>) -> VerifyResponse {
    let message = match payment.state {
        PaymentState::Submitted | PaymentState::Polling => "Waiting for confirmation",
        PaymentState::Confirmed if payment.credited => "Transaction confirmed",
        PaymentState::Confirmed => "Transaction confirmed, credit pending",
        PaymentState::TimedOut => "Verification timed out",
        PaymentState::Failed => "Transaction failed",
    };
    let error = match payment.state {
        PaymentState::Confirmed => payment.failure_reason.clone(),
        PaymentState::TimedOut | PaymentState::Failed => payment
            .failure_reason
            .clone()
            .or_else(|| payment.last_oracle_error.clone()),
        PaymentState::Submitted | PaymentState::Polling => payment.last_oracle_error.clone(),
    };

    VerifyResponse {
        transaction_id: payment.transaction_id.to_string(),
        verified: payment.state == PaymentState::Confirmed,
        state: payment.state,
        confirmation_time: payment.confirmation_time,
        fastest_time,
        block_hash: payment.block_hash.clone(),
        block_height: payment.block_height,
        poll_count: payment.poll_count,
        message: message.to_string(),
        error,
    }
}

/// `POST /api/v1/purchases` answer for a payment and the buyer's balance.
pub fn purchase_response(
    payment: &PendingPayment,
    current_balance: u64,
    started: bool,
) -> PurchaseResponse {
    let status = PurchaseStatus::from(payment.state);
    let message = match (status, started) {
        (PurchaseStatus::Pending, true) => "Payment submitted, waiting for confirmation",
        (PurchaseStatus::Pending, false) => "Payment already being verified",
        (PurchaseStatus::Confirmed, true) => "Payment confirmed",
        (PurchaseStatus::Confirmed, false) => "Transaction already processed",
        (PurchaseStatus::TimedOut, _) => "Payment verification timed out",
        (PurchaseStatus::Failed, _) => "Payment failed",
    };

    PurchaseResponse {
        status,
        transaction_id: payment.transaction_id.to_string(),
        estimated_pixels: payment.expected_units,
        current_balance,
        message: message.to_string(),
    }
}

/// `GET /api/v1/canvas`: `"x,y"` → color.
pub fn canvas_state(snapshot: &CanvasSnapshot) -> CanvasStateResponse {
    CanvasStateResponse {
        canvas_state: snapshot
            .cells
            .iter()
            .map(|cell| (cell.coord().key(), cell.color.to_string()))
            .collect(),
        revision: snapshot.revision,
    }
}
