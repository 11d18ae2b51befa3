//! Plain-text rendering of engine events.

use pc_04_client_sync::{ClientEvent, WatchStop};
use shared_types::PaymentState;

/// One line per event, `None` for events not worth printing.
pub fn describe(event: &ClientEvent) -> Option<String> {
    let line = match event {
        ClientEvent::CellChanged { coord, color } => match color {
            Some(color) => format!("({}, {}) -> {color}", coord.x, coord.y),
            None => format!("({}, {}) cleared", coord.x, coord.y),
        },
        ClientEvent::SnapshotApplied { revision, cells } => {
            format!("snapshot: {cells} cells at revision {revision}")
        }
        ClientEvent::WriteRolledBack { write_id, reason } => {
            format!("write {write_id} rolled back: {reason}")
        }
        ClientEvent::OutOfCredit { balance } => {
            format!("out of credit (balance {balance}), buy a pixel pack to continue")
        }
        ClientEvent::VerificationTick { .. } => return None,
        ClientEvent::VerificationState {
            transaction_id,
            state,
        } => format!("payment {transaction_id}: {}", payment_state(*state)),
        ClientEvent::BalanceSettled(settlement) => format!(
            "balance {} ({})",
            settlement.balance,
            stop_reason(settlement.reason)
        ),
        ClientEvent::StreamConnected => "stream connected".to_string(),
        ClientEvent::StreamDisconnected { reason } => format!("stream disconnected: {reason}"),
    };
    Some(line)
}

pub fn stop_reason(reason: WatchStop) -> &'static str {
    match reason {
        WatchStop::Reached => "credit arrived",
        WatchStop::Expired => "gave up waiting; refresh later",
        WatchStop::Anomalous => "balance reads were inconsistent; refresh later",
        WatchStop::Cancelled => "cancelled",
    }
}

pub fn payment_state(state: PaymentState) -> &'static str {
    match state {
        PaymentState::Confirmed => "confirmed",
        PaymentState::TimedOut => "timed out",
        PaymentState::Failed => "failed",
        _ => "pending",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Color, Coord};

    #[test]
    fn test_cell_change_lines() {
        let painted = ClientEvent::CellChanged {
            coord: Coord::new(1, 2),
            color: Some(Color::from_rgb(255, 0, 0)),
        };
        assert_eq!(describe(&painted).unwrap(), "(1, 2) -> #FF0000");

        let cleared = ClientEvent::CellChanged {
            coord: Coord::new(1, 2),
            color: None,
        };
        assert_eq!(describe(&cleared).unwrap(), "(1, 2) cleared");
    }

    #[test]
    fn test_stream_events_described() {
        assert_eq!(
            describe(&ClientEvent::StreamConnected).unwrap(),
            "stream connected"
        );
        assert!(describe(&ClientEvent::OutOfCredit { balance: 0 })
            .unwrap()
            .contains("balance 0"));
    }
}
