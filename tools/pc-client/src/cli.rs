//! Command-line arguments.

use clap::{Parser, Subcommand};
use shared_types::{Color, TransactionId};
use std::time::Duration;

/// Pixel Canvas client
#[derive(Parser, Debug)]
#[command(name = "pc-client")]
#[command(about = "Watch the shared canvas, place pixels and buy pixel credit")]
pub struct Cli {
    /// Server root URL
    #[arg(short, long, default_value = "http://127.0.0.1:3000", env = "PC_SERVER_URL")]
    pub server: String,

    /// Wallet address identifying the player
    #[arg(short, long, env = "PC_WALLET")]
    pub wallet: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Follow the broadcast stream and print every change
    Watch,

    /// Place one pixel
    Place {
        x: u32,
        y: u32,
        /// `#RRGGBB`
        #[arg(value_parser = parse_color)]
        color: Color,
    },

    /// Submit a payment and wait until its credit is spendable
    Buy {
        /// Transaction id as returned by the wallet (plain, quoted or JSON)
        #[arg(value_parser = parse_transaction_id)]
        transaction: TransactionId,

        /// Amount paid in sompi (default: one pixel pack)
        #[arg(long)]
        amount: Option<u64>,
    },

    /// Print the wallet's credit balance
    Balance,
}

fn parse_color(raw: &str) -> Result<Color, String> {
    Color::parse(raw).map_err(|e| e.to_string())
}

fn parse_transaction_id(raw: &str) -> Result<TransactionId, String> {
    TransactionId::parse(raw).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_parses_color() {
        let cli = Cli::try_parse_from([
            "pc-client", "--wallet", "kaspa:alice", "place", "3", "4", "#00ff00",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Place {
                x: 3,
                y: 4,
                color: Color::from_rgb(0, 255, 0),
            }
        );
        assert_eq!(cli.server, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_place_rejects_bad_color() {
        let result = Cli::try_parse_from([
            "pc-client", "--wallet", "kaspa:alice", "place", "3", "4", "green",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_buy_normalizes_transaction_id() {
        let cli = Cli::try_parse_from([
            "pc-client",
            "--wallet",
            "kaspa:alice",
            "buy",
            r#"{"transactionId":"abc"}"#,
            "--amount",
            "40000000",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Buy {
                transaction: TransactionId::parse("abc").unwrap(),
                amount: Some(40_000_000),
            }
        );
    }

    #[test]
    fn test_timeout_never_zero() {
        let cli =
            Cli::try_parse_from(["pc-client", "-w", "kaspa:a", "--timeout", "0", "balance"])
                .unwrap();
        assert_eq!(cli.request_timeout(), Duration::from_secs(1));
    }
}
