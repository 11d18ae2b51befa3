//! Confirmation time statistics

use shared_types::MetricsSummary;

#[derive(Debug, Clone, Default)]
pub struct ConfirmationStats {
    total: u64,
    confirmed: u64,
    fastest: Option<f64>,
    sum: f64,
}

impl ConfirmationStats {
    pub fn record_submitted(&mut self) {
        self.total += 1;
    }

    pub fn record_confirmed(&mut self, seconds: f64) {
        self.confirmed += 1;
        self.sum += seconds;
        self.fastest = Some(match self.fastest {
            Some(f) if f <= seconds => f,
            _ => seconds,
        });
    }

    pub fn fastest(&self) -> Option<f64> {
        self.fastest
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            fastest_time: self.fastest,
            average_time: (self.confirmed > 0).then(|| self.sum / self.confirmed as f64),
            total_transactions: self.total,
            confirmed_transactions: self.confirmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = ConfirmationStats::default().summary();
        assert_eq!(summary.fastest_time, None);
        assert_eq!(summary.average_time, None);
        assert_eq!(summary.total_transactions, 0);
    }

    #[test]
    fn test_fastest_and_average() {
        let mut stats = ConfirmationStats::default();
        for _ in 0..3 {
            stats.record_submitted();
        }
        stats.record_confirmed(3.0);
        stats.record_confirmed(1.0);

        let summary = stats.summary();
        assert_eq!(summary.fastest_time, Some(1.0));
        assert_eq!(summary.average_time, Some(2.0));
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.confirmed_transactions, 2);
    }
}
