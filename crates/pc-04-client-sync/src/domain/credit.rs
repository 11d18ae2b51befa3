//! Local credit estimate
//!
//! The last balance the server reported, minus units reserved by local
//! writes still waiting for an answer. Every server figure replaces the
//! estimate outright.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalCreditEstimate {
    confirmed: u64,
    reserved: u64,
}

impl LocalCreditEstimate {
    pub fn new(confirmed: u64) -> Self {
        Self {
            confirmed,
            reserved: 0,
        }
    }

    /// Units the client believes it can still spend.
    pub fn available(&self) -> u64 {
        self.confirmed.saturating_sub(self.reserved)
    }

    /// Last balance reported by the server.
    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    /// Reserve one unit for an outgoing write.
    pub fn reserve(&mut self) {
        self.reserved += 1;
    }

    /// A reserved write was accepted; the server says `remaining` are left.
    pub fn settle(&mut self, remaining: u64) {
        self.reserved = self.reserved.saturating_sub(1);
        self.confirmed = remaining;
    }

    /// A reserved write was refused.
    pub fn release(&mut self) {
        self.reserved = self.reserved.saturating_sub(1);
    }

    /// Adopt a balance read from the server.
    pub fn observe(&mut self, balance: u64) {
        self.confirmed = balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_settle() {
        let mut credit = LocalCreditEstimate::new(3);
        credit.reserve();
        credit.reserve();
        assert_eq!(credit.available(), 1);

        credit.settle(2);
        assert_eq!(credit.available(), 1);
        credit.release();
        assert_eq!(credit.available(), 2);
    }

    #[test]
    fn test_server_figure_replaces_estimate() {
        let mut credit = LocalCreditEstimate::new(10);
        credit.reserve();
        credit.observe(0);
        assert_eq!(credit.available(), 0);
        assert_eq!(credit.confirmed(), 0);
    }
}
