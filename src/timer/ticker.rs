use std::time::{Duration, Instant};

/// Periodic display tick. Disarmed tickers schedule nothing, so the event
/// loop can block until the next input.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn arm(&mut self) {
        if self.next.is_none() {
            self.next = Some(Instant::now() + self.interval);
        }
    }

    pub fn disarm(&mut self) {
        self.next = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    /// Time left until the next tick, or `None` while disarmed.
    pub fn timeout(&self) -> Option<Duration> {
        self.next
            .map(|next| next.saturating_duration_since(Instant::now()))
    }

    /// Returns true and schedules the following tick once the current one is
    /// due.
    pub fn poll_due(&mut self) -> bool {
        match self.next {
            Some(next) if Instant::now() >= next => {
                self.next = Some(Instant::now() + self.interval);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_ticker_schedules_nothing() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        assert!(!ticker.is_armed());
        assert_eq!(ticker.timeout(), None);
        assert!(!ticker.poll_due());
    }

    #[test]
    fn armed_ticker_fires_after_interval() {
        let mut ticker = Ticker::new(Duration::from_millis(5));
        ticker.arm();
        assert!(ticker.timeout().is_some_and(|left| left <= Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(10));
        assert!(ticker.poll_due());
        assert!(ticker.is_armed());
        ticker.disarm();
        assert!(!ticker.poll_due());
    }
}
