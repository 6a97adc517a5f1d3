//! Retransmission timer.
//!
//! The timer sits inside a `tokio::select!` next to the ACK channel:
//!
//! ```ignore
//! timer.arm();
//! loop {
//!     tokio::select! {
//!         Some(seq) = acks.recv() => { /* check ack */ }
//!         _ = timer.expired() => { /* resend */ }
//!     }
//! }
//! ```
//!
//! While disarmed, [`RetransmitTimer::expired`] pends forever, so the
//! waiting task sleeps until either an ACK arrives or the deadline passes.

use std::time::Duration;

use tokio::time::{self, Instant};

/// A one-shot, re-armable deadline.
#[derive(Debug)]
pub struct RetransmitTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    /// Creates a disarmed timer with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Starts (or restarts) the countdown from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// Cancels the countdown.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// `true` while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves when the armed deadline passes, then disarms.
    ///
    /// Pends forever while disarmed.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expired_fires_after_timeout() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(500));
        timer.arm();
        let start = Instant::now();

        timer.expired().await;

        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(10));
        let result = time::timeout(Duration::from_secs(60), timer.expired()).await;
        assert!(result.is_err(), "disarmed timer should pend forever");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_pushes_deadline_forward() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(500));
        timer.arm();
        time::advance(Duration::from_millis(400)).await;
        timer.arm();

        let start = Instant::now();
        timer.expired().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
