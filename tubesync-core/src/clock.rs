//! Coordinator clock estimation
//!
//! Measures round-trip time to the coordinator with PING/PONG frames and
//! estimates the offset between our monotonic clock and the coordinator's,
//! so callers can derive the live playback position of a playing room.
//!
//! The estimate is advisory. The reconciliation engine never consults it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Number of samples to keep for averaging
const SAMPLE_COUNT: usize = 5;

/// Pings older than this are assumed lost
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// One completed ping/pong exchange
#[derive(Debug, Clone, Copy)]
struct ClockSample {
    rtt_secs: f64,
    /// Coordinator time minus local time, in seconds
    offset_secs: f64,
}

/// Tracks the coordinator clock relative to ours
#[derive(Debug)]
pub struct ServerClock {
    /// Local reference point; local times are seconds since this instant
    origin: Instant,
    /// Pings awaiting a pong. The coordinator echoes no nonce, so replies
    /// are matched oldest first.
    pending: VecDeque<Instant>,
    samples: VecDeque<ClockSample>,
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            pending: VecDeque::new(),
            samples: VecDeque::with_capacity(SAMPLE_COUNT),
        }
    }

    /// Forget everything (on disconnect)
    pub fn clear(&mut self) {
        self.pending.clear();
        self.samples.clear();
    }

    /// Record that a ping is being sent now
    pub fn record_ping(&mut self) {
        self.record_ping_at(Instant::now());
    }

    fn record_ping_at(&mut self, sent_at: Instant) {
        self.pending
            .retain(|p| sent_at.saturating_duration_since(*p) < PING_TIMEOUT);
        self.pending.push_back(sent_at);
    }

    /// Handle a pong carrying the coordinator clock. Returns the measured RTT
    /// in milliseconds, or `None` if no ping was outstanding.
    pub fn handle_pong(&mut self, server_time: f64) -> Option<u64> {
        self.handle_pong_at(server_time, Instant::now())
    }

    fn handle_pong_at(&mut self, server_time: f64, received_at: Instant) -> Option<u64> {
        let sent_at = self.pending.pop_front()?;
        let rtt = received_at.saturating_duration_since(sent_at);
        let rtt_secs = rtt.as_secs_f64();

        // Assume the coordinator stamped the reply halfway through the trip
        let local_mid = self.local_secs(sent_at) + rtt_secs / 2.0;
        let sample = ClockSample {
            rtt_secs,
            offset_secs: server_time - local_mid,
        };

        if self.samples.len() >= SAMPLE_COUNT {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        tracing::debug!(
            "Coordinator clock: RTT={}ms, offset={:.3}s, samples={}",
            rtt.as_millis(),
            sample.offset_secs,
            self.samples.len()
        );

        Some(rtt.as_millis() as u64)
    }

    /// Average round-trip time in milliseconds
    pub fn rtt_ms(&self) -> Option<u64> {
        self.average(|s| s.rtt_secs)
            .map(|secs| (secs * 1000.0).round() as u64)
    }

    /// Average clock offset (coordinator minus local) in seconds
    pub fn offset_secs(&self) -> Option<f64> {
        self.average(|s| s.offset_secs)
    }

    /// Estimate the coordinator clock right now
    pub fn estimate_server_now(&self) -> Option<f64> {
        self.estimate_server_at(Instant::now())
    }

    fn estimate_server_at(&self, local: Instant) -> Option<f64> {
        self.offset_secs()
            .map(|offset| self.local_secs(local) + offset)
    }

    fn local_secs(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.origin).as_secs_f64()
    }

    fn average(&self, field: impl Fn(&ClockSample) -> f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().map(field).sum();
        Some(sum / self.samples.len() as f64)
    }
}

/// Thread-safe wrapper for ServerClock
pub type SharedServerClock = Arc<RwLock<ServerClock>>;

/// Create a new shared clock
pub fn new_shared_clock() -> SharedServerClock {
    Arc::new(RwLock::new(ServerClock::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_no_samples() {
        let clock = ServerClock::new();
        assert_eq!(clock.rtt_ms(), None);
        assert_eq!(clock.offset_secs(), None);
        assert_eq!(clock.estimate_server_now(), None);
    }

    #[test]
    fn test_pong_without_ping_is_ignored() {
        let mut clock = ServerClock::new();
        assert_eq!(clock.handle_pong(100.0), None);
        assert_eq!(clock.offset_secs(), None);
    }

    #[test]
    fn test_offset_estimate() {
        let mut clock = ServerClock::new();
        let origin = clock.origin;

        clock.record_ping_at(origin + Duration::from_secs(1));
        let rtt = clock.handle_pong_at(500.0, origin + Duration::from_millis(1200));
        assert_eq!(rtt, Some(200));

        // Reply stamped at local 1.1s => offset 498.9s
        assert!(approx(clock.offset_secs().unwrap(), 498.9));
        let estimate = clock
            .estimate_server_at(origin + Duration::from_secs(3))
            .unwrap();
        assert!(approx(estimate, 501.9));
    }

    #[test]
    fn test_pongs_match_oldest_ping() {
        let mut clock = ServerClock::new();
        let origin = clock.origin;

        clock.record_ping_at(origin + Duration::from_millis(100));
        clock.record_ping_at(origin + Duration::from_millis(300));

        let first = clock.handle_pong_at(10.0, origin + Duration::from_millis(400));
        assert_eq!(first, Some(300));
        let second = clock.handle_pong_at(10.0, origin + Duration::from_millis(500));
        assert_eq!(second, Some(200));
        assert_eq!(clock.rtt_ms(), Some(250));
    }

    #[test]
    fn test_keeps_recent_samples_only() {
        let mut clock = ServerClock::new();
        let origin = clock.origin;

        // An early slow sample falls out of the window
        clock.record_ping_at(origin);
        clock.handle_pong_at(0.0, origin + Duration::from_millis(1000));
        for i in 1..=SAMPLE_COUNT as u64 {
            let sent = origin + Duration::from_secs(i * 2);
            clock.record_ping_at(sent);
            clock.handle_pong_at(0.0, sent + Duration::from_millis(100));
        }

        assert_eq!(clock.samples.len(), SAMPLE_COUNT);
        assert_eq!(clock.rtt_ms(), Some(100));
    }

    #[test]
    fn test_stale_pings_expire() {
        let mut clock = ServerClock::new();
        let origin = clock.origin;

        clock.record_ping_at(origin);
        clock.record_ping_at(origin + PING_TIMEOUT + Duration::from_secs(1));
        assert_eq!(clock.pending.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut clock = ServerClock::new();
        clock.record_ping();
        clock.handle_pong(1.0);
        clock.record_ping();
        clock.clear();
        assert!(clock.pending.is_empty());
        assert_eq!(clock.offset_secs(), None);
    }
}
