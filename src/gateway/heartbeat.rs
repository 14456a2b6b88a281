use std::time::Duration;

use tokio::time::Instant;

/// Pure time-driven heartbeat bookkeeping.
///
/// The engine evaluates these predicates against the current clock on
/// every receive iteration; this type never performs I/O. The first beat
/// is offset by a jitter fraction of the interval so a fleet of clients
/// reconnecting at once does not beat in phase.
#[derive(Debug)]
pub struct Heartbeater {
    jitter: f64,
    interval: Option<Duration>,
    first_due: Option<Instant>,
    last_sent: Option<Instant>,
    last_ack: Option<Instant>,
}

impl Heartbeater {
    /// The jitter is drawn once per session, not per connection, and is
    /// preserved across resumes.
    pub fn new() -> Self {
        Self::with_jitter(rand::random::<f64>())
    }

    pub(crate) fn with_jitter(jitter: f64) -> Self {
        Self {
            jitter,
            interval: None,
            first_due: None,
            last_sent: None,
            last_ack: None,
        }
    }

    /// Program the schedule from a HELLO payload.
    pub fn hello(&mut self, now: Instant, interval: Duration) {
        self.interval = Some(interval);
        self.first_due = Some(now + interval.mul_f64(self.jitter));
        self.last_sent = None;
        self.last_ack = None;
    }

    /// Record that a heartbeat was written to the socket.
    pub fn record_send(&mut self, now: Instant) {
        self.last_sent = Some(now);
        self.first_due = None;
    }

    /// Record a HEARTBEAT_ACK.
    pub fn record_ack(&mut self, now: Instant) {
        self.last_ack = Some(now);
    }

    /// True iff the jittered first beat of this connection is due.
    pub fn first_beat_due(&self, now: Instant) -> bool {
        self.first_due.is_some_and(|due| now >= due)
    }

    /// True iff a full interval has elapsed since the last beat.
    pub fn next_beat_due(&self, now: Instant) -> bool {
        match (self.interval, self.last_sent) {
            (Some(interval), Some(sent)) => now > sent + interval,
            _ => false,
        }
    }

    /// True iff the last heartbeat has not been acknowledged yet.
    pub fn ack_outstanding(&self) -> bool {
        match (self.last_sent, self.last_ack) {
            (Some(sent), Some(ack)) => sent > ack,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// True iff a beat is due and the previous one was never acknowledged.
    pub fn ack_missing(&self, now: Instant) -> bool {
        self.next_beat_due(now) && self.ack_outstanding()
    }

    /// Time between the last heartbeat and its acknowledgement.
    pub fn latency(&self) -> Option<Duration> {
        match (self.last_sent, self.last_ack) {
            (Some(sent), Some(ack)) if ack >= sent => Some(ack - sent),
            _ => None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Clear everything except the jitter. Called whenever the socket
    /// closes; the next HELLO re-arms the schedule.
    pub fn reset(&mut self) {
        self.interval = None;
        self.first_due = None;
        self.last_sent = None;
        self.last_ack = None;
    }
}

impl Default for Heartbeater {
    fn default() -> Self {
        Self::new()
    }
}
