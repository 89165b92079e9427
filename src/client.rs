use crate::config::WriterConfig;
use crate::Result;
use std::time::{Duration, Instant};

/// Fixed interval between pump calls while draining the outbound queue,
/// clamped to whatever is left of the drain budget.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An owned publishing handle bound to one destination topic.
///
/// This is the seam between the writer backend and the broker library:
/// the backend only ever enqueues payloads, pumps the client's event
/// loop, and watches the outbound-queue length. Everything else
/// (connections, partitioning, delivery reports) belongs to the
/// implementation, which keeps the whole delivery pipeline testable
/// without a broker.
///
/// The client will not make background progress on its own: [`pump`]
/// must be called after every publish and on every heartbeat tick so
/// that queued sends flush and delivery reports fire.
///
/// [`pump`]: DeliveryClient::pump
pub trait DeliveryClient: Sized {
    /// Construct a client bound to `topic`, applying every configured
    /// broker setting.
    ///
    /// Any rejected setting fails setup with the offending key, value,
    /// and library error text ([`Error::Config`]); a failed client or
    /// topic-handle construction is equally fatal. On failure no
    /// client resources remain allocated.
    ///
    /// [`Error::Config`]: crate::Error::Config
    fn setup(config: &WriterConfig, topic: &str) -> Result<Self>;

    /// Hand one serialized record to the outbound queue. Non-blocking;
    /// an immediate rejection (queue full, unknown topic) is returned
    /// as an error and the payload is dropped.
    fn publish(&mut self, payload: &[u8]) -> Result<()>;

    /// Drive the client's internal event/delivery-report loop for up
    /// to `timeout`. `Duration::ZERO` is non-blocking.
    fn pump(&mut self, timeout: Duration);

    /// Number of messages still queued or awaiting acknowledgement.
    fn outstanding(&self) -> usize;

    /// Pump at a fixed interval until the outbound queue is empty or
    /// `max_wait` has elapsed, whichever comes first. Returns whether
    /// the queue reached zero.
    ///
    /// The deadline is checked against a monotonic clock on every
    /// iteration, so a client that never drains costs at most
    /// `max_wait`.
    fn drain(&mut self, max_wait: Duration) -> bool {
        let deadline = Instant::now() + max_wait;
        while self.outstanding() > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump(DRAIN_POLL_INTERVAL.min(deadline - now));
        }
        true
    }
}
