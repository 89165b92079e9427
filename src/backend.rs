use crate::record::{Field, Value};

/// The callback surface a log-writing host drives.
///
/// The host owns the schedule: it serializes every call against one
/// writer instance on a dedicated worker context, routes no further
/// writes to a writer whose `initialize` failed, and calls `finish`
/// exactly once when the stream shuts down. Methods report success to
/// the host as a `bool`; failures are logged before returning `false`.
pub trait LogWriter {
    /// One-time setup for a log stream. `stream_path` identifies the
    /// stream (e.g. "conn"); `schema` is its ordered column list.
    fn initialize(&mut self, stream_path: &str, schema: &[Field]) -> bool;

    /// Record one log entry. `values` parallels `schema`.
    fn write(&mut self, schema: &[Field], values: &[Value]) -> bool;

    /// Change of the host's requested buffering state. Writers that
    /// always deliver immediately may accept this without effect.
    fn set_buffering(&mut self, enabled: bool) -> bool;

    /// Flush buffered output, as far as that maps onto the writer's
    /// semantics.
    fn flush(&mut self, network_time: f64) -> bool;

    /// Log rotation. Writers without files acknowledge immediately by
    /// returning `true`, unblocking any host-side postprocessing wait.
    fn rotate(
        &mut self,
        rotated_path: &str,
        open_time: f64,
        close_time: f64,
        terminating: bool,
    ) -> bool;

    /// Regular heartbeat from the host's main loop.
    fn heartbeat(&mut self, network_time: f64, wall_clock: f64) -> bool;

    /// Called just before the worker shuts down. Once this returns the
    /// writer's resources are released, whatever the outcome.
    fn finish(&mut self, network_time: f64) -> bool;
}
