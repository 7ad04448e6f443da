use crate::contract::model::LogEvent;

/// Output port: append-only store of activity log events.
///
/// Implementations must be safe under concurrent appends and reads. A
/// snapshot never observes a partially appended event.
pub trait LogSink: Send + Sync + 'static {
    fn append(&self, event: LogEvent);

    /// Copy of all retained events in recording order.
    fn snapshot(&self) -> Vec<LogEvent>;

    /// Event at `index` in recording order.
    fn get(&self, index: usize) -> Option<LogEvent>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
