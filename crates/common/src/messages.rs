//! Control messages for long-lived tasks.

/// Command sent on a task's control channel. Every long-lived task (feed
/// session, ingest worker, cache rebuilder, janitor) owns a receiver and
/// acknowledges shutdown by completing, which the owner observes through
/// the task's join handle.
#[derive(Debug, Clone)]
pub enum ControlCommand {
    /// Graceful shutdown
    Shutdown,
}
