//! Notification boundary. The booking engine informs a collaborator after
//! every successful schedule/reschedule/cancel as a fire-and-forget side
//! effect; delivery is someone else's problem and failures never propagate
//! back into the booking path.

/// Receives human-readable summaries of booking lifecycle events.
pub trait Notifier {
    fn notify(&self, summary: &str);
}

/// Default notifier: emits the summary on the tracing stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, summary: &str) {
        tracing::info!(target: "wardbook::notify", "{summary}");
    }
}

/// Silently drops notifications; handy for embedders that poll state instead.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _summary: &str) {}
}
