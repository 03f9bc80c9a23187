//! Notification port trait.

/// One-way, fire-and-forget message sink. Implementations must swallow
/// delivery failures (logging them); a dead notification channel must never
/// stop the trading loop.
pub trait NotifierPort {
    fn notify(&self, text: &str);
}

/// Notifier that drops everything. Used in tests and dry runs.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl NotifierPort for NullNotifier {
    fn notify(&self, _text: &str) {}
}
