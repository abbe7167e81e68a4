use crate::chat::{GenerationState, Message};

/// Visual weight of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Sink for transient user-visible notices (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Render sink invoked whenever the active thread or generation state changes.
pub trait SessionObserver: Send + Sync {
    fn messages_changed(&self, messages: &[Message]);
    fn generation_changed(&self, state: GenerationState);
}

/// Observer that ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn messages_changed(&self, _messages: &[Message]) {}

    fn generation_changed(&self, _state: GenerationState) {}
}
