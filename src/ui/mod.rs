//! Screen-facing state: alerts and the message-driven state store.

pub mod alert;
pub mod state;

pub use alert::{Alert, AlertLevel};
pub use state::{LogEntry, LogLevel, UiMessage, UiState};
