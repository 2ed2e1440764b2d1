//! stowage-notify — best-effort delivery of run reports to the operator.
//!
//! A run sends two messages: one when it starts and a summary when it
//! ends. Delivery failures never affect the run; they are logged at
//! debug level and dropped.

pub mod memory;
pub mod notifier;
pub mod telegram;

pub use memory::MemoryNotifier;
pub use notifier::{NoopNotifier, Notifier, NotifyError, NotifyResult, deliver, from_config};
pub use telegram::TelegramNotifier;
