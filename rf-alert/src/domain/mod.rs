//! Domain value objects shared by the receiver, listener and dispatcher.

pub mod alert;
pub mod signal;

pub use alert::{AlertCatalog, AlertCode};
pub use signal::{SignalEvent, SignalStamp};
