//! Panic reporting through `tracing`.
//!
//! Panics unwind so the receiver guard still releases the pin; this hook only
//! makes sure the panic lands in the configured log output as well as stderr.

use std::panic::{self, PanicHookInfo};

/// Chain a hook that logs every panic before the default handler runs.
pub fn install() {
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let thread = std::thread::current();
        tracing::error!(
            target: "rf_alert::panic",
            thread = thread.name().unwrap_or("<unnamed>"),
            location = %location(info),
            "PANIC: {}",
            payload(info)
        );
        previous_hook(info);
    }));
}

fn location(info: &PanicHookInfo<'_>) -> String {
    info.location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn payload(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| info.to_string())
}
