//! 433 MHz receiver access.
//!
//! A [`SignalSource`] exposes the last decoded transmission. The receiver is
//! owned exclusively by the process, so it is wrapped in a [`ReceiverGuard`]
//! which enables it on acquisition and releases it on every exit path.

pub mod decoder;
#[cfg(feature = "gpio")]
pub mod gpio;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

pub use decoder::{PROTOCOLS, Protocol, PulseDecoder};

use crate::config::ReceiverConfig;
use crate::domain::SignalEvent;
use crate::Result;

/// Hardware (or simulated) source of decoded radio frames.
pub trait SignalSource {
    /// Start receiving.
    fn enable(&mut self) -> Result<()>;

    /// Snapshot of the last decoded frame, if any.
    fn latest(&self) -> Result<Option<SignalEvent>>;

    /// Release the underlying hardware. Called exactly once.
    fn cleanup(&mut self);
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }

    fn latest(&self) -> Result<Option<SignalEvent>> {
        (**self).latest()
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}

/// Decoder shared between an edge interrupt handler and the listener.
#[derive(Debug, Clone, Default)]
pub struct SharedDecoder(Arc<Mutex<PulseDecoder>>);

impl SharedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_edge(&self, timestamp_us: u64) -> Option<SignalEvent> {
        self.0.lock().on_edge(timestamp_us)
    }

    pub fn latest(&self) -> Option<SignalEvent> {
        self.0.lock().latest()
    }
}

/// Scoped ownership of a [`SignalSource`].
///
/// `cleanup` runs when the guard is released or dropped, including during
/// unwinding.
pub struct ReceiverGuard<S: SignalSource> {
    source: S,
    released: bool,
}

impl<S: SignalSource> ReceiverGuard<S> {
    /// Enable `source` and take ownership of it.
    ///
    /// If enabling fails the source is cleaned up before the error is returned.
    pub fn acquire(mut source: S) -> Result<Self> {
        if let Err(e) = source.enable() {
            source.cleanup();
            return Err(e);
        }
        debug!("Receiver enabled");
        Ok(Self {
            source,
            released: false,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the receiver now instead of at drop time.
    pub fn release(mut self) {
        self.cleanup_once();
    }

    fn cleanup_once(&mut self) {
        if !self.released {
            self.released = true;
            self.source.cleanup();
            info!("Receiver released");
        }
    }
}

impl<S: SignalSource> Drop for ReceiverGuard<S> {
    fn drop(&mut self) {
        self.cleanup_once();
    }
}

/// Open the hardware receiver configured in `[receiver]`.
#[cfg(feature = "gpio")]
pub fn open_hardware(config: &ReceiverConfig) -> Result<Box<dyn SignalSource>> {
    Ok(Box::new(gpio::GpioReceiver::new(config.gpio_pin)))
}

/// Open the hardware receiver configured in `[receiver]`.
#[cfg(not(feature = "gpio"))]
pub fn open_hardware(config: &ReceiverConfig) -> Result<Box<dyn SignalSource>> {
    Err(crate::Error::Receiver(format!(
        "cannot open GPIO {}: built without the `gpio` feature",
        config.gpio_pin
    )))
}
