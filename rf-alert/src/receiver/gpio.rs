//! Raspberry Pi GPIO receiver.

use std::time::Instant;

use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tracing::{debug, warn};

use super::{SharedDecoder, SignalSource};
use crate::domain::SignalEvent;
use crate::{Error, Result};

/// Receiver data line wired to a BCM GPIO pin.
///
/// Every level change is timestamped on rppal's interrupt thread and fed to a
/// [`SharedDecoder`].
pub struct GpioReceiver {
    pin_number: u8,
    pin: Option<InputPin>,
    decoder: SharedDecoder,
}

impl GpioReceiver {
    pub fn new(pin_number: u8) -> Self {
        Self {
            pin_number,
            pin: None,
            decoder: SharedDecoder::new(),
        }
    }

    fn receiver_error(&self, e: rppal::gpio::Error) -> Error {
        Error::Receiver(format!("GPIO {}: {e}", self.pin_number))
    }
}

impl SignalSource for GpioReceiver {
    fn enable(&mut self) -> Result<()> {
        let gpio = Gpio::new().map_err(|e| self.receiver_error(e))?;
        let mut pin = gpio
            .get(self.pin_number)
            .map_err(|e| self.receiver_error(e))?
            .into_input();

        let decoder = self.decoder.clone();
        let epoch = Instant::now();
        pin.set_async_interrupt(Trigger::Both, move |_level: Level| {
            let timestamp_us = epoch.elapsed().as_micros() as u64;
            decoder.on_edge(timestamp_us);
        })
        .map_err(|e| self.receiver_error(e))?;

        debug!(pin = self.pin_number, "GPIO edge interrupt armed");
        self.pin = Some(pin);
        Ok(())
    }

    fn latest(&self) -> Result<Option<SignalEvent>> {
        Ok(self.decoder.latest())
    }

    fn cleanup(&mut self) {
        if let Some(mut pin) = self.pin.take() {
            if let Err(e) = pin.clear_async_interrupt() {
                warn!(pin = self.pin_number, error = %e, "Failed to clear GPIO interrupt");
            }
        }
    }
}
