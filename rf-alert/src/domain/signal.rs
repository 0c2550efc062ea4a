//! Decoded radio signal snapshots.

use super::AlertCode;

/// Opaque marker of when a transmission was decoded.
///
/// Holds the microsecond timestamp of the edge that completed the frame.
/// Only equality is meaningful: a different stamp means a new transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalStamp(pub u64);

/// Snapshot of the receiver's last decoded transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    pub code: AlertCode,
    pub pulse_length: u32,
    pub protocol: u8,
    pub bit_length: u32,
    pub timestamp: SignalStamp,
    /// Number of frames decoded so far, including this one.
    pub sequence: u64,
}

impl SignalEvent {
    /// Whether this snapshot describes a different transmission than `last`.
    pub fn is_new_since(&self, last: Option<SignalStamp>) -> bool {
        last != Some(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stamp: u64) -> SignalEvent {
        SignalEvent {
            code: AlertCode(1),
            pulse_length: 350,
            protocol: 1,
            bit_length: 24,
            timestamp: SignalStamp(stamp),
            sequence: 1,
        }
    }

    #[test]
    fn same_stamp_is_not_new() {
        assert!(!event(10).is_new_since(Some(SignalStamp(10))));
        assert!(event(11).is_new_since(Some(SignalStamp(10))));
        assert!(event(10).is_new_since(None));
    }
}
