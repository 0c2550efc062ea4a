//! rc-switch compatible pulse decoder.
//!
//! Cheap 433 MHz receivers only report the level of the data line. A frame is
//! a sync gap followed by high/low pulse pairs whose lengths are multiples of
//! a base pulse length; the ratio of each pair encodes a 0 or 1 bit. The
//! decoder is fed the timestamp of every edge and keeps the last decoded
//! frame, which a listener can poll.

use crate::domain::{AlertCode, SignalEvent, SignalStamp};

/// Maximum number of edge changes kept for one frame.
pub const MAX_CHANGES: usize = 67;

/// Accepted deviation from the nominal pulse length, in percent.
const TOLERANCE_PERCENT: u64 = 80;

/// Edge gaps longer than this separate frames.
const SEPARATION_LIMIT_US: u64 = 5000;

/// Allowed jitter between two consecutive sync gaps.
const SYNC_JITTER_US: u64 = 200;

/// Timing description of one rc-switch protocol, in multiples of `pulse_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocol {
    pub pulse_length: u32,
    pub sync_high: u32,
    pub sync_low: u32,
    pub zero_high: u32,
    pub zero_low: u32,
    pub one_high: u32,
    pub one_low: u32,
}

impl Protocol {
    /// `sync`, `zero` and `one` are (high, low) multiples of `pulse_length`.
    pub const fn new(
        pulse_length: u32,
        sync: (u32, u32),
        zero: (u32, u32),
        one: (u32, u32),
    ) -> Self {
        Self {
            pulse_length,
            sync_high: sync.0,
            sync_low: sync.1,
            zero_high: zero.0,
            zero_low: zero.1,
            one_high: one.0,
            one_low: one.1,
        }
    }
}

/// Protocols 1 through 6, indexed from zero.
pub const PROTOCOLS: [Protocol; 6] = [
    Protocol::new(350, (1, 31), (1, 3), (3, 1)),
    Protocol::new(650, (1, 10), (1, 2), (2, 1)),
    Protocol::new(100, (30, 71), (4, 11), (9, 6)),
    Protocol::new(380, (1, 6), (1, 3), (3, 1)),
    Protocol::new(500, (6, 14), (1, 2), (2, 1)),
    Protocol::new(200, (1, 10), (1, 5), (1, 1)),
];

/// Stateful edge-timing decoder.
#[derive(Debug, Clone)]
pub struct PulseDecoder {
    timings: [u64; MAX_CHANGES],
    change_count: usize,
    repeat_count: u32,
    last_edge_us: Option<u64>,
    decoded: u64,
    last: Option<SignalEvent>,
}

impl Default for PulseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseDecoder {
    pub fn new() -> Self {
        Self {
            timings: [0; MAX_CHANGES],
            change_count: 0,
            repeat_count: 0,
            last_edge_us: None,
            decoded: 0,
            last: None,
        }
    }

    /// Last successfully decoded frame.
    pub fn latest(&self) -> Option<SignalEvent> {
        self.last
    }

    /// Number of frames decoded so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Feed the timestamp (µs, monotonic) of one level change.
    ///
    /// Returns the frame when this edge completed one.
    pub fn on_edge(&mut self, timestamp_us: u64) -> Option<SignalEvent> {
        let Some(last_edge) = self.last_edge_us.replace(timestamp_us) else {
            return None;
        };
        let duration = timestamp_us.saturating_sub(last_edge);
        let mut decoded = None;

        if duration > SEPARATION_LIMIT_US {
            if duration.abs_diff(self.timings[0]) < SYNC_JITTER_US {
                self.repeat_count += 1;
                self.change_count = self.change_count.saturating_sub(1);
                if self.repeat_count == 2 {
                    decoded = (0..PROTOCOLS.len())
                        .find_map(|idx| self.decode_waveform(idx, timestamp_us));
                    self.repeat_count = 0;
                }
            }
            self.change_count = 0;
        }

        if self.change_count >= MAX_CHANGES {
            self.change_count = 0;
            self.repeat_count = 0;
        }
        self.timings[self.change_count] = duration;
        self.change_count += 1;

        decoded
    }

    fn decode_waveform(&mut self, protocol_idx: usize, timestamp_us: u64) -> Option<SignalEvent> {
        let proto = PROTOCOLS[protocol_idx];
        let delay = self.timings[0] / u64::from(proto.sync_low);
        let tolerance = delay * TOLERANCE_PERCENT / 100;
        let matches =
            |timing: u64, factor: u32| timing.abs_diff(delay * u64::from(factor)) < tolerance;

        let mut code: u64 = 0;
        let mut i = 1;
        while i + 1 < self.change_count {
            let (high, low) = (self.timings[i], self.timings[i + 1]);
            if matches(high, proto.zero_high) && matches(low, proto.zero_low) {
                code <<= 1;
            } else if matches(high, proto.one_high) && matches(low, proto.one_low) {
                code = (code << 1) | 1;
            } else {
                return None;
            }
            i += 2;
        }

        if self.change_count > 6 && code != 0 {
            self.decoded += 1;
            let event = SignalEvent {
                code: AlertCode(code),
                pulse_length: u32::try_from(delay).unwrap_or(u32::MAX),
                protocol: protocol_idx as u8 + 1,
                bit_length: (self.change_count / 2) as u32,
                timestamp: SignalStamp(timestamp_us),
                sequence: self.decoded,
            };
            self.last = Some(event);
            return Some(event);
        }
        None
    }
}

/// Edge timestamps (µs) an rc-switch transmitter would produce for `code`.
///
/// Starts with the sync pulse and repeats the frame `repeats` times, the
/// way remote controls do. Used by tests and the simulated receiver.
pub fn encode_frames(
    code: u64,
    bits: u32,
    protocol: Protocol,
    repeats: usize,
    start_us: u64,
) -> Vec<u64> {
    let pulse = u64::from(protocol.pulse_length);
    let mut edges = Vec::new();
    let mut t = start_us;
    let mut push = |t: &mut u64, high: u32, low: u32| {
        edges.push(*t);
        *t += pulse * u64::from(high);
        edges.push(*t);
        *t += pulse * u64::from(low);
    };

    for _ in 0..repeats {
        push(&mut t, protocol.sync_high, protocol.sync_low);
        for bit in (0..bits).rev() {
            if code >> bit & 1 == 1 {
                push(&mut t, protocol.one_high, protocol.one_low);
            } else {
                push(&mut t, protocol.zero_high, protocol.zero_low);
            }
        }
    }
    push(&mut t, protocol.sync_high, protocol.sync_low);
    edges.push(t);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(decoder: &mut PulseDecoder, edges: &[u64]) -> Vec<SignalEvent> {
        edges.iter().filter_map(|t| decoder.on_edge(*t)).collect()
    }

    #[test]
    fn protocol_table_maps_high_low_pairs() {
        let proto = PROTOCOLS[2];
        assert_eq!(proto.pulse_length, 100);
        assert_eq!((proto.sync_high, proto.sync_low), (30, 71));
        assert_eq!((proto.zero_high, proto.zero_low), (4, 11));
        assert_eq!((proto.one_high, proto.one_low), (9, 6));
        assert_eq!(PROTOCOLS[5].zero_low, 5);
    }

    #[test]
    fn decodes_protocol_one() {
        let mut decoder = PulseDecoder::new();
        let edges = encode_frames(5_393, 24, PROTOCOLS[0], 4, 1_000_000);
        let frames = feed(&mut decoder, &edges);

        assert!(!frames.is_empty());
        let frame = frames[0];
        assert_eq!(frame.code, AlertCode(5_393));
        assert_eq!(frame.protocol, 1);
        assert_eq!(frame.bit_length, 24);
        assert!(frame.pulse_length.abs_diff(350) < 20);
        assert_eq!(decoder.latest(), frames.last().copied());
    }

    #[test]
    fn decodes_protocol_two() {
        let mut decoder = PulseDecoder::new();
        let edges = encode_frames(0b1011_0110, 8, PROTOCOLS[1], 4, 0);
        let frames = feed(&mut decoder, &edges);
        assert_eq!(frames.first().map(|f| f.code), Some(AlertCode(0b1011_0110)));
    }

    #[test]
    fn sequence_and_stamp_advance_per_frame() {
        let mut decoder = PulseDecoder::new();
        let edges = encode_frames(42, 24, PROTOCOLS[0], 6, 0);
        let frames = feed(&mut decoder, &edges);

        assert!(frames.len() >= 2);
        assert_eq!(frames[0].sequence, 1);
        assert_eq!(frames[1].sequence, 2);
        assert_ne!(frames[0].timestamp, frames[1].timestamp);
        assert_eq!(decoder.decoded(), frames.len() as u64);
    }

    #[test]
    fn noise_decodes_nothing() {
        let mut decoder = PulseDecoder::new();
        let mut t = 0;
        for i in 0..500u64 {
            t += 100 + (i * 37) % 900;
            decoder.on_edge(t);
        }
        assert!(decoder.latest().is_none());
    }

    #[test]
    fn single_frame_is_not_enough() {
        let mut decoder = PulseDecoder::new();
        let edges = encode_frames(42, 24, PROTOCOLS[0], 1, 0);
        assert!(feed(&mut decoder, &edges).is_empty());
    }
}
