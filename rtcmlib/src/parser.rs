//! Top-level parser state: feeds raw bytes in, hands frames and completed
//! epochs/ephemerides back out.

use log::{debug, trace};

use crate::ephemeris::{decode_galileo_ephemeris, decode_glonass_ephemeris, decode_gps_ephemeris, GalileoEphemeris, GlonassEphemeris, GpsEphemeris};
use crate::epoch::Gnssdata;
use crate::frame::{FrameBuffer, FrameOutcome};
use crate::lock::LockTables;
use crate::msm::decode_msm;
use crate::observation::{decode_glonass_legacy, decode_gps_legacy};

/// Outcome of one `parse_next_frame` call.
pub enum FrameResult {
    EphemerisGps(GpsEphemeris),
    EphemerisGlonass(GlonassEphemeris),
    EphemerisGalileo(GalileoEphemeris),
    /// A full epoch was assembled. `valid` is `false` when at least one
    /// satellite's ranges are only valid modulo the ambiguity unit (missing
    /// integer millisecond/ambiguity data).
    EpochReady { epoch: Gnssdata, valid: bool },
    /// A frame with a recognized RTCM message type this decoder does not
    /// implement (e.g. antenna position, or a non-goal constellation).
    Unknown(u16),
    /// Not enough bytes buffered yet for a decision.
    Incomplete,
}

/// Owns all per-stream state: the byte-framing buffer, the running GPS
/// clock, lock-continuity tables, GLONASS frequency-channel assignments,
/// and the observation epoch currently being assembled.
pub struct ParserState {
    frames: FrameBuffer,
    week: i32,
    tow_ms: i64,
    glo_freq: [i32; 24],
    locks: LockTables,
    current_epoch: Option<Gnssdata>,
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserState {
    pub fn new() -> Self {
        ParserState {
            frames: FrameBuffer::new(),
            week: 0,
            tow_ms: 0,
            glo_freq: [0; 24],
            locks: LockTables::new(),
            current_epoch: None,
        }
    }

    pub fn feed_byte(&mut self, byte: u8) {
        self.frames.push_byte(byte);
    }

    /// Convenience wrapper over `feed_byte`/`parse_next_frame` for callers
    /// that have a whole buffer at once (the CLI, and tests that build
    /// synthetic streams).
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<FrameResult> {
        let mut out = Vec::new();
        for &b in bytes {
            self.feed_byte(b);
            loop {
                match self.parse_next_frame() {
                    FrameResult::Incomplete => break,
                    other => out.push(other),
                }
            }
        }
        out
    }

    pub fn parse_next_frame(&mut self) -> FrameResult {
        let (payload, message_type) = match self.frames.next_frame() {
            FrameOutcome::Frame { payload, message_type } => (payload, message_type),
            FrameOutcome::Incomplete => return FrameResult::Incomplete,
        };

        match message_type {
            1019 => match decode_gps_ephemeris(&payload) {
                Ok(eph) => {
                    // ephemeris carries its own week/TOE, which is often
                    // ahead of whatever the last observation message set;
                    // resync the running clock so a 1020 arriving right
                    // after isn't stamped with a stale GLONASS tk base.
                    let toe_ms = (eph.toe * 1000.0) as i64;
                    if eph.week > self.week || (eph.week == self.week && toe_ms > self.tow_ms) {
                        self.week = eph.week;
                        self.tow_ms = toe_ms;
                    }
                    FrameResult::EphemerisGps(eph)
                }
                Err(e) => {
                    debug!("dropping malformed 1019 frame: {e}");
                    FrameResult::Incomplete
                }
            },
            1020 => match decode_glonass_ephemeris(&payload, self.week, (self.tow_ms / 1000) as i32) {
                Ok(eph) => FrameResult::EphemerisGlonass(eph),
                Err(e) => {
                    debug!("dropping malformed 1020 frame: {e}");
                    FrameResult::Incomplete
                }
            },
            1045 => match decode_galileo_ephemeris(&payload) {
                Ok(eph) => FrameResult::EphemerisGalileo(eph),
                Err(e) => {
                    debug!("dropping malformed 1045 frame: {e}");
                    FrameResult::Incomplete
                }
            },
            1001..=1004 => self.handle_gps_legacy(&payload, message_type),
            1009..=1012 => self.handle_glonass_legacy(&payload, message_type),
            1071..=1077 | 1081..=1087 | 1091..=1097 => self.handle_msm(&payload, message_type),
            other => {
                trace!("unhandled message type {other}");
                FrameResult::Unknown(other)
            }
        }
    }

    fn take_or_start_epoch(&mut self) -> Gnssdata {
        self.current_epoch.take().unwrap_or_else(|| Gnssdata::new(self.week, self.tow_ms))
    }

    fn handle_gps_legacy(&mut self, payload: &[u8], message_type: u16) -> FrameResult {
        let mut epoch = self.take_or_start_epoch();
        let result = decode_gps_legacy(payload, message_type, &mut epoch, &mut self.week, &mut self.tow_ms, &mut self.locks);
        match result {
            Ok(r) => {
                if r.epoch_ready {
                    FrameResult::EpochReady { epoch, valid: r.valid }
                } else {
                    self.current_epoch = Some(epoch);
                    FrameResult::Incomplete
                }
            }
            Err(e) => {
                debug!("dropping malformed {message_type} frame: {e}");
                self.current_epoch = Some(epoch);
                FrameResult::Incomplete
            }
        }
    }

    fn handle_glonass_legacy(&mut self, payload: &[u8], message_type: u16) -> FrameResult {
        let mut epoch = self.take_or_start_epoch();
        let result = decode_glonass_legacy(payload, message_type, &mut epoch, &mut self.week, &mut self.tow_ms, &mut self.glo_freq, &mut self.locks);
        match result {
            Ok(r) => {
                if r.epoch_ready {
                    FrameResult::EpochReady { epoch, valid: r.valid }
                } else {
                    self.current_epoch = Some(epoch);
                    FrameResult::Incomplete
                }
            }
            Err(e) => {
                debug!("dropping malformed {message_type} frame: {e}");
                self.current_epoch = Some(epoch);
                FrameResult::Incomplete
            }
        }
    }

    fn handle_msm(&mut self, payload: &[u8], message_type: u16) -> FrameResult {
        let mut epoch = self.take_or_start_epoch();
        let result = decode_msm(payload, message_type, &mut epoch, &mut self.week, &mut self.tow_ms, &mut self.glo_freq, &mut self.locks);
        match result {
            Ok(r) => {
                if r.epoch_ready {
                    FrameResult::EpochReady { epoch, valid: r.valid }
                } else {
                    self.current_epoch = Some(epoch);
                    FrameResult::Incomplete
                }
            }
            Err(e) => {
                debug!("dropping malformed {message_type} frame: {e}");
                self.current_epoch = Some(epoch);
                FrameResult::Incomplete
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_type_is_reported() {
        // build a minimal valid frame carrying message type 1005 (antenna
        // position), which this decoder doesn't implement.
        let mut payload = vec![0u8; 20];
        payload[0] = (1005u16 >> 4) as u8;
        payload[1] = ((1005u16 & 0xF) << 4) as u8;
        let mut frame = vec![0xD3u8, ((payload.len() >> 8) & 0x03) as u8, (payload.len() & 0xFF) as u8];
        frame.extend_from_slice(&payload);
        let crc = crate::crc24q::crc24q(&frame);
        frame.push((crc >> 16) as u8);
        frame.push((crc >> 8) as u8);
        frame.push(crc as u8);

        let mut parser = ParserState::new();
        let results = parser.feed_bytes(&frame);
        assert!(results.iter().any(|r| matches!(r, FrameResult::Unknown(1005))));
    }
}
