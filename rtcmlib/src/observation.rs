//! Legacy (non-MSM) GPS and GLONASS observation messages: 1001-1004 and
//! 1009-1012.

use crate::bitreader::BitReader;
use crate::constants::{glo_wavelength_l1, glo_wavelength_l2, unified_prn_glonass, GPS_WAVELENGTH_L1, GPS_WAVELENGTH_L2};
use crate::epoch::{Band, DataFlags2, Entry, Gnssdata, Quantity};
use crate::error::DecodeError;
use crate::lock::LockTables;
use crate::time::update_time;

const AMBIGUITY_UNIT: f64 = 299_792.458;
const GLO_AMBIGUITY_UNIT: f64 = 599_584.916;

/// Result of decoding one legacy observation message.
pub struct LegacyObsResult {
    /// `false` when an L1 integer ambiguity was missing for at least one
    /// satellite, meaning the delivered ranges are only valid modulo the
    /// ambiguity unit.
    pub valid: bool,
    /// Set once the epoch held by `epoch` is complete and should be handed
    /// to the caller (the header's sync flag was clear, or the timestamp
    /// just changed from a still-open previous epoch).
    pub epoch_ready: bool,
}

fn code_entry(band: Band, q: Quantity) -> Entry {
    Entry::new(band, q)
}

/// Decodes message types 1001-1004 into `epoch`, which accumulates
/// satellites across possibly-several messages sharing an epoch timestamp.
/// `current_week` is the parser's running GPS week (updated here on
/// rollover); the caller is expected to keep it across calls.
pub fn decode_gps_legacy(
    payload: &[u8],
    msg_type: u16,
    epoch: &mut Gnssdata,
    current_week: &mut i32,
    current_tow_ms: &mut i64,
    locks: &mut LockTables,
) -> Result<LegacyObsResult, DecodeError> {
    let mut r = BitReader::new(payload);
    r.skip(12)?;
    r.skip(12)?; // station id
    let tow_ms = r.get_bits(30)? as i64;
    let sync = r.get_bits(1)? != 0;
    let numsats = r.get_bits(5)? as usize;
    r.skip(4)?; // smoothing/divisor, not modeled

    if tow_ms / 1000 < *current_tow_ms / 1000 - 86400 {
        *current_week += 1;
    }
    if epoch.week != 0 && (epoch.timeofweek_ms != tow_ms || epoch.week != *current_week) {
        // a new epoch has started before the previous one's sync flag
        // cleared; nothing further to do here besides letting the caller
        // see the previous epoch as ready and start a fresh one.
    }
    *current_tow_ms = tow_ms;
    epoch.week = *current_week;
    epoch.timeofweek_ms = tow_ms;

    let has_cnr2 = msg_type == 1004;
    let has_ambiguity = msg_type == 1002 || msg_type == 1004;

    let mut was_ambiguous = false;
    for _ in 0..numsats {
        let raw_prn = r.get_bits(6)? as u16;
        let prn = if raw_prn < 40 { raw_prn } else { raw_prn + 80 };
        let code_is_p = r.get_bits(1)? != 0;
        let l1_pseudorange_raw = r.get_bits(24)? as f64 * 0.02;
        let l1_phase_raw = r.get_bits_signed(20)?;
        let lock1 = r.get_bits(7)? as u8;

        let sat = epoch.satellite_mut(prn);
        let band_l1 = if code_is_p { Band::P1 } else { Band::L1 };
        let (code_entry_l1, phase_entry_l1) = (code_entry(band_l1, Quantity::Code), code_entry(band_l1, Quantity::Phase));
        let mut code1 = l1_pseudorange_raw;
        let mut phase1 = if l1_phase_raw & 0xFFFFF == -0x80000 {
            None
        } else {
            Some((l1_phase_raw as f64 * 0.0005) + l1_pseudorange_raw)
        };

        let mut ambiguity_m = 0.0;
        if has_ambiguity {
            let amb = r.get_bits(8)? as f64;
            if amb != 0.0 {
                ambiguity_m = amb * AMBIGUITY_UNIT;
            } else {
                was_ambiguous = true;
            }
        } else {
            was_ambiguous = true;
        }
        code1 += ambiguity_m;
        if let Some(p) = phase1.as_mut() {
            *p += ambiguity_m;
        }

        if has_ambiguity {
            let cnr_raw = r.get_bits(8)?;
            let snr = (cnr_raw / 16).clamp(1, 9) as u8;
            sat.snr_l1 = snr;
            sat.set(code_entry(band_l1, Quantity::Snr), snr as f64);
        }

        if let Some(p) = phase1 {
            sat.set(code_entry_l1, code1);
            sat.set(phase_entry_l1, p / GPS_WAVELENGTH_L1);
        }
        if locks.update_gps_l1(prn, lock1) {
            sat.dataflags2 |= DataFlags2::LOCKLOSS_L1;
        }

        if msg_type == 1003 || msg_type == 1004 {
            let l2_code = r.get_bits(2)? as u8;
            if l2_code >= 2 {
                sat.dataflags2 |= DataFlags2::XCORR_L2;
            }
            let l2_diff_raw = r.get_bits_signed(14)?;
            let l2_phase_diff_raw = r.get_bits_signed(20)?;
            let lock2 = r.get_bits(7)? as u8;

            let l2_pseudorange = if l2_diff_raw == -0x2000 { None } else { Some(code1 - ambiguity_m + l2_diff_raw as f64 * 0.02) };
            let l2_phase = if l2_phase_diff_raw & 0xFFFFF == -0x80000 {
                None
            } else {
                Some((l2_phase_diff_raw as f64 * 0.0005) + (l2_pseudorange.unwrap_or(code1 - ambiguity_m)) + ambiguity_m)
            };

            if has_cnr2 {
                let cnr2_raw = r.get_bits(8)?;
                let snr2 = (cnr2_raw / 16).clamp(1, 9) as u8;
                sat.snr_l2 = snr2;
                sat.set(code_entry(Band::P2, Quantity::Snr), snr2 as f64);
            }
            if let Some(pr2) = l2_pseudorange {
                sat.set(code_entry(Band::P2, Quantity::Code), pr2 + ambiguity_m);
            }
            if let Some(ph2) = l2_phase {
                sat.set(code_entry(Band::P2, Quantity::Phase), ph2 / GPS_WAVELENGTH_L2);
            }
            if locks.update_gps_l2(prn, lock2) {
                sat.dataflags2 |= DataFlags2::LOCKLOSS_L2;
            }
        }
    }

    Ok(LegacyObsResult { valid: !was_ambiguous, epoch_ready: !sync })
}

/// Decodes message types 1009-1012.
pub fn decode_glonass_legacy(
    payload: &[u8],
    msg_type: u16,
    epoch: &mut Gnssdata,
    current_week: &mut i32,
    current_tow_ms: &mut i64,
    glo_freq: &mut [i32; 24],
    locks: &mut LockTables,
) -> Result<LegacyObsResult, DecodeError> {
    let mut r = BitReader::new(payload);
    r.skip(12)?;
    r.skip(12)?; // station id
    let tk = r.get_bits(27)? as i32;
    let sync = r.get_bits(1)? != 0;
    let numsats = r.get_bits(5)? as usize;
    r.skip(4)?;

    let mut week = *current_week;
    let mut sow = (*current_tow_ms / 1000) as i32;
    update_time(&mut week, &mut sow, tk, false);
    *current_week = week;
    *current_tow_ms = sow as i64 * 1000;
    epoch.week = week;
    epoch.timeofweek_ms = *current_tow_ms;

    let has_ambiguity = msg_type == 1010 || msg_type == 1012;
    let has_cnr2 = msg_type == 1012;

    let mut was_ambiguous = false;
    let mut remaining = numsats;
    while remaining > 0 {
        remaining -= 1;
        let raw_slot = r.get_bits(6)? as u16;
        if raw_slot == 0 || raw_slot > 24 {
            // illegal slot number: this satellite's data is still on the
            // wire and must still be consumed to stay aligned, but it is
            // not added to the epoch.
        }
        let prn = unified_prn_glonass(raw_slot.max(1).min(24));
        let freq_raw = r.get_bits(5)? as i32;
        let channel = freq_raw - 7;
        if (1..=24).contains(&raw_slot) {
            glo_freq[(raw_slot - 1) as usize] = channel;
        }
        let code_is_p = r.get_bits(1)? != 0;
        let l1_pseudorange_raw = r.get_bits(25)? as f64 * 0.02;
        let l1_phase_raw = r.get_bits_signed(20)?;
        let lock1 = r.get_bits(7)? as u8;

        let mut ambiguity_m = 0.0;
        if has_ambiguity {
            let amb = r.get_bits(7)? as f64;
            if amb != 0.0 {
                ambiguity_m = amb * GLO_AMBIGUITY_UNIT;
            } else {
                was_ambiguous = true;
            }
        } else {
            was_ambiguous = true;
        }

        let mut snr1: Option<u8> = None;
        if has_ambiguity {
            let cnr_raw = r.get_bits(8)?;
            snr1 = Some((cnr_raw / 16).clamp(1, 9) as u8);
        }

        let (l2_code, l2_diff_raw, l2_phase_diff_raw, lock2, cnr2_raw) = if msg_type == 1011 || msg_type == 1012 {
            let l2_code = r.get_bits(2)? as u8;
            let l2_diff_raw = r.get_bits_signed(14)?;
            let l2_phase_diff_raw = r.get_bits_signed(20)?;
            let lock2 = r.get_bits(7)? as u8;
            let cnr2 = if has_cnr2 { Some(r.get_bits(8)?) } else { None };
            (Some(l2_code), Some(l2_diff_raw), Some(l2_phase_diff_raw), Some(lock2), cnr2)
        } else {
            (None, None, None, None, None)
        };

        if raw_slot == 0 || raw_slot > 24 {
            continue;
        }

        let wl1 = glo_wavelength_l1(channel);
        let wl2 = glo_wavelength_l2(channel);
        let sat = epoch.satellite_mut(prn);
        let code1 = l1_pseudorange_raw + ambiguity_m;
        let phase1 = if l1_phase_raw & 0xFFFFF == -0x80000 {
            None
        } else {
            Some((l1_phase_raw as f64 * 0.0005 + l1_pseudorange_raw + ambiguity_m) / wl1)
        };
        let band_l1 = if code_is_p { Band::P1 } else { Band::L1 };
        let code_entry_l1 = code_entry(band_l1, Quantity::Code);
        let phase_entry_l1 = code_entry(band_l1, Quantity::Phase);
        if let Some(p) = phase1 {
            sat.set(code_entry_l1, code1);
            sat.set(phase_entry_l1, p);
        }
        if let Some(s) = snr1 {
            sat.snr_l1 = s;
            sat.set(code_entry(band_l1, Quantity::Snr), s as f64);
        }
        if locks.update_glo_l1(prn, lock1) {
            sat.dataflags2 |= DataFlags2::LOCKLOSS_L1;
        }

        if let (Some(l2c), Some(l2d), Some(l2p), Some(lock2)) = (l2_code, l2_diff_raw, l2_phase_diff_raw, lock2) {
            if l2c >= 2 {
                sat.dataflags2 |= DataFlags2::XCORR_L2;
            }
            if l2d != -0x2000 {
                let pr2 = code1 + l2d as f64 * 0.02;
                sat.set(code_entry(Band::P2, Quantity::Code), pr2);
            }
            if l2p & 0xFFFFF != -0x80000 {
                let ph2 = (l2p as f64 * 0.0005 + l1_pseudorange_raw + ambiguity_m) / wl2;
                sat.set(code_entry(Band::P2, Quantity::Phase), ph2);
            }
            if let Some(c2) = cnr2_raw {
                let snr2 = (c2 / 16).clamp(1, 9) as u8;
                sat.snr_l2 = snr2;
                sat.set(code_entry(Band::P2, Quantity::Snr), snr2 as f64);
            }
            if locks.update_glo_l2(prn, lock2) {
                sat.dataflags2 |= DataFlags2::LOCKLOSS_L2;
            }
        }
    }

    Ok(LegacyObsResult { valid: !was_ambiguous, epoch_ready: !sync })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
        let mut bits = bits.to_vec();
        while bits.len() % 8 != 0 {
            bits.push(false);
        }
        bits.chunks(8).map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8)).collect()
    }

    fn push(bits: &mut Vec<bool>, value: i64, width: u32) {
        for i in (0..width).rev() {
            bits.push((value >> i) & 1 != 0);
        }
    }

    #[test]
    fn decodes_single_satellite_1001() {
        let mut bits = Vec::new();
        push(&mut bits, 1001, 12);
        push(&mut bits, 0, 12); // station id
        push(&mut bits, 123_000, 30); // tow ms
        push(&mut bits, 0, 1); // sync
        push(&mut bits, 1, 5); // numsats
        push(&mut bits, 0, 4); // smoothing
        push(&mut bits, 5, 6); // prn
        push(&mut bits, 0, 1); // code flag (C/A)
        push(&mut bits, 1000, 24); // pseudorange raw
        push(&mut bits, 0, 20); // phase diff (treated as no-data sentinel avoidance: 0 is valid, not the sentinel)
        push(&mut bits, 10, 7); // lock
        let payload = bits_to_bytes(&bits);

        let mut epoch = Gnssdata::new(0, 0);
        let mut week = 2000;
        let mut tow_ms = 0i64;
        let mut locks = LockTables::new();
        let result = decode_gps_legacy(&payload, 1001, &mut epoch, &mut week, &mut tow_ms, &mut locks).unwrap();
        assert!(result.epoch_ready);
        assert_eq!(epoch.numsats(), 1);
        assert_eq!(epoch.satellites[0].prn, 5);
        let code = epoch.satellites[0].get(Entry::new(Band::L1, Quantity::Code)).unwrap();
        assert!((code - 20.0).abs() < 1e-9);
    }
}
