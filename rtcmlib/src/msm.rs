//! Multiple Signal Message decoder (RTCM 1071-1097), covering GPS, GLONASS
//! and Galileo MSM1 through MSM7.
//!
//! Cell addressing is done with two independent bit-mask walks (satellite
//! mask, then signal mask) instead of the original's single reverse
//! bit-scan with two interleaved counters: the cell mask is read once,
//! satellites and signals are each read out of their own mask in message
//! order, and the cell at row-major position `(sat_index, sig_index)` maps
//! directly onto `satellites[sat_index]` / `signals[sig_index]`.

use crate::bitreader::BitReader;
use crate::constants::{
    unified_prn_galileo_msm, unified_prn_glonass_msm, unified_prn_gps, GAL_WAVELENGTH_E1,
    GAL_WAVELENGTH_E5A, GAL_WAVELENGTH_E5AB, GAL_WAVELENGTH_E5B, GAL_WAVELENGTH_E6,
    GPS_WAVELENGTH_L1, GPS_WAVELENGTH_L2, GPS_WAVELENGTH_L5,
};
use crate::epoch::{Band, DataFlags2, Entry, Gnssdata, Quantity};
use crate::error::DecodeError;
use crate::lock::LockTables;
use crate::time::update_time;

#[derive(Debug, Clone, Copy)]
enum Constellation {
    Gps,
    Glonass,
    Galileo,
}

fn constellation_for(msg_type: u16) -> Constellation {
    if msg_type >= 1091 {
        Constellation::Galileo
    } else if msg_type >= 1081 {
        Constellation::Glonass
    } else {
        Constellation::Gps
    }
}

#[derive(Debug, Clone, Copy)]
struct SignalMapping {
    band: Band,
    lockloss: DataFlags2,
    wavelength: Wavelength,
}

#[derive(Debug, Clone, Copy)]
enum Wavelength {
    Fixed(f64),
    GlonassL1,
    GlonassL2,
}

const fn m(band: Band, lockloss: DataFlags2, wl: Wavelength) -> Option<SignalMapping> {
    Some(SignalMapping { band, lockloss, wavelength: wl })
}

// Index 0 is unused (RTCM signal ids are 1-based); indices beyond the last
// populated entry are simply never reached since sig_mask never sets them
// for a conforming transmitter.
static GPS_SIGNALS: [Option<SignalMapping>; 32] = {
    let mut t = [None; 32];
    t[1] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GPS_WAVELENGTH_L1));
    t[2] = m(Band::P1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GPS_WAVELENGTH_L1));
    t[3] = m(Band::P1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GPS_WAVELENGTH_L1));
    t[4] = m(Band::P1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GPS_WAVELENGTH_L1));
    t[7] = m(Band::L2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[8] = m(Band::P2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[9] = m(Band::P2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[10] = m(Band::P2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[14] = m(Band::L2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[15] = m(Band::L2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[16] = m(Band::L2, DataFlags2::LOCKLOSS_L2, Wavelength::Fixed(GPS_WAVELENGTH_L2));
    t[21] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GPS_WAVELENGTH_L5));
    t[22] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GPS_WAVELENGTH_L5));
    t[23] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GPS_WAVELENGTH_L5));
    t
};

static GLO_SIGNALS: [Option<SignalMapping>; 32] = {
    let mut t = [None; 32];
    t[1] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::GlonassL1);
    t[2] = m(Band::P1, DataFlags2::LOCKLOSS_L1, Wavelength::GlonassL1);
    t[7] = m(Band::L2, DataFlags2::LOCKLOSS_L2, Wavelength::GlonassL2);
    t[8] = m(Band::P2, DataFlags2::LOCKLOSS_L2, Wavelength::GlonassL2);
    t
};

static GAL_SIGNALS: [Option<SignalMapping>; 32] = {
    let mut t = [None; 32];
    t[1] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GAL_WAVELENGTH_E1));
    t[2] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GAL_WAVELENGTH_E1));
    t[3] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GAL_WAVELENGTH_E1));
    t[4] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GAL_WAVELENGTH_E1));
    t[5] = m(Band::L1, DataFlags2::LOCKLOSS_L1, Wavelength::Fixed(GAL_WAVELENGTH_E1));
    t[7] = m(Band::L6, DataFlags2::LOCKLOSS_E6, Wavelength::Fixed(GAL_WAVELENGTH_E6));
    t[8] = m(Band::L6, DataFlags2::LOCKLOSS_E6, Wavelength::Fixed(GAL_WAVELENGTH_E6));
    t[9] = m(Band::L6, DataFlags2::LOCKLOSS_E6, Wavelength::Fixed(GAL_WAVELENGTH_E6));
    t[10] = m(Band::L6, DataFlags2::LOCKLOSS_E6, Wavelength::Fixed(GAL_WAVELENGTH_E6));
    t[11] = m(Band::L6, DataFlags2::LOCKLOSS_E6, Wavelength::Fixed(GAL_WAVELENGTH_E6));
    t[13] = m(Band::L5b, DataFlags2::LOCKLOSS_E5B, Wavelength::Fixed(GAL_WAVELENGTH_E5B));
    t[14] = m(Band::L5b, DataFlags2::LOCKLOSS_E5B, Wavelength::Fixed(GAL_WAVELENGTH_E5B));
    t[15] = m(Band::L5b, DataFlags2::LOCKLOSS_E5B, Wavelength::Fixed(GAL_WAVELENGTH_E5B));
    t[17] = m(Band::L5ab, DataFlags2::LOCKLOSS_E5AB, Wavelength::Fixed(GAL_WAVELENGTH_E5AB));
    t[18] = m(Band::L5ab, DataFlags2::LOCKLOSS_E5AB, Wavelength::Fixed(GAL_WAVELENGTH_E5AB));
    t[19] = m(Band::L5ab, DataFlags2::LOCKLOSS_E5AB, Wavelength::Fixed(GAL_WAVELENGTH_E5AB));
    t[21] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GAL_WAVELENGTH_E5A));
    t[22] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GAL_WAVELENGTH_E5A));
    t[23] = m(Band::L5, DataFlags2::LOCKLOSS_L5, Wavelength::Fixed(GAL_WAVELENGTH_E5A));
    t
};

/// Result of one MSM message decode.
pub struct MsmResult {
    /// `false` when at least one satellite in this message had no integer
    /// millisecond rough-range component (MSM1-3), meaning the ranges that
    /// follow are only valid modulo the ambiguity unit.
    pub valid: bool,
    pub epoch_ready: bool,
}

fn set_bit_positions(mask: u64, width: u32) -> Vec<u16> {
    (0..width).filter(|&i| mask & (1u64 << (width - 1 - i)) != 0).map(|i| i as u16 + 1).collect()
}

pub fn decode_msm(
    payload: &[u8],
    msg_type: u16,
    epoch: &mut Gnssdata,
    current_week: &mut i32,
    current_tow_ms: &mut i64,
    glo_freq: &mut [i32; 24],
    locks: &mut LockTables,
) -> Result<MsmResult, DecodeError> {
    let subtype = msg_type % 10;
    let constellation = constellation_for(msg_type);
    let mut r = BitReader::new(payload);
    r.skip(12)?;
    r.skip(12)?; // station id

    let (tow_ms, is_glonass) = match constellation {
        Constellation::Glonass => {
            r.skip(3)?; // day of week
            let tk = r.get_bits(27)? as i32;
            let mut week = *current_week;
            let mut sow = (*current_tow_ms / 1000) as i32;
            update_time(&mut week, &mut sow, tk, false);
            *current_week = week;
            (sow as i64 * 1000, true)
        }
        _ => (r.get_bits(30)? as i64, false),
    };
    let _ = is_glonass;
    let sync = r.get_bits(1)? != 0;
    if subtype == 6 || subtype == 7 {
        r.skip(3)?;
    }

    *current_tow_ms = tow_ms;
    epoch.week = *current_week;
    epoch.timeofweek_ms = tow_ms;

    let sat_mask = r.get_bits(64)?;
    let sig_mask = r.get_bits(32)?;
    let sat_ids = set_bit_positions(sat_mask, 64);
    let sig_ids = set_bit_positions(sig_mask, 32);
    let num_cells = sat_ids.len() * sig_ids.len();
    let cell_mask = r.get_bits(num_cells as u32)?;

    let mut rough_int = vec![0i32; sat_ids.len()];
    let mut rough_mod = vec![0f64; sat_ids.len()];
    let mut rough_dop = vec![0f64; sat_ids.len()];
    for (i, _) in sat_ids.iter().enumerate() {
        match subtype {
            1 | 2 | 3 => {
                rough_mod[i] = r.get_float(10, 1.0 / 1024.0)?;
            }
            4 | 6 => {
                rough_int[i] = r.get_bits(8)? as i32;
                rough_mod[i] = r.get_float(10, 1.0 / 1024.0)?;
            }
            5 | 7 => {
                rough_int[i] = r.get_bits(8)? as i32;
                rough_mod[i] = r.get_float(10, 1.0 / 1024.0)?;
                rough_dop[i] = r.get_float_signed(14, 1.0)?;
            }
            _ => {}
        }
    }

    let mut cells: Vec<(usize, usize)> = Vec::with_capacity(num_cells);
    for p in 0..num_cells {
        if cell_mask & (1u64 << (num_cells - 1 - p)) != 0 {
            cells.push((p / sig_ids.len(), p % sig_ids.len()));
        }
    }

    let mut has_no_ambiguity = false;
    for &(sat_idx, sig_idx) in &cells {
        let raw_sat = sat_ids[sat_idx];
        let raw_sig = sig_ids[sig_idx];
        let mapping = match constellation {
            Constellation::Gps => GPS_SIGNALS[raw_sig as usize],
            Constellation::Glonass => GLO_SIGNALS[raw_sig as usize],
            Constellation::Galileo => GAL_SIGNALS[raw_sig as usize],
        };

        match subtype {
            1 => {
                let psr = r.get_float_signed(15, 0.02)?;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), None, None, None, None, &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            2 => {
                let cp = r.get_bits_signed(20)? as f64 / 256.0;
                let lock = r.get_bits(4)? as u16;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, None, Some(cp), Some(lock), None, None, &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            3 => {
                let psr = r.get_float_signed(15, 0.02)?;
                let cp = r.get_bits_signed(20)? as f64 / 256.0;
                let lock = r.get_bits(4)? as u16;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), Some(cp), Some(lock), None, None, &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            4 => {
                let psr = r.get_float_signed(15, 0.02)?;
                let cp = r.get_bits_signed(20)? as f64 / 256.0;
                let lock = r.get_bits(4)? as u16;
                let cnr = r.get_bits(6)? as f64;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), Some(cp), Some(lock), Some(cnr), None, &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            5 => {
                let psr = r.get_float_signed(15, 0.02)?;
                let cp = r.get_bits_signed(20)? as f64 / 256.0;
                let lock = r.get_bits(4)? as u16;
                let cnr = r.get_float(6, 1.0)?;
                let dop = r.get_float_signed(15, 0.0001)?;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), Some(cp), Some(lock), Some(cnr), Some(dop), &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            6 => {
                let psr = r.get_float_signed(20, 0.001)?;
                let cp = r.get_bits_signed(24)? as f64 / 1024.0;
                let lock = r.get_bits(10)? as u16;
                let cnr = r.get_float(10, 0.1)?;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), Some(cp), Some(lock), Some(cnr), None, &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            7 => {
                let psr = r.get_float_signed(20, 0.001)?;
                let cp = r.get_bits_signed(24)? as f64 / 1024.0;
                let lock = r.get_bits(10)? as u16;
                let cnr = r.get_float(10, 0.1)?;
                let dop = r.get_float_signed(15, 0.0001)?;
                record_cell(epoch, locks, constellation, glo_freq, raw_sat, raw_sig, mapping, Some(psr), Some(cp), Some(lock), Some(cnr), Some(dop), &mut has_no_ambiguity, &rough_int, &rough_mod, &rough_dop, sat_idx, subtype);
            }
            _ => {}
        }
    }

    Ok(MsmResult { valid: !has_no_ambiguity, epoch_ready: !sync })
}

#[allow(clippy::too_many_arguments)]
fn record_cell(
    epoch: &mut Gnssdata,
    locks: &mut LockTables,
    constellation: Constellation,
    glo_freq: &mut [i32; 24],
    raw_sat: u16,
    raw_sig: u16,
    mapping: Option<SignalMapping>,
    fine_psr: Option<f64>,
    fine_cp: Option<f64>,
    lock: Option<u16>,
    cnr: Option<f64>,
    dop: Option<f64>,
    has_no_ambiguity: &mut bool,
    rough_int: &[i32],
    rough_mod: &[f64],
    rough_dop: &[f64],
    sat_idx: usize,
    subtype: u16,
) {
    let Some(mapping) = mapping else { return };

    let channel = if let Constellation::Glonass = constellation {
        glo_freq[(raw_sat as usize).saturating_sub(1).min(23)]
    } else {
        0
    };
    let wavelength = match mapping.wavelength {
        Wavelength::Fixed(wl) => wl,
        Wavelength::GlonassL1 => crate::constants::glo_wavelength_l1(channel),
        Wavelength::GlonassL2 => crate::constants::glo_wavelength_l2(channel),
    };
    if wavelength <= 0.0 {
        return;
    }

    let prn = match constellation {
        Constellation::Gps => unified_prn_gps(raw_sat),
        Constellation::Glonass => unified_prn_glonass_msm(raw_sat),
        Constellation::Galileo => unified_prn_galileo_msm(raw_sat),
    };

    if matches!(subtype, 1 | 2 | 3) {
        *has_no_ambiguity = true;
    }

    let rough_range_ms = rough_int.get(sat_idx).copied().unwrap_or(0) as f64 + rough_mod.get(sat_idx).copied().unwrap_or(0.0);
    let rough_range_m = rough_range_ms * crate::constants::SPEED_OF_LIGHT / 1000.0;

    let sat = epoch.satellite_mut(prn);
    let psr_sentinel = if subtype >= 6 { -524.288 } else { -327.68 };
    let cp_sentinel = if subtype >= 6 { -2055.0 } else { -2048.0 };

    if let Some(psr) = fine_psr {
        if psr > psr_sentinel {
            sat.set(Entry::new(mapping.band, Quantity::Code), rough_range_m + psr);
        }
    }
    if let Some(cp) = fine_cp {
        if cp > cp_sentinel {
            sat.set(Entry::new(mapping.band, Quantity::Phase), (rough_range_m + cp) / wavelength);
        }
    }
    if let Some(cnr) = cnr {
        sat.set(Entry::new(mapping.band, Quantity::Snr), cnr);
    }
    if let Some(dop) = dop {
        let rough_dop = rough_dop.get(sat_idx).copied().unwrap_or(0.0);
        sat.set(Entry::new(mapping.band, Quantity::Doppler), rough_dop + dop);
    }
    if let Some(lock) = lock {
        if locks.update_msm(prn, raw_sig as u8, lock) {
            sat.dataflags2 |= mapping.lockloss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_bit_positions_reads_msb_first() {
        // width 4, bits 1011 -> positions 1,3,4 set (MSB first)
        let positions = set_bit_positions(0b1011, 4);
        assert_eq!(positions, vec![1, 3, 4]);
    }
}
