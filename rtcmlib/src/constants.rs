//! Physical constants, carrier frequencies and unified PRN ranges.

use std::ops::RangeInclusive;

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

pub const GPS_FREQ_L1: f64 = 1_575_420_000.0;
pub const GPS_FREQ_L2: f64 = 1_227_600_000.0;
pub const GPS_FREQ_L5: f64 = 1_176_450_000.0;
pub const GPS_WAVELENGTH_L1: f64 = SPEED_OF_LIGHT / GPS_FREQ_L1;
pub const GPS_WAVELENGTH_L2: f64 = SPEED_OF_LIGHT / GPS_FREQ_L2;
pub const GPS_WAVELENGTH_L5: f64 = SPEED_OF_LIGHT / GPS_FREQ_L5;

pub const GLO_FREQ_L1_BASE: f64 = 1_602_000_000.0;
pub const GLO_FREQ_L1_STEP: f64 = 562_500.0;
pub const GLO_FREQ_L2_BASE: f64 = 1_246_000_000.0;
pub const GLO_FREQ_L2_STEP: f64 = 437_500.0;

/// GLONASS L1 wavelength for frequency channel `k` (typically -7..=6).
pub fn glo_wavelength_l1(k: i32) -> f64 {
    SPEED_OF_LIGHT / (GLO_FREQ_L1_BASE + k as f64 * GLO_FREQ_L1_STEP)
}

/// GLONASS L2 wavelength for frequency channel `k` (typically -7..=6).
pub fn glo_wavelength_l2(k: i32) -> f64 {
    SPEED_OF_LIGHT / (GLO_FREQ_L2_BASE + k as f64 * GLO_FREQ_L2_STEP)
}

pub const GAL_FREQ_E1: f64 = 1_575_420_000.0;
pub const GAL_FREQ_E5A: f64 = 1_176_450_000.0;
pub const GAL_FREQ_E5AB: f64 = 1_197_950_000.0;
pub const GAL_FREQ_E5B: f64 = 1_207_140_000.0;
pub const GAL_FREQ_E6: f64 = 1_278_750_000.0;

pub const GAL_WAVELENGTH_E1: f64 = SPEED_OF_LIGHT / GAL_FREQ_E1;
pub const GAL_WAVELENGTH_E5A: f64 = SPEED_OF_LIGHT / GAL_FREQ_E5A;
pub const GAL_WAVELENGTH_E5AB: f64 = SPEED_OF_LIGHT / GAL_FREQ_E5AB;
pub const GAL_WAVELENGTH_E5B: f64 = SPEED_OF_LIGHT / GAL_FREQ_E5B;
pub const GAL_WAVELENGTH_E6: f64 = SPEED_OF_LIGHT / GAL_FREQ_E6;

pub const GNSS_MAX_SATS: usize = 64;
pub const GLONASS_NUM_SLOTS: usize = 24;

pub const PRN_GPS: RangeInclusive<u16> = 1..=32;
pub const PRN_SBAS: RangeInclusive<u16> = 120..=138;
pub const PRN_GLONASS: RangeInclusive<u16> = 38..=61;
pub const PRN_GALILEO: RangeInclusive<u16> = 71..=100;
pub const PRN_GIOVE: RangeInclusive<u16> = 139..=140;
pub const PRN_COMPASS: RangeInclusive<u16> = 141..=170;
pub const PRN_QZSS: RangeInclusive<u16> = 193..=202;

pub const PRN_GLONASS_START: u16 = *PRN_GLONASS.start();
pub const PRN_GALILEO_START: u16 = *PRN_GALILEO.start();
pub const PRN_GIOVE_START: u16 = *PRN_GIOVE.start();

/// Legacy (1001-1004) and MSM raw PRNs below 40 are GPS PRNs directly;
/// 40 and above are SBAS, encoded as `raw + 80`.
pub fn unified_prn_gps(raw: u16) -> u16 {
    if raw < 40 {
        raw
    } else {
        raw + 80
    }
}

/// `raw` is the 1-based GLONASS slot number out of a legacy message header.
pub fn unified_prn_glonass(raw_slot: u16) -> u16 {
    raw_slot - 1 + PRN_GLONASS_START
}

/// `raw_sat` is the 1-based satellite number recovered from an MSM satellite
/// mask (bit position counted from the most significant bit).
pub fn unified_prn_galileo_msm(raw_sat: u16) -> u16 {
    if raw_sat <= 2 {
        PRN_GIOVE_START + (raw_sat - 1)
    } else {
        raw_sat - 1 + PRN_GALILEO_START
    }
}

pub fn unified_prn_glonass_msm(raw_sat: u16) -> u16 {
    raw_sat - 1 + PRN_GLONASS_START
}
