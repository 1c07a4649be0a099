//! Decoders for ephemeris messages 1019 (GPS), 1020 (GLONASS), 1045 (Galileo).

use crate::bitreader::BitReader;
use crate::constants::unified_prn_gps;
use crate::error::DecodeError;

const PI: f64 = 3.141_592_653_589_8;

#[derive(Debug, Clone, Copy, Default)]
pub struct GpsEphemeris {
    pub prn: u16,
    pub week: i32,
    pub ura_index: u8,
    pub l2_pcode: bool,
    pub l2_cacode: bool,
    pub idot: f64,
    pub iode: u16,
    pub toc: f64,
    pub af2: f64,
    pub af1: f64,
    pub af0: f64,
    pub iodc: u16,
    pub crs: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub cuc: f64,
    pub e: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omegadot: f64,
    pub tgd: f64,
    pub sv_health: u8,
    pub l2p_flag: bool,
}

pub fn decode_gps_ephemeris(payload: &[u8]) -> Result<GpsEphemeris, DecodeError> {
    let mut r = BitReader::new(payload);
    r.skip(12)?; // message type, already known to the caller
    let mut eph = GpsEphemeris::default();
    let raw_prn = r.get_bits(6)? as u16;
    eph.prn = unified_prn_gps(raw_prn);
    eph.week = r.get_bits(10)? as i32 + 1024;
    eph.ura_index = r.get_bits(4)? as u8;
    let l2_flags = r.get_bits(2)?;
    eph.l2_pcode = l2_flags & 0b01 != 0;
    eph.l2_cacode = l2_flags & 0b10 != 0;
    eph.idot = r.get_float_signed(14, PI * 2f64.powi(-43))?;
    eph.iode = r.get_bits(8)? as u16;
    eph.toc = r.get_float(16, 16.0)?;
    eph.af2 = r.get_float_signed(8, 2f64.powi(-55))?;
    eph.af1 = r.get_float_signed(16, 2f64.powi(-43))?;
    eph.af0 = r.get_float_signed(22, 2f64.powi(-31))?;
    eph.iodc = r.get_bits(10)? as u16;
    eph.crs = r.get_float_signed(16, 2f64.powi(-5))?;
    eph.delta_n = r.get_float_signed(16, PI * 2f64.powi(-43))?;
    eph.m0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.cuc = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.e = r.get_float(32, 2f64.powi(-33))?;
    eph.cus = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.sqrt_a = r.get_float(32, 2f64.powi(-19))?;
    eph.toe = r.get_float(16, 16.0)?;
    eph.cic = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.omega0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.cis = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.i0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.crc = r.get_float_signed(16, 2f64.powi(-5))?;
    eph.omega = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.omegadot = r.get_float_signed(24, PI * 2f64.powi(-43))?;
    eph.tgd = r.get_float_signed(8, 2f64.powi(-31))?;
    eph.sv_health = r.get_bits(6)? as u8;
    eph.l2p_flag = r.get_bits(1)? != 0;
    Ok(eph)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GalileoEphemeris {
    pub prn: u16,
    pub week: i32,
    pub iod_nav: u16,
    pub sisa: u8,
    pub idot: f64,
    pub toc: f64,
    pub af2: f64,
    pub af1: f64,
    pub af0: f64,
    pub crs: f64,
    pub delta_n: f64,
    pub m0: f64,
    pub cuc: f64,
    pub e: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omegadot: f64,
    pub bgd_e1_e5a: f64,
    pub e5a_health: u8,
    pub e5a_data_invalid: bool,
}

pub fn decode_galileo_ephemeris(payload: &[u8]) -> Result<GalileoEphemeris, DecodeError> {
    let mut r = BitReader::new(payload);
    r.skip(12)?;
    let mut eph = GalileoEphemeris::default();
    let raw_prn = r.get_bits(6)? as u16;
    eph.prn = 70 + raw_prn; // PRN_GALILEO_START(71) + (raw_prn - 1)
    eph.week = r.get_bits(12)? as i32;
    eph.iod_nav = r.get_bits(10)? as u16;
    eph.sisa = r.get_bits(8)? as u8;
    eph.idot = r.get_float_signed(14, PI * 2f64.powi(-43))?;
    eph.toc = r.get_float(14, 60.0)?;
    eph.af2 = r.get_float_signed(6, 2f64.powi(-59))?;
    eph.af1 = r.get_float_signed(21, 2f64.powi(-46))?;
    eph.af0 = r.get_float_signed(31, 2f64.powi(-34))?;
    eph.crs = r.get_float_signed(16, 2f64.powi(-5))?;
    eph.delta_n = r.get_float_signed(16, PI * 2f64.powi(-43))?;
    eph.m0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.cuc = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.e = r.get_float(32, 2f64.powi(-33))?;
    eph.cus = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.sqrt_a = r.get_float(32, 2f64.powi(-19))?;
    eph.toe = r.get_float(14, 60.0)?;
    eph.cic = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.omega0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.cis = r.get_float_signed(16, 2f64.powi(-29))?;
    eph.i0 = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.crc = r.get_float_signed(16, 2f64.powi(-5))?;
    eph.omega = r.get_float_signed(32, PI * 2f64.powi(-31))?;
    eph.omegadot = r.get_float_signed(24, PI * 2f64.powi(-43))?;
    eph.bgd_e1_e5a = r.get_float_signed(10, 2f64.powi(-32))?;
    eph.e5a_health = r.get_bits(2)? as u8;
    eph.e5a_data_invalid = r.get_bits(1)? != 0;
    Ok(eph)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GlonassEphemeris {
    pub almanac_number: u8,
    pub frequency_channel: i32,
    pub unhealthy: bool,
    pub tk_seconds: u32,
    pub tb_seconds: u32,
    pub x_pos: f64,
    pub x_velocity: f64,
    pub x_acceleration: f64,
    pub y_pos: f64,
    pub y_velocity: f64,
    pub y_acceleration: f64,
    pub z_pos: f64,
    pub z_velocity: f64,
    pub z_acceleration: f64,
    pub gamma: f64,
    pub tau: f64,
    pub age_of_data: u8,
    pub week: i32,
    pub tow: i32,
}

/// Decodes a 1020 payload. `current_week`/`current_tow` are the parser's
/// running GPS clock, copied onto the output record the way the legacy
/// observation decoders stamp GLONASS records with GPS time.
pub fn decode_glonass_ephemeris(
    payload: &[u8],
    current_week: i32,
    current_tow: i32,
) -> Result<GlonassEphemeris, DecodeError> {
    let mut r = BitReader::new(payload);
    r.skip(12)?;
    let mut eph = GlonassEphemeris::default();
    eph.almanac_number = r.get_bits(6)? as u8;
    let freq_raw = r.get_bits(5)? as i32;
    eph.frequency_channel = freq_raw - 7;
    r.skip(1)?; // almanac health
    r.skip(1)?; // almanac health ok
    r.skip(2)?; // P1 flags
    let hours = r.get_bits(5)?;
    let minutes = r.get_bits(6)?;
    let half_min = r.get_bits(1)?;
    eph.tk_seconds = (hours * 3600 + minutes * 60 + half_min * 30) as u32;
    eph.unhealthy = r.get_bits(1)? != 0;
    r.skip(1)?; // P2
    eph.tb_seconds = r.get_bits(7)? as u32 * 900;
    eph.x_velocity = r.get_float_sign_magnitude(24, 2f64.powi(-20))?;
    eph.x_pos = r.get_float_sign_magnitude(27, 2f64.powi(-11))?;
    eph.x_acceleration = r.get_float_sign_magnitude(5, 2f64.powi(-30))?;
    eph.y_velocity = r.get_float_sign_magnitude(24, 2f64.powi(-20))?;
    eph.y_pos = r.get_float_sign_magnitude(27, 2f64.powi(-11))?;
    eph.y_acceleration = r.get_float_sign_magnitude(5, 2f64.powi(-30))?;
    eph.z_velocity = r.get_float_sign_magnitude(24, 2f64.powi(-20))?;
    eph.z_pos = r.get_float_sign_magnitude(27, 2f64.powi(-11))?;
    eph.z_acceleration = r.get_float_sign_magnitude(5, 2f64.powi(-30))?;
    r.skip(1)?; // P3
    eph.gamma = r.get_float_sign_magnitude(11, 2f64.powi(-40))?;
    r.skip(3)?; // GLONASS-M P/ln flags, not decoded
    eph.tau = r.get_float_sign_magnitude(22, 2f64.powi(-30))?;
    r.skip(5)?; // GLONASS-M delta tau, not decoded
    eph.age_of_data = r.get_bits(5)? as u8;
    eph.week = current_week;
    eph.tow = current_tow;
    Ok(eph)
}
