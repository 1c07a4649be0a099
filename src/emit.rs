//! Turns decoded `rtcmlib` epochs and ephemerides into RINEX observation and
//! navigation records.

use std::collections::{BTreeMap, HashMap};

use hifitime::{Epoch, TimeScale};
use rinex::observation::{EpochFlag, ObservationData};
use rinex::prelude::{Constellation, Observable, Sv};

use rtcmlib::{Band, Gnssdata, GlonassEphemeris, Quantity};

/// `(band, quantity)` -> the single RINEX band/attribute character used by
/// both the 2-char (RINEX 2) and 3-char (RINEX 3) observable codes this
/// decoder can produce. GLONASS and Galileo non-L1/L2 bands only ever use
/// the RINEX 3 naming; `--rinex-version 2` silently keeps them off (RINEX 2
/// has no slot for E5b/E5ab/E6 observables).
fn band_code(band: Band, constellation: Constellation) -> Option<&'static str> {
    use Constellation::*;
    match (constellation, band) {
        (GPS, Band::L1) | (Galileo, Band::L1) | (Glonass, Band::L1) => Some("1C"),
        (GPS, Band::P1) => Some("1W"),
        (Glonass, Band::P1) => Some("1P"),
        (GPS, Band::L2) | (Glonass, Band::L2) => Some("2C"),
        (GPS, Band::P2) => Some("2W"),
        (Glonass, Band::P2) => Some("2P"),
        (GPS, Band::L5) | (Galileo, Band::L5) => Some("5Q"),
        (Galileo, Band::L6) => Some("6Q"),
        (Galileo, Band::L5b) => Some("7Q"),
        (Galileo, Band::L5ab) => Some("8Q"),
        _ => None,
    }
}

/// Converts a unified PRN (GPS 1-32/120-138, GLONASS 38-61, Galileo
/// 71-100/139-140) into the per-constellation PRN number RINEX expects.
fn rinex_prn_for(prn: u16, constellation: Constellation) -> u16 {
    match constellation {
        Constellation::Glonass => prn - rtcmlib::constants::PRN_GLONASS_START + 1,
        Constellation::Galileo => {
            if rtcmlib::constants::PRN_GIOVE.contains(&prn) {
                prn - rtcmlib::constants::PRN_GIOVE_START + 1
            } else {
                prn - rtcmlib::constants::PRN_GALILEO_START + 1
            }
        }
        _ => prn,
    }
}

fn observable_for(band: Band, quantity: Quantity, constellation: Constellation) -> Option<Observable> {
    let code = band_code(band, constellation)?;
    Some(match quantity {
        Quantity::Code => Observable::PseudoRange(format!("C{code}")),
        Quantity::Phase => Observable::Phase(format!("L{code}")),
        Quantity::Doppler => Observable::Doppler(format!("D{code}")),
        Quantity::Snr => Observable::SSI(format!("S{code}")),
    })
}

fn gps_epoch_to_hifitime(week: i32, tow_ms: i64) -> Epoch {
    let seconds = week as f64 * 604_800.0 + tow_ms as f64 / 1000.0;
    Epoch::from_duration(hifitime::Duration::from_seconds(seconds), TimeScale::GPST)
}

pub type RtcmData = BTreeMap<(Epoch, EpochFlag), (Option<f64>, BTreeMap<Sv, HashMap<Observable, ObservationData>>)>;

/// Accumulates decoded epochs into the `rinex` crate's observation record
/// shape. One instance is shared across the whole input stream.
#[derive(Default)]
pub struct Emitter {
    pub data: RtcmData,
    pub codes: HashMap<Constellation, Vec<Observable>>,
    pub any_epoch_invalid: bool,
    pub first_epoch: Option<Epoch>,
    pub last_epoch: Option<Epoch>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn constellation_for_prn(prn: u16) -> Option<Constellation> {
        if rtcmlib::constants::PRN_GPS.contains(&prn) || rtcmlib::constants::PRN_SBAS.contains(&prn) {
            Some(Constellation::GPS)
        } else if rtcmlib::constants::PRN_GLONASS.contains(&prn) {
            Some(Constellation::Glonass)
        } else if rtcmlib::constants::PRN_GALILEO.contains(&prn) || rtcmlib::constants::PRN_GIOVE.contains(&prn) {
            Some(Constellation::Galileo)
        } else {
            None
        }
    }


    /// Folds one decoded epoch into the accumulated record.
    pub fn push_epoch(&mut self, epoch: Gnssdata, valid: bool) {
        let time = gps_epoch_to_hifitime(epoch.week, epoch.timeofweek_ms);
        self.first_epoch.get_or_insert(time);
        self.last_epoch = Some(time);
        if !valid {
            self.any_epoch_invalid = true;
        }
        let flag = EpochFlag::Ok;

        let mut per_sat: BTreeMap<Sv, HashMap<Observable, ObservationData>> = BTreeMap::new();
        for sat in &epoch.satellites {
            let Some(constellation) = Self::constellation_for_prn(sat.prn) else { continue };
            let sv = Sv { prn: rinex_prn_for(sat.prn, constellation), constellation };
            let mut obs_map = HashMap::new();
            for band in [Band::L1, Band::L2, Band::P1, Band::P2, Band::L5, Band::L6, Band::L5b, Band::L5ab] {
                for quantity in [Quantity::Code, Quantity::Phase, Quantity::Doppler, Quantity::Snr] {
                    if let Some(value) = sat.get(rtcmlib::Entry::new(band, quantity)) {
                        if let Some(observable) = observable_for(band, quantity, constellation) {
                            let entry = self.codes.entry(constellation).or_default();
                            if !entry.contains(&observable) {
                                entry.push(observable.clone());
                            }
                            obs_map.insert(observable, ObservationData { obs: value, lli: None, snr: None });
                        }
                    }
                }
            }
            per_sat.insert(sv, obs_map);
        }
        self.data.insert((time, flag), (None, per_sat));
    }
}

/// Holds one constellation's navigation messages as they arrive, keyed by
/// satellite, ready to be written out once the stream ends.
#[derive(Default)]
pub struct NavCollector {
    pub gps: Vec<rtcmlib::GpsEphemeris>,
    pub glonass: Vec<GlonassEphemeris>,
    pub galileo: Vec<rtcmlib::GalileoEphemeris>,
}

impl NavCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

fn orbit(name: &str, value: f64) -> (String, rinex::navigation::OrbitItem) {
    (name.to_string(), rinex::navigation::OrbitItem::F64(value))
}

pub type NavRecord = BTreeMap<Epoch, Vec<(Sv, Constellation, rinex::navigation::Ephemeris)>>;

/// Converts the collected ephemerides into the `rinex` crate's navigation
/// record shape, one entry per decoded message (no orbit propagation, no
/// deduplication across repeated broadcasts of the same IODE).
pub fn build_nav_record(nav: &NavCollector) -> NavRecord {
    let mut record: NavRecord = BTreeMap::new();

    for eph in &nav.gps {
        let time = gps_epoch_to_hifitime(eph.week, (eph.toc * 1000.0) as i64);
        let sv = Sv { prn: eph.prn, constellation: Constellation::GPS };
        let orbits = HashMap::from([
            orbit("iode", eph.iode as f64),
            orbit("crs", eph.crs),
            orbit("deltaN", eph.delta_n),
            orbit("m0", eph.m0),
            orbit("cuc", eph.cuc),
            orbit("e", eph.e),
            orbit("cus", eph.cus),
            orbit("sqrtA", eph.sqrt_a),
            orbit("cic", eph.cic),
            orbit("omega0", eph.omega0),
            orbit("cis", eph.cis),
            orbit("i0", eph.i0),
            orbit("crc", eph.crc),
            orbit("omega", eph.omega),
            orbit("omegaDot", eph.omegadot),
            orbit("idot", eph.idot),
            orbit("iodc", eph.iodc as f64),
            orbit("tgd", eph.tgd),
            orbit("svHealth", eph.sv_health as f64),
        ]);
        let record_eph = rinex::navigation::Ephemeris {
            clock_bias: eph.af0,
            clock_drift: eph.af1,
            clock_drift_rate: eph.af2,
            orbits,
        };
        record.entry(time).or_default().push((sv, Constellation::GPS, record_eph));
    }

    for eph in &nav.galileo {
        let time = gps_epoch_to_hifitime(eph.week, (eph.toc * 1000.0) as i64);
        let sv = Sv { prn: rinex_prn_for(eph.prn, Constellation::Galileo), constellation: Constellation::Galileo };
        let orbits = HashMap::from([
            orbit("iodNav", eph.iod_nav as f64),
            orbit("crs", eph.crs),
            orbit("deltaN", eph.delta_n),
            orbit("m0", eph.m0),
            orbit("cuc", eph.cuc),
            orbit("e", eph.e),
            orbit("cus", eph.cus),
            orbit("sqrtA", eph.sqrt_a),
            orbit("cic", eph.cic),
            orbit("omega0", eph.omega0),
            orbit("cis", eph.cis),
            orbit("i0", eph.i0),
            orbit("crc", eph.crc),
            orbit("omega", eph.omega),
            orbit("omegaDot", eph.omegadot),
            orbit("idot", eph.idot),
            orbit("bgdE1E5a", eph.bgd_e1_e5a),
            orbit("sisa", eph.sisa as f64),
        ]);
        let record_eph = rinex::navigation::Ephemeris {
            clock_bias: eph.af0,
            clock_drift: eph.af1,
            clock_drift_rate: eph.af2,
            orbits,
        };
        record.entry(time).or_default().push((sv, Constellation::Galileo, record_eph));
    }

    for eph in &nav.glonass {
        let time = gps_epoch_to_hifitime(eph.week, eph.tow as i64 * 1000);
        let sv = Sv { prn: eph.almanac_number as u16, constellation: Constellation::Glonass };
        let orbits = HashMap::from([
            orbit("posX", eph.x_pos),
            orbit("velX", eph.x_velocity),
            orbit("accelX", eph.x_acceleration),
            orbit("posY", eph.y_pos),
            orbit("velY", eph.y_velocity),
            orbit("accelY", eph.y_acceleration),
            orbit("posZ", eph.z_pos),
            orbit("velZ", eph.z_velocity),
            orbit("accelZ", eph.z_acceleration),
            orbit("channel", eph.frequency_channel as f64),
            orbit("health", if eph.unhealthy { 1.0 } else { 0.0 }),
        ]);
        let record_eph = rinex::navigation::Ephemeris {
            clock_bias: -eph.tau,
            clock_drift: eph.gamma,
            clock_drift_rate: 0.0,
            orbits,
        };
        record.entry(time).or_default().push((sv, Constellation::Glonass, record_eph));
    }

    record
}
