//! The decoded-observation data model: one slot per satellite, forty
//! measurement slots (ten bands times four quantities) per satellite.

use bitflags::bitflags;

/// Frequency band a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    L1,
    L2,
    P1,
    P2,
    L5,
    L6,
    L5b,
    L5ab,
    Saif,
    L1n,
}

pub const NUM_BANDS: usize = 10;

/// Kind of measurement carried for a given band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Code,
    Phase,
    Doppler,
    Snr,
}

pub const NUM_QUANTITIES: usize = 4;

/// One of the forty (band, quantity) measurement slots a satellite can carry
/// in a single epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    pub band: Band,
    pub quantity: Quantity,
}

pub const NUM_ENTRIES: usize = NUM_BANDS * NUM_QUANTITIES;

impl Entry {
    pub const fn new(band: Band, quantity: Quantity) -> Self {
        Entry { band, quantity }
    }

    /// Flat 0..40 index used to index `measdata`/bit-test `dataflags`.
    pub fn index(self) -> usize {
        band_index(self.band) * NUM_QUANTITIES + quantity_index(self.quantity)
    }
}

fn band_index(band: Band) -> usize {
    match band {
        Band::L1 => 0,
        Band::L2 => 1,
        Band::P1 => 2,
        Band::P2 => 3,
        Band::L5 => 4,
        Band::L6 => 5,
        Band::L5b => 6,
        Band::L5ab => 7,
        Band::Saif => 8,
        Band::L1n => 9,
    }
}

fn quantity_index(q: Quantity) -> usize {
    match q {
        Quantity::Code => 0,
        Quantity::Phase => 1,
        Quantity::Doppler => 2,
        Quantity::Snr => 3,
    }
}

bitflags! {
    /// Per-satellite condition flags carried alongside the forty measurement
    /// slots. Ground: `georust-rinex::observation::lli::LliFlags`, extended
    /// with every band's lock-loss bit since a single satellite can report
    /// loss of lock independently on L1, L2, L5, E6, E5b and E5a/b.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DataFlags2: u32 {
        const XCORR_L2     = 1 << 0;
        const LOCKLOSS_L1  = 1 << 1;
        const LOCKLOSS_L2  = 1 << 2;
        const LOCKLOSS_L5  = 1 << 3;
        const LOCKLOSS_E6  = 1 << 4;
        const LOCKLOSS_E5B = 1 << 5;
        const LOCKLOSS_E5AB = 1 << 6;
    }
}

/// One satellite's slice of an epoch: the unified PRN plus its forty
/// measurement slots.
#[derive(Debug, Clone)]
pub struct SatelliteData {
    pub prn: u16,
    pub measdata: [f64; NUM_ENTRIES],
    /// Bit `Entry::index()` set means that slot holds a valid measurement.
    pub dataflags: u64,
    pub dataflags2: DataFlags2,
    pub snr_l1: u8,
    pub snr_l2: u8,
}

impl SatelliteData {
    pub fn new(prn: u16) -> Self {
        SatelliteData {
            prn,
            measdata: [0.0; NUM_ENTRIES],
            dataflags: 0,
            dataflags2: DataFlags2::empty(),
            snr_l1: 0,
            snr_l2: 0,
        }
    }

    pub fn set(&mut self, entry: Entry, value: f64) {
        let idx = entry.index();
        self.measdata[idx] = value;
        self.dataflags |= 1 << idx;
    }

    pub fn get(&self, entry: Entry) -> Option<f64> {
        let idx = entry.index();
        if self.dataflags & (1 << idx) != 0 {
            Some(self.measdata[idx])
        } else {
            None
        }
    }
}

/// One complete observation epoch: a GPS (week, time-of-week) timestamp and
/// every satellite observed at that instant.
#[derive(Debug, Clone)]
pub struct Gnssdata {
    pub week: i32,
    pub timeofweek_ms: i64,
    pub satellites: Vec<SatelliteData>,
}

impl Gnssdata {
    pub fn new(week: i32, timeofweek_ms: i64) -> Self {
        Gnssdata { week, timeofweek_ms, satellites: Vec::new() }
    }

    pub fn satellite_mut(&mut self, prn: u16) -> &mut SatelliteData {
        if let Some(idx) = self.satellites.iter().position(|s| s.prn == prn) {
            &mut self.satellites[idx]
        } else {
            self.satellites.push(SatelliteData::new(prn));
            self.satellites.last_mut().unwrap()
        }
    }

    pub fn numsats(&self) -> usize {
        self.satellites.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_index_is_unique_per_band_quantity_pair() {
        let mut seen = std::collections::HashSet::new();
        let bands = [
            Band::L1, Band::L2, Band::P1, Band::P2, Band::L5, Band::L6, Band::L5b, Band::L5ab,
            Band::Saif, Band::L1n,
        ];
        let quantities = [Quantity::Code, Quantity::Phase, Quantity::Doppler, Quantity::Snr];
        for &band in &bands {
            for &q in &quantities {
                assert!(seen.insert(Entry::new(band, q).index()));
            }
        }
        assert_eq!(seen.len(), NUM_ENTRIES);
    }

    #[test]
    fn satellite_slots_stay_unset_until_written() {
        let sat = SatelliteData::new(5);
        assert_eq!(sat.get(Entry::new(Band::L1, Quantity::Code)), None);
    }

    #[test]
    fn gnssdata_deduplicates_satellites_by_prn() {
        let mut epoch = Gnssdata::new(2000, 0);
        epoch.satellite_mut(5).set(Entry::new(Band::L1, Quantity::Code), 123.0);
        epoch.satellite_mut(5).set(Entry::new(Band::L1, Quantity::Phase), 456.0);
        assert_eq!(epoch.numsats(), 1);
        assert_eq!(epoch.satellites[0].get(Entry::new(Band::L1, Quantity::Code)), Some(123.0));
    }
}
