//! Lock-time continuity tracking, used to flag loss-of-lock (and therefore a
//! possible cycle slip) across successive messages for the same satellite
//! and band.
//!
//! Legacy (1001-1004/1009-1012) messages carry a 7-bit lock-time indicator
//! per PRN/band; loss of lock is declared when the new indicator is smaller
//! than the last one seen, or is zero. MSM messages instead carry a lock
//! indicator per (satellite slot, signal slot) and declare loss of lock on
//! any change at all. These are genuinely different rules, not a
//! simplification of one into the other, so they get separate tables.
//!
//! Owned by `ParserState`, one instance per parser: never a module-level
//! global, so that multiple parsers (and tests) never share state.
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LockTables {
    legacy_gps_l1: HashMap<u16, u8>,
    legacy_gps_l2: HashMap<u16, u8>,
    legacy_glo_l1: HashMap<u16, u8>,
    legacy_glo_l2: HashMap<u16, u8>,
    msm: HashMap<(u16, u8), u16>,
}

impl LockTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the legacy GPS L1 lock table for `prn`, returning whether lock
    /// was lost since the last observation of this satellite/band.
    pub fn update_gps_l1(&mut self, prn: u16, lock: u8) -> bool {
        update_legacy(&mut self.legacy_gps_l1, prn, lock)
    }

    pub fn update_gps_l2(&mut self, prn: u16, lock: u8) -> bool {
        update_legacy(&mut self.legacy_gps_l2, prn, lock)
    }

    pub fn update_glo_l1(&mut self, prn: u16, lock: u8) -> bool {
        update_legacy(&mut self.legacy_glo_l1, prn, lock)
    }

    pub fn update_glo_l2(&mut self, prn: u16, lock: u8) -> bool {
        update_legacy(&mut self.legacy_glo_l2, prn, lock)
    }

    /// Updates the MSM lock table for a (unified PRN, signal slot) pair.
    pub fn update_msm(&mut self, prn: u16, signal_slot: u8, lock: u16) -> bool {
        let key = (prn, signal_slot);
        let lost = match self.msm.get(&key) {
            Some(&prev) => prev != lock,
            None => false,
        };
        self.msm.insert(key, lock);
        lost
    }
}

fn update_legacy(table: &mut HashMap<u16, u8>, prn: u16, lock: u8) -> bool {
    let lost = match table.get(&prn) {
        Some(&prev) => prev > lock || lock == 0,
        None => false,
    };
    table.insert(prn, lock);
    lost
}
