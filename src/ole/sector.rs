//! Sector identifiers and ownership tracking for compound documents.

use super::consts::{ENDOFCHAIN, FREESECT, MSATSECT, SATSECT};

/// One entry of a sector allocation table.
///
/// The file stores these as signed 32-bit integers where the negative values
/// are control sentinels. They are decoded once into this enum so chain walks
/// never compare magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectorId {
    /// Unallocated sector
    Free,
    /// Last sector of a chain
    EndOfChain,
    /// Sector belongs to the SAT itself
    SatSector,
    /// Sector belongs to the master SAT
    MasterSatSector,
    /// Any other negative value
    Invalid(i32),
    /// Index of the next sector
    Sector(u32),
}

impl SectorId {
    /// Decode a raw table entry.
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            FREESECT => SectorId::Free,
            ENDOFCHAIN => SectorId::EndOfChain,
            SATSECT => SectorId::SatSector,
            MSATSECT => SectorId::MasterSatSector,
            n if n < 0 => SectorId::Invalid(n),
            n => SectorId::Sector(n as u32),
        }
    }

    /// The raw signed value, for diagnostics.
    pub fn raw(self) -> i64 {
        match self {
            SectorId::Free => FREESECT as i64,
            SectorId::EndOfChain => ENDOFCHAIN as i64,
            SectorId::SatSector => SATSECT as i64,
            SectorId::MasterSatSector => MSATSECT as i64,
            SectorId::Invalid(n) => n as i64,
            SectorId::Sector(n) => n as i64,
        }
    }

    /// The sector index, if this entry points at a real sector.
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            SectorId::Sector(n) => Some(n as usize),
            _ => None,
        }
    }
}

impl From<i32> for SectorId {
    fn from(raw: i32) -> Self {
        SectorId::from_raw(raw)
    }
}

/// Records which structure claimed each sector of the data area.
///
/// A sector may belong to at most one live chain; a second claim is how
/// corruption (and chain cycles) are detected.
#[derive(Debug, Clone)]
pub struct SectorOwners {
    owners: Vec<u32>,
}

impl SectorOwners {
    pub fn new(sector_count: usize) -> Self {
        SectorOwners {
            owners: vec![0; sector_count],
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Claim `sector` for `owner`.
    ///
    /// Returns the previous owner when the sector was already claimed.
    pub fn claim(&mut self, sector: usize, owner: u32) -> Result<(), u32> {
        match self.owners.get_mut(sector) {
            Some(slot) if *slot != 0 => Err(*slot),
            Some(slot) => {
                *slot = owner;
                Ok(())
            },
            None => Ok(()),
        }
    }

    /// Drop every claim held by `owner`, so its chain can be walked again.
    pub fn release(&mut self, owner: u32) {
        for slot in self.owners.iter_mut().filter(|slot| **slot == owner) {
            *slot = 0;
        }
    }

    pub fn owner(&self, sector: usize) -> Option<u32> {
        self.owners.get(sector).copied().filter(|&o| o != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_id_from_raw() {
        assert_eq!(SectorId::from_raw(-1), SectorId::Free);
        assert_eq!(SectorId::from_raw(-2), SectorId::EndOfChain);
        assert_eq!(SectorId::from_raw(-3), SectorId::SatSector);
        assert_eq!(SectorId::from_raw(-4), SectorId::MasterSatSector);
        assert_eq!(SectorId::from_raw(-5), SectorId::Invalid(-5));
        assert_eq!(SectorId::from_raw(7), SectorId::Sector(7));
        assert_eq!(SectorId::from_raw(7).index(), Some(7));
        assert_eq!(SectorId::EndOfChain.index(), None);
        assert_eq!(SectorId::from(-2).raw(), -2);
    }

    #[test]
    fn test_second_claim_reports_previous_owner() {
        let mut owners = SectorOwners::new(4);
        assert_eq!(owners.claim(2, 3), Ok(()));
        assert_eq!(owners.claim(2, 7), Err(3));
        assert_eq!(owners.owner(2), Some(3));
        assert_eq!(owners.owner(1), None);
    }

    #[test]
    fn test_release_frees_only_that_owner() {
        let mut owners = SectorOwners::new(4);
        owners.claim(0, 7).unwrap();
        owners.claim(1, 7).unwrap();
        owners.claim(2, 3).unwrap();
        owners.release(7);
        assert_eq!(owners.owner(0), None);
        assert_eq!(owners.owner(2), Some(3));
        assert_eq!(owners.claim(1, 7), Ok(()));
    }
}
