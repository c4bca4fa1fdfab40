//! In-memory compound document writer used by tests.
//!
//! Produces 512-byte-sector files laid out as: big streams, short-sector
//! container, short SAT, directory, then the SAT. The returned positions let
//! tests patch tables to simulate corruption.

use crate::ole::consts::{DIRENTRY_SIZE, HEADER_SIZE, MAGIC};

const SECTOR: usize = 512;
const SHORT_SECTOR: usize = 64;
const IDS_PER_SECTOR: usize = SECTOR / 4;

/// A finished file plus the location of its tables
pub struct BuiltDocument {
    pub bytes: Vec<u8>,
    /// Sectors of each stream in insertion order (empty for short streams)
    pub stream_sectors: Vec<Vec<usize>>,
    /// File offset of directory entry 0
    pub directory_offset: usize,
    /// File offsets of the SAT sectors
    pub sat_offsets: Vec<usize>,
}

pub struct CompoundBuilder {
    streams: Vec<(String, Vec<u8>)>,
    cutoff: u32,
}

impl CompoundBuilder {
    pub fn new() -> Self {
        CompoundBuilder {
            streams: Vec::new(),
            cutoff: 4096,
        }
    }

    /// Add a stream directly under the root storage
    pub fn stream(mut self, name: &str, data: Vec<u8>) -> Self {
        self.streams.push((name.to_string(), data));
        self
    }

    pub fn build(self) -> BuiltDocument {
        let mut sat: Vec<i32> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        let mut stream_sectors = Vec::new();
        // (start, size) written to each stream's directory entry
        let mut placements = Vec::new();

        let chain = |sat: &mut Vec<i32>, body: &mut Vec<u8>, data: &[u8]| -> Vec<usize> {
            let count = data.len().div_ceil(SECTOR);
            let first = sat.len();
            for i in 0..count {
                let next = if i + 1 == count { -2 } else { (first + i + 1) as i32 };
                sat.push(next);
            }
            body.extend_from_slice(data);
            body.resize((first + count) * SECTOR, 0);
            (first..first + count).collect()
        };

        let mut container = Vec::new();
        let mut ssat: Vec<i32> = Vec::new();
        for (_, data) in &self.streams {
            if data.len() as u32 >= self.cutoff {
                let sectors = chain(&mut sat, &mut body, data);
                placements.push((sectors[0] as i32, data.len()));
                stream_sectors.push(sectors);
            } else {
                let count = data.len().div_ceil(SHORT_SECTOR);
                let first = ssat.len();
                for i in 0..count {
                    let next = if i + 1 == count { -2 } else { (first + i + 1) as i32 };
                    ssat.push(next);
                }
                container.extend_from_slice(data);
                container.resize((first + count) * SHORT_SECTOR, 0);
                let start = if count == 0 { -2 } else { first as i32 };
                placements.push((start, data.len()));
                stream_sectors.push(Vec::new());
            }
        }

        let container_start = if container.is_empty() {
            -2
        } else {
            chain(&mut sat, &mut body, &container)[0] as i32
        };

        let mut ssat_bytes: Vec<u8> = ssat.iter().flat_map(|v| v.to_le_bytes()).collect();
        let ssat_start;
        let ssat_count;
        if ssat_bytes.is_empty() {
            ssat_start = -2;
            ssat_count = 0;
        } else {
            ssat_bytes.resize(ssat_bytes.len().div_ceil(SECTOR) * SECTOR, 0xFF);
            let sectors = chain(&mut sat, &mut body, &ssat_bytes);
            ssat_start = sectors[0] as i32;
            ssat_count = sectors.len() as u32;
        }

        let mut directory = Vec::new();
        let entry_count = self.streams.len() + 1;
        let root_child = if self.streams.is_empty() { -1 } else { 1 };
        directory.extend(dir_entry("Root Entry", 5, -1, root_child, container_start, container.len()));
        for (i, (name, _)) in self.streams.iter().enumerate() {
            let right = if i + 2 < entry_count { (i + 2) as i32 } else { -1 };
            let (start, size) = placements[i];
            directory.extend(dir_entry(name, 2, right, -1, start, size));
        }
        directory.resize(directory.len().div_ceil(SECTOR) * SECTOR, 0);
        let dir_sectors = chain(&mut sat, &mut body, &directory);
        let directory_offset = HEADER_SIZE + dir_sectors[0] * SECTOR;

        // The SAT must also describe its own sectors
        let data_sectors = sat.len();
        let mut sat_count = 1;
        while (data_sectors + sat_count).div_ceil(IDS_PER_SECTOR) > sat_count {
            sat_count += 1;
        }
        assert!(sat_count <= 109, "test builder only writes header MSAT entries");
        let sat_first = data_sectors;
        sat.extend(std::iter::repeat_n(-3, sat_count));
        sat.resize(sat_count * IDS_PER_SECTOR, -1);
        body.extend(sat.iter().flat_map(|v| v.to_le_bytes()));
        let sat_offsets = (0..sat_count)
            .map(|i| HEADER_SIZE + (sat_first + i) * SECTOR)
            .collect();

        let mut header = vec![0u8; HEADER_SIZE];
        header[0..8].copy_from_slice(MAGIC);
        header[24..26].copy_from_slice(&0x3Eu16.to_le_bytes());
        header[26..28].copy_from_slice(&3u16.to_le_bytes());
        header[28..30].copy_from_slice(&[0xFE, 0xFF]);
        header[30..32].copy_from_slice(&9u16.to_le_bytes());
        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        header[44..48].copy_from_slice(&(sat_count as u32).to_le_bytes());
        header[48..52].copy_from_slice(&(dir_sectors[0] as i32).to_le_bytes());
        header[56..60].copy_from_slice(&self.cutoff.to_le_bytes());
        header[60..64].copy_from_slice(&ssat_start.to_le_bytes());
        header[64..68].copy_from_slice(&ssat_count.to_le_bytes());
        header[68..72].copy_from_slice(&(-2i32).to_le_bytes());
        for slot in 0..109 {
            let value = if slot < sat_count { (sat_first + slot) as i32 } else { -1 };
            let at = 76 + slot * 4;
            header[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }

        let mut bytes = header;
        bytes.extend(body);
        BuiltDocument {
            bytes,
            stream_sectors,
            directory_offset,
            sat_offsets,
        }
    }
}

fn dir_entry(name: &str, kind: u8, right: i32, child: i32, start: i32, size: usize) -> Vec<u8> {
    let mut entry = vec![0u8; DIRENTRY_SIZE];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry[64..66].copy_from_slice(&(((units.len() + 1) * 2) as u16).to_le_bytes());
    entry[66] = kind;
    entry[67] = 1;
    entry[68..72].copy_from_slice(&(-1i32).to_le_bytes());
    entry[72..76].copy_from_slice(&right.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..124].copy_from_slice(&(size as u32).to_le_bytes());
    entry
}

/// Overwrite the SAT entry for `sector`
pub fn set_sat_entry(built: &mut BuiltDocument, sector: usize, value: i32) {
    let at = built.sat_offsets[sector / IDS_PER_SECTOR] + (sector % IDS_PER_SECTOR) * 4;
    built.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
