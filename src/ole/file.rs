use super::consts::*;
use super::sector::{SectorId, SectorOwners};
use crate::common::binary::{BinaryError, slice_clamped};
use crate::common::diagnostics::Diagnostics;
use fixedbitset::FixedBitSet;
use std::borrow::Cow;
use thiserror::Error;
use zerocopy::{FromBytes, I32, LE, U16, U32};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw compound document header (512 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    dll_version: U16<LE>,
    /// Must be FE FF
    byte_order: [u8; 2],
    /// Sector size as a power of two
    sector_shift: U16<LE>,
    /// Short sector size as a power of two
    short_sector_shift: U16<LE>,
    reserved: [u8; 6],
    dir_sector_count: U32<LE>,
    sat_sector_count: U32<LE>,
    dir_first_sid: I32<LE>,
    transaction_signature: U32<LE>,
    /// Streams smaller than this live in the short-sector container
    mini_stream_cutoff: U32<LE>,
    ssat_first_sid: I32<LE>,
    ssat_sector_count: U32<LE>,
    msat_first_sid: I32<LE>,
    msat_sector_count: U32<LE>,
    /// First 109 master SAT entries
    msat: [I32<LE>; HEADER_MSAT_ENTRIES],
}

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    sid_left: I32<LE>,
    sid_right: I32<LE>,
    sid_child: I32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: [u8; 8],
    modified_time: [u8; 8],
    start_sector: I32<LE>,
    /// Low 32 bits of the stream size; the high half is unused with 512-byte sectors
    stream_size: U32<LE>,
    stream_size_high: U32<LE>,
}

/// Error types for compound document parsing
#[derive(Debug, Error)]
pub enum OleError {
    /// Signature mismatch or file shorter than a header
    #[error("Not an OLE2 compound document")]
    NotOleFile,
    /// Header or directory fails a sanity check
    #[error("Invalid compound document: {0}")]
    InvalidFormat(String),
    /// A sector was claimed twice, or a chain is otherwise broken
    #[error("Compound document corruption: {0}")]
    Corruption(String),
    /// No stream at the requested path
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(#[from] BinaryError),
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Empty,
    Storage,
    Stream,
    Root,
    /// Lock-bytes, property or unknown entries
    Other(u8),
}

impl EntryKind {
    fn from_u8(value: u8) -> Self {
        match value {
            STGTY_EMPTY => EntryKind::Empty,
            STGTY_STORAGE => EntryKind::Storage,
            STGTY_STREAM => EntryKind::Stream,
            STGTY_ROOT => EntryKind::Root,
            other => EntryKind::Other(other),
        }
    }
}

/// One node of the directory arena.
///
/// Siblings and children are indices into [`CompoundDocument::entries`].
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Directory id (index in the arena)
    pub id: usize,
    /// Entry name (UTF-16 decoded)
    pub name: String,
    pub kind: EntryKind,
    pub left_sibling: Option<usize>,
    pub right_sibling: Option<usize>,
    /// Root of this storage's sibling tree
    pub child: Option<usize>,
    /// First sector of the stream (raw, may be a sentinel)
    pub first_sector: i32,
    /// Size of the stream in bytes
    pub size: u32,
    /// In-order children of a storage
    pub children: Vec<usize>,
    /// Owning storage, `None` for the root and orphans
    pub parent: Option<usize>,
}

impl DirectoryEntry {
    fn parse(id: usize, raw: &RawDirectoryEntry) -> Self {
        let name_len = raw.name_len.get() as usize;
        let name = if name_len == 0 || name_len > raw.name.len() {
            String::new()
        } else {
            // Drop the trailing U+0000
            super::codepage::decode_utf16le(&raw.name[..name_len.saturating_sub(2)])
        };

        DirectoryEntry {
            id,
            name,
            kind: EntryKind::from_u8(raw.entry_type),
            left_sibling: directory_id(raw.sid_left.get()),
            right_sibling: directory_id(raw.sid_right.get()),
            child: directory_id(raw.sid_child.get()),
            first_sector: raw.start_sector.get(),
            size: raw.stream_size.get(),
            children: Vec::new(),
            parent: None,
        }
    }
}

#[inline]
fn directory_id(raw: i32) -> Option<usize> {
    (raw >= 0).then_some(raw as usize)
}

/// An OLE2 compound document held entirely in memory.
///
/// All tables are resolved during [`CompoundDocument::open`]; streams are then
/// located by path and returned as borrowed views when their sectors are
/// contiguous.
#[derive(Debug)]
pub struct CompoundDocument<'a> {
    /// Whole file
    data: &'a [u8],
    sector_size: usize,
    short_sector_size: usize,
    mini_stream_cutoff: u32,
    /// Bytes after the header
    data_len: usize,
    sat: Vec<SectorId>,
    ssat: Vec<SectorId>,
    /// Short-sector container stream hanging off the root entry
    short_container: Vec<u8>,
    entries: Vec<DirectoryEntry>,
    owners: SectorOwners,
    /// Treat the first re-claimed sector as fatal
    strict: bool,
}

impl<'a> CompoundDocument<'a> {
    /// Parse the header, allocation tables and directory of `data`.
    ///
    /// With `strict` set, the first re-claimed sector aborts with
    /// [`OleError::Corruption`]; otherwise the offending chain is cut short
    /// and a warning is reported.
    pub fn open(data: &'a [u8], strict: bool, diagnostics: &Diagnostics) -> Result<Self, OleError> {
        if !is_ole_file(data) {
            return Err(OleError::NotOleFile);
        }

        let header = RawHeader::read_from_bytes(&data[..HEADER_SIZE])
            .map_err(|_| OleError::InvalidFormat("Failed to parse header".to_string()))?;

        if header.byte_order != [0xFE, 0xFF] {
            return Err(OleError::InvalidFormat(format!(
                "Expected little-endian byte order mark, found {:02X} {:02X}",
                header.byte_order[0], header.byte_order[1]
            )));
        }

        let mut sector_shift = header.sector_shift.get();
        if sector_shift > MAX_SECTOR_SHIFT {
            diagnostics.warn(format_args!(
                "sector size (2**{}) is preposterous; assuming 512 and continuing",
                sector_shift
            ));
            sector_shift = DEFAULT_SECTOR_SHIFT;
        }
        // A sector must hold at least one directory entry
        if sector_shift < 7 {
            return Err(OleError::InvalidFormat(format!(
                "Sector size 2**{} is too small",
                sector_shift
            )));
        }
        let mut short_shift = header.short_sector_shift.get();
        if short_shift > sector_shift {
            diagnostics.warn(format_args!(
                "short sector size (2**{}) is preposterous; assuming 64 and continuing",
                short_shift
            ));
            short_shift = DEFAULT_SHORT_SECTOR_SHIFT;
        }

        let sector_size = 1usize << sector_shift;
        let data_len = data.len() - HEADER_SIZE;
        let sector_count = data_len.div_ceil(sector_size);
        if data_len % sector_size != 0 {
            diagnostics.warn(format_args!(
                "file size ({}) is not 512 + a multiple of the sector size ({})",
                data.len(),
                sector_size
            ));
        }

        let mut doc = CompoundDocument {
            data,
            sector_size,
            short_sector_size: 1usize << short_shift,
            mini_stream_cutoff: header.mini_stream_cutoff.get(),
            data_len,
            sat: Vec::new(),
            ssat: Vec::new(),
            short_container: Vec::new(),
            entries: Vec::new(),
            owners: SectorOwners::new(sector_count),
            strict,
        };

        let msat = doc.load_master_sat(&header, diagnostics)?;
        doc.load_sat(&msat, diagnostics)?;
        doc.load_directory(header.dir_first_sid.get(), diagnostics)?;
        doc.load_short_tables(
            header.ssat_first_sid.get(),
            header.ssat_sector_count.get(),
            diagnostics,
        )?;

        Ok(doc)
    }

    pub fn sector_size(&self) -> usize {
        self.sector_size
    }

    pub fn short_sector_size(&self) -> usize {
        self.short_sector_size
    }

    pub fn mini_stream_cutoff(&self) -> u32 {
        self.mini_stream_cutoff
    }

    /// The directory arena; entry 0 is the root storage.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Check if a stream exists
    pub fn exists(&self, path: &str) -> bool {
        self.find_stream(path).is_some()
    }

    /// Locate a stream by `/`-separated, case-insensitive path.
    ///
    /// Streams at or above the mini-stream cutoff are read from the main
    /// sector area: a single contiguous run of sectors is returned as a
    /// borrowed view of the file, scattered runs are copied into one buffer.
    /// Smaller streams are copied out of the short-sector container.
    pub fn locate_stream(
        &mut self,
        path: &str,
        diagnostics: &Diagnostics,
    ) -> Result<Cow<'a, [u8]>, OleError> {
        let id = self
            .find_stream(path)
            .ok_or_else(|| OleError::StreamNotFound(path.to_string()))?;
        let first = self.entries[id].first_sector;
        let size = self.entries[id].size as usize;

        if size > self.data_len {
            return Err(OleError::InvalidFormat(format!(
                "{:?} stream length ({} bytes) > file data size ({} bytes)",
                path, size, self.data_len
            )));
        }

        let view = if size as u64 >= self.mini_stream_cutoff as u64 {
            let limit = size.div_ceil(self.sector_size);
            let owner = OWNER_STREAM_BASE + id as u32;
            self.owners.release(owner);
            let sectors = self.follow_chain(first, owner, path, Some(limit), diagnostics)?;
            self.gather(&sectors, Some(size))
        } else {
            Cow::Owned(self.read_short_stream(path, first, size, diagnostics)?)
        };

        if view.len() < size {
            diagnostics.warn(format_args!(
                "OLE2 stream {:?}: expected size {}, actual size {}",
                path,
                size,
                view.len()
            ));
        }
        Ok(view)
    }

    fn fail(&self, diagnostics: &Diagnostics, message: String) -> Result<(), OleError> {
        if self.strict {
            return Err(OleError::Corruption(message));
        }
        diagnostics.warn(format_args!("{}", message));
        Ok(())
    }

    /// Bytes of one sector of the data area, clamped to the file end
    fn sector(&self, index: usize) -> &'a [u8] {
        let start = HEADER_SIZE + index * self.sector_size;
        slice_clamped(self.data, start, start + self.sector_size)
    }

    /// Decode one sector as a table of sector ids
    fn read_table_sector(&self, index: usize) -> Vec<SectorId> {
        self.sector(index)
            .chunks_exact(4)
            .map(|chunk| {
                SectorId::from_raw(
                    I32::<LE>::read_from_bytes(chunk)
                        .map(|v| v.get())
                        .unwrap_or(FREESECT),
                )
            })
            .collect()
    }

    /// Load the master SAT: the inline header entries plus extension sectors
    fn load_master_sat(
        &mut self,
        header: &RawHeader,
        diagnostics: &Diagnostics,
    ) -> Result<Vec<SectorId>, OleError> {
        let mut msat: Vec<SectorId> = header
            .msat
            .iter()
            .map(|entry| SectorId::from_raw(entry.get()))
            .collect();

        let entries_per_sector = self.sector_size / 4;
        let sat_sectors_required = self.owners.len().div_ceil(entries_per_sector);
        let expected = if sat_sectors_required > HEADER_MSAT_ENTRIES {
            (sat_sectors_required - HEADER_MSAT_ENTRIES + entries_per_sector - 2)
                / (entries_per_sector - 1)
        } else {
            0
        };

        let first = SectorId::from_raw(header.msat_first_sid.get());
        let declared = header.msat_sector_count.get() as usize;
        let mut found = 0usize;
        let empty_chain = declared == 0
            && matches!(
                first,
                SectorId::EndOfChain | SectorId::Free | SectorId::Sector(0)
            );

        if !empty_chain {
            let mut current = first;
            loop {
                let index = match current {
                    SectorId::EndOfChain | SectorId::Free | SectorId::MasterSatSector => break,
                    SectorId::Sector(n) if (n as usize) < self.owners.len() => n as usize,
                    other => {
                        self.fail(
                            diagnostics,
                            format!(
                                "MSAT extension: accessing sector {} but only {} in file",
                                other.raw(),
                                self.owners.len()
                            ),
                        )?;
                        break;
                    },
                };
                if let Err(previous) = self.owners.claim(index, OWNER_MSAT) {
                    self.fail(
                        diagnostics,
                        format!("MSAT corruption: seen[{}] == {}", index, previous),
                    )?;
                    break;
                }
                found += 1;

                // The last entry of each extension sector points at the next one
                let entries = self.read_table_sector(index);
                let Some((next, body)) = entries.split_last() else {
                    break;
                };
                msat.extend_from_slice(body);
                current = *next;
            }
        }

        if found != expected || found != declared {
            diagnostics.debug(format_args!(
                "MSAT extension sectors: declared {}, expected {}, found {}",
                declared, expected, found
            ));
        }
        Ok(msat)
    }

    /// Load the SAT by reading sectors in master SAT order
    fn load_sat(&mut self, msat: &[SectorId], diagnostics: &Diagnostics) -> Result<(), OleError> {
        let mut truncation_reported = false;

        for (position, entry) in msat.iter().enumerate() {
            let index = match *entry {
                SectorId::Free | SectorId::EndOfChain => continue,
                SectorId::Sector(n) if (n as usize) < self.owners.len() => n as usize,
                SectorId::Sector(n) => {
                    if !truncation_reported {
                        diagnostics.warn(format_args!(
                            "File is truncated, or OLE2 MSAT is corrupt: MSAT[{}] == {}, file has {} sectors",
                            position,
                            n,
                            self.owners.len()
                        ));
                        truncation_reported = true;
                    }
                    continue;
                },
                other => {
                    self.fail(
                        diagnostics,
                        format!("MSAT: invalid sector id {} at MSAT[{}]", other.raw(), position),
                    )?;
                    continue;
                },
            };

            if let Err(previous) = self.owners.claim(index, OWNER_SAT) {
                self.fail(
                    diagnostics,
                    format!("MSAT extension corruption: seen[{}] == {}", index, previous),
                )?;
                break;
            }
            let entries = self.read_table_sector(index);
            self.sat.extend(entries);
        }

        Ok(())
    }

    /// Follow a SAT chain from `start`, claiming every sector for `owner`.
    ///
    /// Stops at end-of-chain, or early (after reporting through
    /// [`Self::fail`]) when a sector is out of range, already claimed, or
    /// beyond `limit` sectors. Each step claims a fresh sector so the walk is
    /// bounded by the sector count.
    fn follow_chain(
        &mut self,
        start: i32,
        owner: u32,
        name: &str,
        limit: Option<usize>,
        diagnostics: &Diagnostics,
    ) -> Result<Vec<usize>, OleError> {
        let mut sectors = Vec::new();
        let mut current = SectorId::from_raw(start);

        loop {
            let index = match current {
                SectorId::EndOfChain => break,
                SectorId::Sector(n) => n as usize,
                other => {
                    if !(sectors.is_empty() && other == SectorId::Free) {
                        diagnostics.warn(format_args!(
                            "OLE2 stream {:?}: chain ended with sector id {}",
                            name,
                            other.raw()
                        ));
                    }
                    break;
                },
            };

            if index >= self.owners.len() {
                self.fail(
                    diagnostics,
                    format!(
                        "OLE2 stream {:?}: sector allocation table invalid entry ({})",
                        name, index
                    ),
                )?;
                break;
            }
            if let Err(previous) = self.owners.claim(index, owner) {
                self.fail(
                    diagnostics,
                    format!("{} corruption: seen[{}] == {}", name, index, previous),
                )?;
                break;
            }
            if let Some(limit) = limit
                && sectors.len() == limit
            {
                self.fail(
                    diagnostics,
                    format!(
                        "{}: size exceeds expected {} bytes; corrupt?",
                        name,
                        limit * self.sector_size
                    ),
                )?;
                break;
            }

            sectors.push(index);
            current = match self.sat.get(index) {
                Some(next) => *next,
                None => {
                    diagnostics.warn(format_args!(
                        "OLE2 stream {:?}: sector {} has no SAT entry",
                        name, index
                    ));
                    SectorId::EndOfChain
                },
            };
        }

        Ok(sectors)
    }

    /// Join the bytes of `sectors`, truncated to `size`.
    ///
    /// Adjacent sectors are merged into runs; a single run is returned as a
    /// view into the file.
    fn gather(&self, sectors: &[usize], size: Option<usize>) -> Cow<'a, [u8]> {
        let mut runs: Vec<(usize, usize)> = Vec::new();
        for &sector in sectors {
            let start = HEADER_SIZE + sector * self.sector_size;
            let end = start + self.sector_size;
            match runs.last_mut() {
                Some(run) if run.1 == start => run.1 = end,
                _ => runs.push((start, end)),
            }
        }

        let limit = size.unwrap_or(usize::MAX);
        match runs.as_slice() {
            [] => Cow::Borrowed(&[]),
            [(start, end)] => {
                let end = (*end).min(start.saturating_add(limit));
                Cow::Borrowed(slice_clamped(self.data, *start, end))
            },
            _ => {
                let mut buffer = Vec::with_capacity(sectors.len() * self.sector_size);
                for &(start, end) in &runs {
                    buffer.extend_from_slice(slice_clamped(self.data, start, end));
                    if buffer.len() >= limit {
                        break;
                    }
                }
                buffer.truncate(limit);
                Cow::Owned(buffer)
            },
        }
    }

    /// Load directory entries and derive each storage's children
    fn load_directory(&mut self, first: i32, diagnostics: &Diagnostics) -> Result<(), OleError> {
        let sectors = self.follow_chain(first, OWNER_DIRECTORY, "directory", None, diagnostics)?;
        let bytes = self.gather(&sectors, None);

        let mut entries = Vec::with_capacity(bytes.len() / DIRENTRY_SIZE);
        for (id, chunk) in bytes.chunks_exact(DIRENTRY_SIZE).enumerate() {
            let raw = RawDirectoryEntry::read_from_bytes(chunk).map_err(|_| {
                OleError::InvalidFormat("Failed to parse directory entry".to_string())
            })?;
            entries.push(DirectoryEntry::parse(id, &raw));
        }

        if entries.is_empty() {
            return Err(OleError::InvalidFormat("Directory is empty".to_string()));
        }
        if entries[0].kind != EntryKind::Root {
            diagnostics.warn(format_args!(
                "directory entry 0 has type {:?}, expected a root storage",
                entries[0].kind
            ));
        }

        self.entries = entries;
        self.build_family_tree(diagnostics);
        Ok(())
    }

    /// Collect the children of every storage by in-order traversal of its
    /// sibling tree (left subtree, node, right subtree).
    ///
    /// Iterative, and guarded by a visited set so a cyclic or shared sibling
    /// reference cannot loop or attach a node twice.
    fn build_family_tree(&mut self, diagnostics: &Diagnostics) {
        let count = self.entries.len();
        let mut visited = FixedBitSet::with_capacity(count);
        visited.insert(0);

        let mut storages = vec![(0usize, self.entries[0].child)];
        while let Some((parent, root)) = storages.pop() {
            let mut children = Vec::new();
            let mut stack: Vec<usize> = Vec::new();
            let mut cursor = root;

            loop {
                while let Some(id) = cursor {
                    if id >= count {
                        diagnostics.warn(format_args!(
                            "directory entry id {} out of range ({} entries)",
                            id, count
                        ));
                        break;
                    }
                    if visited.put(id) {
                        diagnostics.warn(format_args!(
                            "directory entry {} is referenced more than once",
                            id
                        ));
                        break;
                    }
                    stack.push(id);
                    cursor = self.entries[id].left_sibling;
                }

                let Some(id) = stack.pop() else {
                    break;
                };
                children.push(id);
                self.entries[id].parent = Some(parent);
                if self.entries[id].kind == EntryKind::Storage {
                    storages.push((id, self.entries[id].child));
                }
                cursor = self.entries[id].right_sibling;
            }

            self.entries[parent].children = children;
        }
    }

    /// Load the short-sector container and the short SAT
    fn load_short_tables(
        &mut self,
        ssat_first: i32,
        ssat_sector_count: u32,
        diagnostics: &Diagnostics,
    ) -> Result<(), OleError> {
        let root_first = self.entries[0].first_sector;
        let root_size = self.entries[0].size as usize;

        // Some writers store -1 rather than end-of-chain for an empty container
        if root_first >= 0 && root_size > 0 {
            let sectors =
                self.follow_chain(root_first, OWNER_SHORT_CONTAINER, "SSCS", None, diagnostics)?;
            let container = self.gather(&sectors, Some(root_size));
            if container.len() < root_size {
                diagnostics.warn(format_args!(
                    "OLE2 stream \"SSCS\": expected size {}, actual size {}",
                    root_size,
                    container.len()
                ));
            }
            self.short_container = container.into_owned();
        }

        if ssat_sector_count > 0 && root_size == 0 {
            diagnostics.warn(format_args!(
                "OLE2 inconsistency: SSCS size is 0 but SSAT size is non-zero"
            ));
        }
        if root_size == 0 {
            return Ok(());
        }

        let mut current = SectorId::from_raw(ssat_first);
        let mut remaining = ssat_sector_count;
        while remaining > 0 {
            let Some(index) = current.index() else {
                break;
            };
            if index >= self.owners.len() {
                self.fail(
                    diagnostics,
                    format!("SSAT: sector {} outside the file", index),
                )?;
                break;
            }
            if let Err(previous) = self.owners.claim(index, OWNER_SSAT) {
                self.fail(
                    diagnostics,
                    format!("SSAT corruption: seen[{}] == {}", index, previous),
                )?;
                break;
            }
            remaining -= 1;
            let entries = self.read_table_sector(index);
            self.ssat.extend(entries);
            current = self.sat.get(index).copied().unwrap_or(SectorId::EndOfChain);
        }

        if remaining != 0 || current != SectorId::EndOfChain {
            self.fail(
                diagnostics,
                format!(
                    "SSAT chain ended prematurely ({} sectors missing, last id {})",
                    remaining,
                    current.raw()
                ),
            )?;
        }
        Ok(())
    }

    /// Copy a short stream out of the short-sector container
    fn read_short_stream(
        &self,
        path: &str,
        first: i32,
        size: usize,
        diagnostics: &Diagnostics,
    ) -> Result<Vec<u8>, OleError> {
        let mut out = Vec::with_capacity(size);
        let mut visited = FixedBitSet::with_capacity(self.ssat.len());
        let mut current = SectorId::from_raw(first);

        while out.len() < size {
            let Some(index) = current.index() else {
                break;
            };
            if index >= self.ssat.len() {
                self.fail(
                    diagnostics,
                    format!("{} (from SSCS): short sector {} out of range", path, index),
                )?;
                break;
            }
            if visited.put(index) {
                self.fail(
                    diagnostics,
                    format!("{} (from SSCS) corruption: short sector {} revisited", path, index),
                )?;
                break;
            }

            let start = index * self.short_sector_size;
            let take = self.short_sector_size.min(size - out.len());
            out.extend_from_slice(slice_clamped(&self.short_container, start, start + take));
            current = self.ssat[index];
        }

        Ok(out)
    }

    /// Find a stream entry by path
    fn find_stream(&self, path: &str) -> Option<usize> {
        let mut storage = 0usize;
        let mut parts = path.split('/').filter(|part| !part.is_empty()).peekable();

        while let Some(part) = parts.next() {
            let wanted = part.to_lowercase();
            let child = self.entries[storage]
                .children
                .iter()
                .copied()
                .find(|&c| self.entries[c].name.to_lowercase() == wanted)?;

            let is_last = parts.peek().is_none();
            match (self.entries[child].kind, is_last) {
                (EntryKind::Stream, true) => return Some(child),
                (EntryKind::Storage, false) => storage = child,
                _ => return None,
            }
        }
        None
    }
}

/// Check if a file/data is an OLE file by checking magic bytes
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && &data[0..8] == MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::cfb::{CompoundBuilder, set_sat_entry};

    fn quiet() -> Diagnostics {
        Diagnostics::new()
    }

    #[test]
    fn test_rejects_non_ole_bytes() {
        let data = vec![0u8; 1024];
        assert!(matches!(
            CompoundDocument::open(&data, true, &quiet()),
            Err(OleError::NotOleFile)
        ));
    }

    #[test]
    fn test_rejects_bad_byte_order() {
        let mut built = CompoundBuilder::new().stream("Workbook", vec![1; 5000]).build();
        built.bytes[28] = 0xFF;
        built.bytes[29] = 0xFE;
        assert!(matches!(
            CompoundDocument::open(&built.bytes, true, &quiet()),
            Err(OleError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_contiguous_big_stream_is_borrowed() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let built = CompoundBuilder::new().stream("Workbook", payload.clone()).build();
        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();

        let view = doc.locate_stream("Workbook", &diagnostics).unwrap();
        assert!(matches!(view, Cow::Borrowed(_)));
        assert_eq!(view.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let built = CompoundBuilder::new().stream("Workbook", vec![7; 4096]).build();
        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();
        assert!(doc.exists("WORKBOOK"));
        assert!(!doc.exists("Book"));
        assert!(matches!(
            doc.locate_stream("Book", &diagnostics),
            Err(OleError::StreamNotFound(_))
        ));
        assert_eq!(doc.locate_stream("workbook", &diagnostics).unwrap().len(), 4096);
    }

    #[test]
    fn test_short_stream_from_mini_container() {
        let small: Vec<u8> = (0..150u8).collect();
        let built = CompoundBuilder::new()
            .stream("Big", vec![9; 4096])
            .stream("Small", small.clone())
            .build();
        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();

        let view = doc.locate_stream("Small", &diagnostics).unwrap();
        assert_eq!(view.as_ref(), small.as_slice());
        assert_eq!(doc.entries()[0].children.len(), 2);
    }

    #[test]
    fn test_children_are_in_order() {
        let built = CompoundBuilder::new()
            .stream("A", vec![1; 10])
            .stream("B", vec![2; 10])
            .stream("C", vec![3; 10])
            .build();
        let doc = CompoundDocument::open(&built.bytes, true, &quiet()).unwrap();
        let names: Vec<&str> = doc.entries()[0]
            .children
            .iter()
            .map(|&c| doc.entries()[c].name.as_str())
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn test_duplicated_sector_strict_is_corruption() {
        // Eight sectors a -> b -> ...; point b back at a.
        let mut built = CompoundBuilder::new().stream("Workbook", vec![5; 4096]).build();
        let chain = built.stream_sectors[0].clone();
        set_sat_entry(&mut built, chain[1], chain[0] as i32);

        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();
        assert!(matches!(
            doc.locate_stream("Workbook", &diagnostics),
            Err(OleError::Corruption(_))
        ));
    }

    #[test]
    fn test_repeated_lookup_is_not_corruption() {
        let built = CompoundBuilder::new().stream("Workbook", vec![5; 4096]).build();
        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();
        let first = doc.locate_stream("Workbook", &diagnostics).unwrap().into_owned();
        let second = doc.locate_stream("Workbook", &diagnostics).unwrap();
        assert_eq!(first, second.as_ref());
        assert_eq!(second.len(), 4096);
    }

    #[test]
    fn test_duplicated_sector_permissive_is_truncated() {
        let mut built = CompoundBuilder::new().stream("Workbook", vec![5; 4096]).build();
        let chain = built.stream_sectors[0].clone();
        set_sat_entry(&mut built, chain[1], chain[0] as i32);

        let sink = crate::common::diagnostics::capture::CaptureSink::default();
        let diagnostics = Diagnostics::with_sink(Box::new(sink.clone()));
        let mut doc = CompoundDocument::open(&built.bytes, false, &diagnostics).unwrap();
        let view = doc.locate_stream("Workbook", &diagnostics).unwrap();
        assert_eq!(view.len(), 1024);
        assert!(sink.text().contains("corruption: seen["));
    }

    #[test]
    fn test_cyclic_directory_siblings_terminate() {
        let mut built = CompoundBuilder::new()
            .stream("A", vec![1; 10])
            .stream("B", vec![2; 10])
            .build();
        // Entry 2 (B) gets entry 1 (A) as its right sibling: A -> B -> A.
        let offset = built.directory_offset + 2 * DIRENTRY_SIZE + 72;
        built.bytes[offset..offset + 4].copy_from_slice(&1i32.to_le_bytes());

        let doc = CompoundDocument::open(&built.bytes, false, &quiet()).unwrap();
        assert_eq!(doc.entries()[0].children, vec![1, 2]);
    }

    #[test]
    fn test_oversized_stream_is_rejected() {
        let mut built = CompoundBuilder::new().stream("Workbook", vec![0; 4096]).build();
        let offset = built.directory_offset + DIRENTRY_SIZE + 120;
        built.bytes[offset..offset + 4].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());

        let diagnostics = quiet();
        let mut doc = CompoundDocument::open(&built.bytes, true, &diagnostics).unwrap();
        assert!(matches!(
            doc.locate_stream("Workbook", &diagnostics),
            Err(OleError::InvalidFormat(_))
        ));
    }
}
