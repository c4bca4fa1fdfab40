/// Magic bytes that should be at the beginning of every OLE file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Size of the fixed compound document header
pub const HEADER_SIZE: usize = 512;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Number of master SAT entries stored inline in the header
pub const HEADER_MSAT_ENTRIES: usize = 109;

/// Offset of the first inline master SAT entry
pub const HEADER_MSAT_OFFSET: usize = 76;

/// Largest sector shift accepted before falling back to 512-byte sectors
pub const MAX_SECTOR_SHIFT: u16 = 20;

/// Fallback sector shift (512 bytes)
pub const DEFAULT_SECTOR_SHIFT: u16 = 9;

/// Fallback short-sector shift (64 bytes)
pub const DEFAULT_SHORT_SECTOR_SHIFT: u16 = 6;

// Raw sector ids (signed in the file)
/// Unallocated sector
pub const FREESECT: i32 = -1;
/// End of a sector chain
pub const ENDOFCHAIN: i32 = -2;
/// Sector holds part of the SAT
pub const SATSECT: i32 = -3;
/// Sector holds part of the master SAT
pub const MSATSECT: i32 = -4;

/// Unallocated directory entry
pub const NOSTREAM: i32 = -1;

// Object types in storage
/// Empty directory entry
pub const STGTY_EMPTY: u8 = 0;
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

// Owner tags recorded for every claimed sector
/// Master SAT extension sectors
pub const OWNER_MSAT: u32 = 1;
/// SAT sectors
pub const OWNER_SAT: u32 = 2;
/// Directory stream
pub const OWNER_DIRECTORY: u32 = 3;
/// Short-sector container stream
pub const OWNER_SHORT_CONTAINER: u32 = 4;
/// Short SAT
pub const OWNER_SSAT: u32 = 5;
/// First owner tag used for user streams (tag = directory id + this)
pub const OWNER_STREAM_BASE: u32 = 6;
