use byteorder::{BigEndian, ReadBytesExt};
use reclaim_common::CHUNKS_PER_REGION;
use std::io::{self, Read};

/// Size of one sector in bytes.
pub const SECTOR_SIZE: u64 = 4096;

/// Location table plus timestamp table.
pub const HEADER_SIZE: u64 = SECTOR_SIZE * 2;

/// Where a chunk's payload lives, in whole sectors from the start of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkLocation {
    pub sector_offset: u32,
    pub sector_count: u8,
}

impl ChunkLocation {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            sector_offset: raw >> 8,
            sector_count: (raw & 0xFF) as u8,
        }
    }

    pub fn to_raw(&self) -> u32 {
        (self.sector_offset << 8) | self.sector_count as u32
    }

    /// A zeroed entry means the chunk was never written to this region.
    pub fn is_empty(&self) -> bool {
        self.sector_offset == 0 && self.sector_count == 0
    }

    pub fn byte_offset(&self) -> u64 {
        self.sector_offset as u64 * SECTOR_SIZE
    }

    pub fn byte_len(&self) -> u64 {
        self.sector_count as u64 * SECTOR_SIZE
    }
}

/// The 8 KiB table at the start of every region file.
#[derive(Debug, Clone)]
pub struct RegionHeader {
    locations: Vec<ChunkLocation>,
    timestamps: Vec<u32>,
}

impl RegionHeader {
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut raw = vec![0u32; CHUNKS_PER_REGION];
        reader.read_u32_into::<BigEndian>(&mut raw)?;
        let mut timestamps = vec![0u32; CHUNKS_PER_REGION];
        reader.read_u32_into::<BigEndian>(&mut timestamps)?;

        Ok(Self {
            locations: raw.into_iter().map(ChunkLocation::from_raw).collect(),
            timestamps,
        })
    }

    pub fn location(&self, index: usize) -> ChunkLocation {
        self.locations.get(index).copied().unwrap_or_default()
    }

    /// Epoch seconds of the last write of slot `index`, 0 if never written.
    pub fn timestamp(&self, index: usize) -> u32 {
        self.timestamps.get(index).copied().unwrap_or(0)
    }

    pub fn occupied(&self) -> usize {
        self.locations.iter().filter(|l| !l.is_empty()).count()
    }
}
