use crate::header::{ChunkLocation, SECTOR_SIZE};
use byteorder::{BigEndian, WriteBytesExt};
use reclaim_common::{Result, CHUNKS_PER_REGION};
use reclaim_nbt::{Compression, NbtFile};
use std::collections::BTreeMap;
use std::path::Path;

enum Slot {
    Payload { scheme: u8, data: Vec<u8> },
    Shared,
    Raw(ChunkLocation),
}

/// Writes region files in the on-disk layout. Used to stage worlds for tests and tooling.
pub struct RegionBuilder {
    slots: BTreeMap<usize, Slot>,
    shared: Option<Vec<u8>>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            shared: None,
        }
    }

    /// Every slot occupied, all pointing at one shared uncompressed payload. Keeps a fully
    /// generated region down to three sectors.
    pub fn filled(chunk: &NbtFile) -> Result<Self> {
        let mut builder = Self::new();
        let mut payload = vec![Compression::Uncompressed.id()];
        chunk.write(&mut payload)?;
        builder.shared = Some(payload);
        for index in 0..CHUNKS_PER_REGION {
            builder.slots.insert(index, Slot::Shared);
        }
        Ok(builder)
    }

    pub fn with_chunk(
        mut self,
        index: usize,
        chunk: &NbtFile,
        compression: Compression,
    ) -> Result<Self> {
        let data = chunk.to_compressed(compression)?;
        self.slots.insert(
            index,
            Slot::Payload {
                scheme: compression.id(),
                data,
            },
        );
        Ok(self)
    }

    /// A payload with an arbitrary scheme byte and body.
    pub fn with_garbage(mut self, index: usize, scheme: u8, data: &[u8]) -> Self {
        self.slots.insert(
            index,
            Slot::Payload {
                scheme,
                data: data.to_vec(),
            },
        );
        self
    }

    /// A stub that defers to `c.X.Z.mcc`, as written for oversized chunks.
    pub fn with_external(mut self, index: usize, compression: Compression) -> Self {
        self.slots.insert(
            index,
            Slot::Payload {
                scheme: compression.id() | 0x80,
                data: Vec::new(),
            },
        );
        self
    }

    /// A location entry written verbatim, whatever it points at.
    pub fn with_raw_location(mut self, index: usize, sector_offset: u32, sector_count: u8) -> Self {
        self.slots.insert(
            index,
            Slot::Raw(ChunkLocation {
                sector_offset,
                sector_count,
            }),
        );
        self
    }

    pub fn without(mut self, index: usize) -> Self {
        self.slots.remove(&index);
        self
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut locations = vec![ChunkLocation::default(); CHUNKS_PER_REGION];
        let mut body: Vec<u8> = Vec::new();
        let mut next_sector = 2u32;

        let mut append = |body: &mut Vec<u8>, payload: &[u8]| -> ChunkLocation {
            let start = next_sector;
            body.write_u32::<BigEndian>(payload.len() as u32).unwrap_or_default();
            body.extend_from_slice(payload);
            let padded = (body.len() as u64).div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
            body.resize(padded as usize, 0);
            next_sector = 2 + (padded / SECTOR_SIZE) as u32;
            ChunkLocation {
                sector_offset: start,
                sector_count: (next_sector - start) as u8,
            }
        };

        let shared = self
            .shared
            .as_ref()
            .map(|payload| append(&mut body, payload));

        for (index, slot) in &self.slots {
            let Some(location) = locations.get_mut(*index) else {
                continue;
            };
            *location = match slot {
                Slot::Payload { scheme, data } => {
                    let mut payload = vec![*scheme];
                    payload.extend_from_slice(data);
                    append(&mut body, &payload)
                }
                Slot::Shared => shared.unwrap_or_default(),
                Slot::Raw(raw) => *raw,
            };
        }

        let mut bytes = Vec::with_capacity(SECTOR_SIZE as usize * 2 + body.len());
        for location in &locations {
            bytes.write_u32::<BigEndian>(location.to_raw())?;
        }
        for location in &locations {
            bytes.write_u32::<BigEndian>(if location.is_empty() { 0 } else { 1 })?;
        }
        bytes.extend_from_slice(&body);
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
