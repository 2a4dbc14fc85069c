use crate::header::{RegionHeader, HEADER_SIZE};
use byteorder::{BigEndian, ReadBytesExt};
use reclaim_common::{RegionCoordinate, ReclaimError, Result};
use reclaim_nbt::{Compression, NbtFile};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Set on the compression byte when the payload lives in a sibling `c.X.Z.mcc` file.
const EXTERNAL_FLAG: u8 = 0x80;

/// What a region header slot says about one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPresence {
    /// Never written; the slot holds nothing worth keeping.
    Absent,
    Present,
    /// Occupied but cannot be read back.
    Unreadable(String),
}

/// An open region file with its header parsed. The handle stays open across probes so a
/// scan can resume it on later ticks; drop it before deleting the file.
#[derive(Debug)]
pub struct RegionFile {
    path: PathBuf,
    coordinate: RegionCoordinate,
    header: RegionHeader,
    file: File,
    len: u64,
}

impl RegionFile {
    /// Opens and reads the header. `Ok(None)` when the file does not exist; a file too short
    /// to hold a header is a `DataError`.
    pub fn open(path: &Path, coordinate: RegionCoordinate) -> Result<Option<Self>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let len = file.metadata()?.len();
        if len < HEADER_SIZE {
            return Err(ReclaimError::DataError(format!(
                "{} is {} bytes, shorter than a region header",
                path.display(),
                len
            )));
        }
        let header = RegionHeader::read(&mut file)?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            coordinate,
            header,
            file,
            len,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn coordinate(&self) -> RegionCoordinate {
        self.coordinate
    }

    pub fn header(&self) -> &RegionHeader {
        &self.header
    }

    /// Classifies slot `index`. With `inspect` the payload is decompressed and parsed,
    /// otherwise only the sector bounds and the 5-byte payload prefix are checked.
    /// Schemes that cannot be decoded (LZ4, custom) are unreadable either way.
    pub fn probe(&mut self, index: usize, inspect: bool) -> ChunkPresence {
        let location = self.header.location(index);
        if location.is_empty() {
            return ChunkPresence::Absent;
        }
        match self.check_slot(index, inspect) {
            Ok(()) => ChunkPresence::Present,
            Err(reason) => ChunkPresence::Unreadable(reason),
        }
    }

    fn check_slot(&mut self, index: usize, inspect: bool) -> std::result::Result<(), String> {
        let location = self.header.location(index);
        if location.byte_offset() < HEADER_SIZE {
            return Err(format!("sector {} overlaps the header", location.sector_offset));
        }
        if location.sector_count == 0 {
            return Err("zero sector count".to_owned());
        }
        if location.byte_offset() + 5 > self.len {
            return Err(format!(
                "sector {} lies past the end of the file",
                location.sector_offset
            ));
        }

        let (length, scheme) = self
            .read_prefix(location.byte_offset())
            .map_err(|err| format!("prefix unreadable: {}", err))?;
        if length == 0 || length as u64 > location.byte_len() {
            return Err(format!(
                "payload length {} does not fit {} sectors",
                length, location.sector_count
            ));
        }

        let external = scheme & EXTERNAL_FLAG != 0;
        let scheme = scheme & !EXTERNAL_FLAG;
        let compression = Compression::from_id(scheme)
            .ok_or_else(|| format!("compression scheme {} cannot be decoded", scheme))?;
        if external && !self.external_path(index).exists() {
            return Err("external payload file is missing".to_owned());
        }
        if !inspect {
            return Ok(());
        }

        let read = if external {
            std::fs::read(self.external_path(index))
        } else {
            self.read_payload(location.byte_offset() + 5, length as usize - 1)
        };
        let payload = read.map_err(|err| format!("payload unreadable: {}", err))?;

        NbtFile::read_compressed(&payload, compression)
            .map(|_| ())
            .map_err(|err| format!("payload does not decode: {}", err))
    }

    fn read_prefix(&mut self, offset: u64) -> io::Result<(u32, u8)> {
        self.file.seek(SeekFrom::Start(offset))?;
        let length = self.file.read_u32::<BigEndian>()?;
        let scheme = self.file.read_u8()?;
        Ok((length, scheme))
    }

    fn read_payload(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload)?;
        Ok(payload)
    }

    fn external_path(&self, index: usize) -> PathBuf {
        let (x, z) = self.coordinate.chunk_at(index);
        self.path.with_file_name(format!("c.{}.{}.mcc", x, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RegionBuilder;
    use assert_matches::assert_matches;
    use reclaim_nbt::Tag;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn scratch() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("reclaim-region-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn chunk_nbt() -> NbtFile {
        let mut level = HashMap::new();
        level.insert("xPos".to_owned(), Tag::Int(0));
        level.insert("Status".to_owned(), Tag::String("minecraft:full".to_owned()));
        NbtFile::new("", Tag::Compound(level))
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = scratch();
        let opened = RegionFile::open(&dir.join("r.0.0.mca"), RegionCoordinate::new(0, 0));
        assert_matches!(opened, Ok(None));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        let dir = scratch();
        let path = dir.join("r.0.0.mca");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let opened = RegionFile::open(&path, RegionCoordinate::new(0, 0));
        assert_matches!(opened, Err(ReclaimError::DataError(_)));
    }

    #[test]
    fn test_probe_slots() {
        let dir = scratch();
        let path = dir.join("r.0.0.mca");
        RegionBuilder::new()
            .with_chunk(0, &chunk_nbt(), Compression::Zlib)
            .unwrap()
            .with_raw_location(1, 1, 1)
            .with_raw_location(2, 900, 1)
            .with_garbage(3, 2, b"not nbt at all")
            .write(&path)
            .unwrap();

        let mut region = RegionFile::open(&path, RegionCoordinate::new(0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(region.probe(0, true), ChunkPresence::Present);
        assert_matches!(region.probe(1, false), ChunkPresence::Unreadable(_));
        assert_matches!(region.probe(2, false), ChunkPresence::Unreadable(_));
        // Garbage passes the cheap check but fails inspection
        assert_eq!(region.probe(3, false), ChunkPresence::Present);
        assert_matches!(region.probe(3, true), ChunkPresence::Unreadable(_));
        assert_eq!(region.probe(4, true), ChunkPresence::Absent);
    }

    #[test]
    fn test_every_scheme_inspects() {
        let dir = scratch();
        let path = dir.join("r.-1.2.mca");
        RegionBuilder::new()
            .with_chunk(10, &chunk_nbt(), Compression::Gzip)
            .unwrap()
            .with_chunk(11, &chunk_nbt(), Compression::Zlib)
            .unwrap()
            .with_chunk(12, &chunk_nbt(), Compression::Uncompressed)
            .unwrap()
            .write(&path)
            .unwrap();

        let mut region = RegionFile::open(&path, RegionCoordinate::new(-1, 2))
            .unwrap()
            .unwrap();
        assert_eq!(region.header().occupied(), 3);
        for index in 10..13 {
            assert_eq!(region.probe(index, true), ChunkPresence::Present);
        }
    }

    #[test]
    fn test_undecodable_schemes_unreadable_in_both_modes() {
        let dir = scratch();
        let path = dir.join("r.0.0.mca");
        RegionBuilder::new()
            .with_garbage(0, 4, b"lz4 block stream")
            .with_garbage(1, 127, b"\x00\x0dcustom:codec")
            .with_garbage(2, 9, b"what")
            .write(&path)
            .unwrap();

        let mut region = RegionFile::open(&path, RegionCoordinate::new(0, 0))
            .unwrap()
            .unwrap();
        for index in 0..3 {
            assert_matches!(region.probe(index, false), ChunkPresence::Unreadable(_));
            assert_matches!(region.probe(index, true), ChunkPresence::Unreadable(_));
        }
    }

    #[test]
    fn test_external_payload() {
        let dir = scratch();
        let path = dir.join("r.0.0.mca");
        RegionBuilder::new()
            .with_external(33, Compression::Zlib)
            .write(&path)
            .unwrap();
        let mut region = RegionFile::open(&path, RegionCoordinate::new(0, 0))
            .unwrap()
            .unwrap();
        assert_matches!(region.probe(33, false), ChunkPresence::Unreadable(_));

        let bytes = chunk_nbt().to_compressed(Compression::Zlib).unwrap();
        std::fs::write(dir.join("c.1.1.mcc"), bytes).unwrap();
        assert_eq!(region.probe(33, true), ChunkPresence::Present);
    }
}
