//! Just enough NBT to tell whether a stored chunk decodes and to pull the spawn out of
//! `level.dat`. Reading is bounded: nesting depth and array lengths are checked before
//! allocating so a corrupt payload fails fast instead of exhausting memory.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as Level;
use std::collections::HashMap;
use std::io::{self, Read, Write};

/// Deepest compound/list nesting accepted while reading.
pub const MAX_DEPTH: usize = 512;

/// Largest element count accepted for any array or list.
const MAX_LEN: i32 = 1 << 24;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn checked_len<R: Read>(reader: &mut R) -> io::Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    if !(0..=MAX_LEN).contains(&length) {
        return Err(invalid(format!("Implausible length: {}", length)));
    }
    Ok(length as usize)
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    // Modified UTF-8 only differs for NUL and supplementary characters; lossy is fine here.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads one named tag.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        Self::read_named(reader, 0)
    }

    fn read_named<R: Read>(reader: &mut R, depth: usize) -> io::Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }
        let name = read_string(reader)?;
        let tag = Tag::read_payload(reader, type_id, depth)?;
        Ok((name, tag))
    }

    fn read_payload<R: Read>(reader: &mut R, type_id: u8, depth: usize) -> io::Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(invalid(format!("Nesting deeper than {}", MAX_DEPTH)));
        }
        let tag = match type_id {
            0 => Tag::End,
            1 => Tag::Byte(reader.read_i8()?),
            2 => Tag::Short(reader.read_i16::<BigEndian>()?),
            3 => Tag::Int(reader.read_i32::<BigEndian>()?),
            4 => Tag::Long(reader.read_i64::<BigEndian>()?),
            5 => Tag::Float(reader.read_f32::<BigEndian>()?),
            6 => Tag::Double(reader.read_f64::<BigEndian>()?),
            7 => {
                let mut bytes = vec![0i8; checked_len(reader)?];
                reader.read_i8_into(&mut bytes)?;
                Tag::ByteArray(bytes)
            }
            8 => Tag::String(read_string(reader)?),
            9 => {
                let element_type = reader.read_u8()?;
                let length = checked_len(reader)?;
                let mut list = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, element_type, depth + 1)?);
                }
                Tag::List(list)
            }
            10 => {
                let mut compound = HashMap::new();
                loop {
                    let (name, tag) = Tag::read_named(reader, depth + 1)?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                Tag::Compound(compound)
            }
            11 => {
                let mut ints = vec![0i32; checked_len(reader)?];
                reader.read_i32_into::<BigEndian>(&mut ints)?;
                Tag::IntArray(ints)
            }
            12 => {
                let mut longs = vec![0i64; checked_len(reader)?];
                reader.read_i64_into::<BigEndian>(&mut longs)?;
                Tag::LongArray(longs)
            }
            _ => return Err(invalid(format!("Invalid tag type: {}", type_id))),
        };
        Ok(tag)
    }

    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.type_id())?;
        if !matches!(self, Tag::End) {
            writer.write_u16::<BigEndian>(name.len() as u16)?;
            writer.write_all(name.as_bytes())?;
        }
        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                v.iter().try_for_each(|b| writer.write_i8(*b))
            }
            Tag::String(v) => {
                writer.write_u16::<BigEndian>(v.len() as u16)?;
                writer.write_all(v.as_bytes())
            }
            Tag::List(v) => {
                writer.write_u8(v.first().map(Tag::type_id).unwrap_or(0))?;
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                v.iter().try_for_each(|tag| tag.write_payload(writer))
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write(writer, name)?;
                }
                Tag::End.write(writer, "")
            }
            Tag::IntArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                v.iter().try_for_each(|i| writer.write_i32::<BigEndian>(*i))
            }
            Tag::LongArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                v.iter().try_for_each(|l| writer.write_i64::<BigEndian>(*l))
            }
        }
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Follows a chain of compound keys, e.g. `["Data", "SpawnX"]`.
    pub fn lookup(&self, path: &[&str]) -> Option<&Tag> {
        path.iter()
            .try_fold(self, |tag, key| tag.as_compound()?.get(*key))
    }

    /// Integer value of any integral tag, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Byte(n) => Some(*n as i64),
            Tag::Short(n) => Some(*n as i64),
            Tag::Int(n) => Some(*n as i64),
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }
}

/// Compression schemes used for chunk payloads inside region files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    Uncompressed,
}

impl Compression {
    /// Maps the scheme byte stored in front of each chunk payload. LZ4 (4) and custom
    /// schemes (127) are not decodable here.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Compression::Gzip),
            2 => Some(Compression::Zlib),
            3 => Some(Compression::Uncompressed),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Compression::Gzip => 1,
            Compression::Zlib => 2,
            Compression::Uncompressed => 3,
        }
    }
}

/// A root tag with its name, as stored in `level.dat` or a chunk payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub name: String,
    pub root: Tag,
}

impl NbtFile {
    pub fn new(name: &str, root: Tag) -> Self {
        Self {
            name: name.to_owned(),
            root,
        }
    }

    /// Reads an uncompressed root tag; anything but a compound is rejected.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let (name, root) = Tag::read(reader)?;
        if root.as_compound().is_none() {
            return Err(invalid(format!(
                "Root tag is type {}, expected a compound",
                root.type_id()
            )));
        }
        Ok(Self { name, root })
    }

    pub fn read_compressed(bytes: &[u8], compression: Compression) -> io::Result<Self> {
        match compression {
            Compression::Gzip => Self::read(&mut GzDecoder::new(bytes)),
            Compression::Zlib => Self::read(&mut ZlibDecoder::new(bytes)),
            Compression::Uncompressed => Self::read(&mut &bytes[..]),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn to_compressed(&self, compression: Compression) -> io::Result<Vec<u8>> {
        match compression {
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Level::default());
                self.write(&mut encoder)?;
                encoder.finish()
            }
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
                self.write(&mut encoder)?;
                encoder.finish()
            }
            Compression::Uncompressed => {
                let mut buffer = Vec::new();
                self.write(&mut buffer)?;
                Ok(buffer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn level_dat() -> NbtFile {
        let mut data = HashMap::new();
        data.insert("SpawnX".to_owned(), Tag::Int(-120));
        data.insert("SpawnZ".to_owned(), Tag::Int(40));
        data.insert("LevelName".to_owned(), Tag::String("world".to_owned()));
        let mut root = HashMap::new();
        root.insert("Data".to_owned(), Tag::Compound(data));
        NbtFile::new("", Tag::Compound(root))
    }

    #[test]
    fn test_compound_read_write() {
        let mut compound = HashMap::new();
        compound.insert("byte".to_owned(), Tag::Byte(42));
        compound.insert("longs".to_owned(), Tag::LongArray(vec![1, -2, 3]));
        compound.insert(
            "list".to_owned(),
            Tag::List(vec![Tag::Short(1), Tag::Short(2)]),
        );
        let tag = Tag::Compound(compound);

        let mut buffer = Vec::new();
        tag.write(&mut buffer, "root").unwrap();
        let (name, read_tag) = Tag::read(&mut Cursor::new(buffer)).unwrap();

        assert_eq!(name, "root");
        assert_eq!(read_tag, tag);
    }

    #[test]
    fn test_lookup_path() {
        let file = level_dat();
        assert_eq!(
            file.root.lookup(&["Data", "SpawnX"]).and_then(Tag::as_i64),
            Some(-120)
        );
        assert_eq!(file.root.lookup(&["Data", "Missing"]), None);
        assert_eq!(file.root.lookup(&["Data", "LevelName", "x"]), None);
    }

    #[test]
    fn test_every_compression_decodes() {
        let file = level_dat();
        for compression in [Compression::Gzip, Compression::Zlib, Compression::Uncompressed] {
            let bytes = file.to_compressed(compression).unwrap();
            let read = NbtFile::read_compressed(&bytes, compression).unwrap();
            assert_eq!(read, file);
        }
    }

    #[test]
    fn test_compression_ids() {
        assert_eq!(Compression::from_id(2), Some(Compression::Zlib));
        assert_eq!(Compression::from_id(4), None);
        assert_eq!(Compression::from_id(127), None);
        assert_eq!(Compression::Gzip.id(), 1);
    }

    #[test]
    fn test_non_compound_root_rejected() {
        let mut buffer = Vec::new();
        Tag::Int(7).write(&mut buffer, "").unwrap();
        assert_matches!(NbtFile::read(&mut Cursor::new(buffer)), Err(_));
    }

    #[test]
    fn test_garbage_rejected() {
        let garbage = vec![0x0A, 0x00, 0x00, 0x07, 0x00, 0x01, b'a', 0x7F, 0xFF, 0xFF, 0xFF];
        assert_matches!(NbtFile::read(&mut Cursor::new(garbage)), Err(_));

        // Truncated zlib stream
        let bytes = level_dat().to_compressed(Compression::Zlib).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert_matches!(NbtFile::read_compressed(truncated, Compression::Zlib), Err(_));
    }

    #[test]
    fn test_invalid_tag_type() {
        let result = Tag::read_payload(&mut Cursor::new(vec![0u8; 4]), 99, 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut nested = Tag::Compound(HashMap::new());
        for _ in 0..(MAX_DEPTH + 2) {
            let mut outer = HashMap::new();
            outer.insert("n".to_owned(), nested);
            nested = Tag::Compound(outer);
        }
        let mut buffer = Vec::new();
        nested.write(&mut buffer, "").unwrap();
        assert_matches!(Tag::read(&mut Cursor::new(buffer)), Err(_));
    }
}
