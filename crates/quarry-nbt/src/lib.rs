use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use std::io::{Read, Write};

mod compound;
mod error;

pub use compound::{CompoundReader, Tolerance};
pub use error::{NbtError, Result};

/// Named entries of a compound tag, in stream order.
pub type Compound = IndexMap<String, Tag>;

/// Deepest nesting of lists and compounds accepted while decoding. Sized so
/// a fully nested tree still decodes on a 2 MiB thread in debug builds.
pub const MAX_DEPTH: usize = 128;

// Upper bound on speculative allocation driven by a declared length.
const PREALLOCATION_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
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

    pub fn type_name(&self) -> &'static str {
        match self {
            Tag::End => "end",
            Tag::Byte(_) => "byte",
            Tag::Short(_) => "short",
            Tag::Int(_) => "int",
            Tag::Long(_) => "long",
            Tag::Float(_) => "float",
            Tag::Double(_) => "double",
            Tag::ByteArray(_) => "byte array",
            Tag::String(_) => "string",
            Tag::List(_) => "list",
            Tag::Compound(_) => "compound",
            Tag::IntArray(_) => "int array",
            Tag::LongArray(_) => "long array",
        }
    }

    /// Reads one named tag. A lone end tag yields an empty name and `Tag::End`.
    pub fn read<R: Read>(reader: &mut R) -> Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }
        check_type_id(type_id)?;

        let name = read_string(reader)?;
        let tag = Tag::read_payload(reader, type_id, 0)?;
        Ok((name, tag))
    }

    // Only lists and compounds recurse. Keep their frames small: a debug build
    // has to fit MAX_DEPTH levels on a 2 MiB worker stack.
    fn read_payload<R: Read>(reader: &mut R, type_id: u8, depth: usize) -> Result<Tag> {
        match type_id {
            9 => Tag::read_list(reader, enter(depth)?),
            10 => Tag::read_compound(reader, enter(depth)?),
            _ => read_flat_payload(reader, type_id),
        }
    }

    fn read_list<R: Read>(reader: &mut R, depth: usize) -> Result<Tag> {
        let (list_type, length) = read_list_header(reader)?;
        let mut list = Vec::with_capacity(length.min(PREALLOCATION_LIMIT));
        for _ in 0..length {
            list.push(Tag::read_payload(reader, list_type, depth)?);
        }
        Ok(Tag::List(list))
    }

    fn read_compound<R: Read>(reader: &mut R, depth: usize) -> Result<Tag> {
        let mut compound = Compound::new();
        loop {
            let type_id = reader.read_u8()?;
            if type_id == 0 {
                return Ok(Tag::Compound(compound));
            }
            check_type_id(type_id)?;
            let name = read_string(reader)?;
            let tag = Tag::read_payload(reader, type_id, depth)?;
            compound.insert(name, tag);
        }
    }

    /// Writes this tag as a named entry. `Tag::End` is written as a bare type byte.
    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_string(writer, name)?;
        }

        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Tag::List(list) => {
                write_list_header(writer, list)?;
                for tag in list {
                    tag.write_payload(writer)?;
                }
            }
            Tag::Compound(compound) => {
                for (name, tag) in compound {
                    if let Tag::End = tag {
                        return Err(end_entry(name));
                    }
                    writer.write_u8(tag.get_type_id())?;
                    write_string(writer, name)?;
                    tag.write_payload(writer)?;
                }
                writer.write_u8(0)?;
            }
            flat => write_flat_payload(writer, flat)?,
        }
        Ok(())
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Tag>> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }
}

fn enter(depth: usize) -> Result<usize> {
    if depth >= MAX_DEPTH {
        return Err(NbtError::DepthLimit(MAX_DEPTH));
    }
    Ok(depth + 1)
}

fn check_type_id(type_id: u8) -> Result<()> {
    if type_id > 12 {
        return Err(NbtError::InvalidTag(type_id));
    }
    Ok(())
}

#[inline(never)]
fn read_list_header<R: Read>(reader: &mut R) -> Result<(u8, usize)> {
    let list_type = reader.read_u8()?;
    let length = reader.read_u32::<BigEndian>()? as usize;
    if list_type > 12 || (list_type == 0 && length > 0) {
        return Err(NbtError::InvalidTag(list_type));
    }
    Ok((list_type, length))
}

/// Payloads that never contain other tags.
#[inline(never)]
fn read_flat_payload<R: Read>(reader: &mut R, type_id: u8) -> Result<Tag> {
    match type_id {
        0 => Ok(Tag::End),
        1 => Ok(Tag::Byte(reader.read_i8()?)),
        2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
        3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
        4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
        5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
        6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
        7 => {
            let length = reader.read_u32::<BigEndian>()? as usize;
            let mut bytes = Vec::with_capacity(length.min(PREALLOCATION_LIMIT));
            reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
            if bytes.len() != length {
                return Err(NbtError::TruncatedData(format!(
                    "byte array declares {} bytes, stream holds {}",
                    length,
                    bytes.len()
                )));
            }
            Ok(Tag::ByteArray(bytes))
        }
        8 => Ok(Tag::String(read_string(reader)?)),
        11 => {
            let length = reader.read_u32::<BigEndian>()? as usize;
            let mut ints = Vec::with_capacity(length.min(PREALLOCATION_LIMIT));
            for _ in 0..length {
                ints.push(reader.read_i32::<BigEndian>()?);
            }
            Ok(Tag::IntArray(ints))
        }
        12 => {
            let length = reader.read_u32::<BigEndian>()? as usize;
            let mut longs = Vec::with_capacity(length.min(PREALLOCATION_LIMIT));
            for _ in 0..length {
                longs.push(reader.read_i64::<BigEndian>()?);
            }
            Ok(Tag::LongArray(longs))
        }
        _ => Err(NbtError::InvalidTag(type_id)),
    }
}

#[inline(never)]
fn write_list_header<W: Write>(writer: &mut W, list: &[Tag]) -> Result<()> {
    writer.write_u8(list_element_type(list)?)?;
    write_length(writer, list.len(), "list")
}

#[inline(never)]
fn write_flat_payload<W: Write>(writer: &mut W, tag: &Tag) -> Result<()> {
    match tag {
        Tag::End => {}
        Tag::Byte(v) => writer.write_i8(*v)?,
        Tag::Short(v) => writer.write_i16::<BigEndian>(*v)?,
        Tag::Int(v) => writer.write_i32::<BigEndian>(*v)?,
        Tag::Long(v) => writer.write_i64::<BigEndian>(*v)?,
        Tag::Float(v) => writer.write_f32::<BigEndian>(*v)?,
        Tag::Double(v) => writer.write_f64::<BigEndian>(*v)?,
        Tag::ByteArray(v) => {
            write_length(writer, v.len(), "byte array")?;
            writer.write_all(v)?;
        }
        Tag::String(v) => write_string(writer, v)?,
        Tag::IntArray(v) => {
            write_length(writer, v.len(), "int array")?;
            for &i in v {
                writer.write_i32::<BigEndian>(i)?;
            }
        }
        Tag::LongArray(v) => {
            write_length(writer, v.len(), "long array")?;
            for &l in v {
                writer.write_i64::<BigEndian>(l)?;
            }
        }
        Tag::List(_) | Tag::Compound(_) => {
            return Err(NbtError::UnsupportedType(format!(
                "{} is not a flat payload",
                tag.type_name()
            )))
        }
    }
    Ok(())
}

#[inline(never)]
fn end_entry(name: &str) -> NbtError {
    NbtError::UnsupportedType(format!("end tag as compound entry `{}`", name))
}

/// A list carries one element type, so every element must share the first one's.
fn list_element_type(list: &[Tag]) -> Result<u8> {
    let Some(first) = list.first() else {
        return Ok(0);
    };
    if let Tag::End = first {
        return Err(NbtError::UnsupportedType("list of end tags".to_owned()));
    }
    let element_type = first.get_type_id();
    if let Some(other) = list.iter().find(|tag| tag.get_type_id() != element_type) {
        return Err(NbtError::UnsupportedType(format!(
            "mixed list of {} and {}",
            first.type_name(),
            other.type_name()
        )));
    }
    Ok(element_type)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let length = u16::try_from(value.len()).map_err(|_| {
        NbtError::UnsupportedType(format!("string of {} bytes", value.len()))
    })?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn write_length<W: Write>(writer: &mut W, length: usize, kind: &str) -> Result<()> {
    let length = u32::try_from(length)
        .map_err(|_| NbtError::UnsupportedType(format!("{} of {} elements", kind, length)))?;
    writer.write_u32::<BigEndian>(length)?;
    Ok(())
}

/// A complete tagged tree: one named root tag.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub root: Tag,
    pub name: String,
}

impl NbtFile {
    pub fn new(name: String, root: Tag) -> Self {
        NbtFile { root, name }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let (name, root) = Tag::read(reader)?;
        Ok(NbtFile { root, name })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        Self::read(&mut decoder)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    /// Serializes into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(buffer)
    }
}
