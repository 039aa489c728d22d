//! Byte-stream encoding of build identity.
//!
//! The record layout is stable across versions and may be read by components
//! built independently of this crate:
//!
//! ```text
//! [nullable string: build name][string: absolute root dir, only when the name is present]
//! ```
//!
//! A *string* is an unsigned LEB128 byte length followed by UTF-8 bytes. A
//! *nullable string* is a marker byte (`0` absent, `1` present) followed by a
//! string when present.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{BuildlinkError, Result};
use crate::identity::{BuildIdentifier, BuildIdentity};

pub const DEFAULT_MAX_STRING_LEN: usize = 1024 * 1024;

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

// ------------- Encoder -------------
pub struct Encoder<W: Write> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let mut len = value.len() as u64;
        loop {
            let byte = (len & 0x7f) as u8;
            len >>= 7;
            if len == 0 {
                self.writer.write_all(&[byte])?;
                break;
            }
            self.writer.write_all(&[byte | 0x80])?;
        }
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }
    pub fn write_nullable_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.writer.write_all(&[ABSENT])?,
            Some(s) => {
                self.writer.write_all(&[PRESENT])?;
                self.write_string(s)?;
            }
        }
        Ok(())
    }
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
    pub fn into_inner(self) -> W {
        self.writer
    }
}

// ------------- Decoder -------------
pub struct Decoder<R: Read> {
    reader: R,
    max_string_len: usize,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_string_len(reader, DEFAULT_MAX_STRING_LEN)
    }
    pub fn with_max_string_len(reader: R, max_string_len: usize) -> Self {
        Self { reader, max_string_len }
    }
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }
    fn read_length(&mut self) -> Result<usize> {
        let mut len: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.read_byte()?;
            // the tenth byte holds only bit 63
            if shift == 63 && byte & 0x7f > 1 {
                return Err(BuildlinkError::MalformedStream("string length overflows 64 bits".into()));
            }
            len |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return usize::try_from(len)
                    .map_err(|_| BuildlinkError::MalformedStream(format!("string length {len} overflows")));
            }
        }
        Err(BuildlinkError::MalformedStream("string length varint is too long".into()))
    }
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_length()?;
        if len > self.max_string_len {
            return Err(BuildlinkError::MalformedStream(format!(
                "string length {} exceeds the limit of {}",
                len, self.max_string_len
            )));
        }
        let mut bytes = Vec::with_capacity(len);
        (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;
        if bytes.len() < len {
            return Err(BuildlinkError::MalformedStream(format!(
                "truncated string: expected {} bytes, found {}",
                len,
                bytes.len()
            )));
        }
        String::from_utf8(bytes)
            .map_err(|e| BuildlinkError::MalformedStream(format!("string is not valid UTF-8: {e}")))
    }
    pub fn read_nullable_string(&mut self) -> Result<Option<String>> {
        match self.read_byte()? {
            ABSENT => Ok(None),
            PRESENT => self.read_string().map(Some),
            other => Err(BuildlinkError::MalformedStream(format!(
                "unexpected nullable string marker {other:#04x}"
            ))),
        }
    }
    pub fn into_inner(self) -> R {
        self.reader
    }
}

// ------------- Serializer -------------
pub trait Serializer<T> {
    fn read<R: Read>(&self, decoder: &mut Decoder<R>) -> Result<T>;
    fn write<W: Write>(&self, encoder: &mut Encoder<W>, value: &T) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildIdentitySerializer;

impl BuildIdentitySerializer {
    /// Writes any build identifier, refusing values that are not canonical.
    pub fn write_identifier<W: Write, B: BuildIdentifier + ?Sized>(
        &self,
        encoder: &mut Encoder<W>,
        value: &B,
    ) -> Result<()> {
        if value.is_current_build() {
            if let Some(name) = value.name() {
                return Err(BuildlinkError::InvariantViolation(format!(
                    "current build must not carry a name, found '{name}'"
                )));
            }
            return encoder.write_nullable_string(None);
        }
        let name = match value.name() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(BuildlinkError::InvariantViolation(
                    "named build without a name".into(),
                ));
            }
        };
        let root_dir = value.root_dir().ok_or_else(|| {
            BuildlinkError::InvariantViolation(format!("build '{name}' has no root directory"))
        })?;
        let root_dir = absolute_path_string(name, root_dir)?;
        encoder.write_nullable_string(Some(name))?;
        encoder.write_string(&root_dir)
    }
}

fn absolute_path_string<'p>(name: &str, root_dir: &'p Path) -> Result<&'p str> {
    if root_dir.as_os_str().is_empty() || !root_dir.is_absolute() {
        return Err(BuildlinkError::InvariantViolation(format!(
            "root directory of build '{}' must be absolute, got '{}'",
            name,
            root_dir.display()
        )));
    }
    root_dir.to_str().ok_or_else(|| {
        BuildlinkError::InvariantViolation(format!(
            "root directory of build '{}' is not valid UTF-8",
            name
        ))
    })
}

impl Serializer<BuildIdentity> for BuildIdentitySerializer {
    fn read<R: Read>(&self, decoder: &mut Decoder<R>) -> Result<BuildIdentity> {
        let name = match decoder.read_nullable_string()? {
            None => return Ok(BuildIdentity::Current),
            Some(name) => name,
        };
        let root_dir = PathBuf::from(decoder.read_string()?);
        BuildIdentity::named(name, root_dir).map_err(|e| match e {
            BuildlinkError::InvariantViolation(msg) => BuildlinkError::MalformedStream(msg),
            other => other,
        })
    }
    fn write<W: Write>(&self, encoder: &mut Encoder<W>, value: &BuildIdentity) -> Result<()> {
        self.write_identifier(encoder, value)
    }
}

/// Encodes one identity record into a fresh buffer.
pub fn encode_build_identity(value: &BuildIdentity) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    BuildIdentitySerializer.write(&mut encoder, value)?;
    Ok(encoder.into_inner())
}

/// Decodes one identity record from the start of `bytes`.
pub fn decode_build_identity(bytes: &[u8]) -> Result<BuildIdentity> {
    let mut decoder = Decoder::new(bytes);
    BuildIdentitySerializer.read(&mut decoder)
}
