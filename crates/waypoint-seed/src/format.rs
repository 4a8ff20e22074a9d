//! The seed wire format.
//!
//! All integers are 32-bit big-endian; strings and byte buffers are
//! length-prefixed and not NUL-terminated on disk:
//!
//! ```text
//! magic(5)                      "KTEST", or the legacy "BOUT\n" (read-only)
//! version
//! argCount, argCount x (len, bytes)
//! [version >= 2] symArgvCount, symArgvLen
//! objectCount, objectCount x (nameLen, nameBytes, byteCount, rawBytes)
//! ```
//!
//! Decoding is all-or-nothing: any truncation or malformed field yields
//! a single error and no partial record.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Canonical magic written by `encode`.
pub const MAGIC: &[u8; 5] = b"KTEST";
/// Legacy magic accepted when reading, never written.
pub const LEGACY_MAGIC: &[u8; 5] = b"BOUT\n";
/// Format version written by `encode`. Newer versions are rejected on
/// read.
pub const CURRENT_VERSION: u32 = 3;

/// A seed decoding failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a seed file: bad magic")]
    BadMagic,

    #[error("unsupported seed version {0} (newest supported is {CURRENT_VERSION})")]
    UnsupportedVersion(u32),

    #[error("truncated seed data")]
    Truncated,

    #[error("seed string is not valid utf-8")]
    InvalidString(#[from] FromUtf8Error),

    #[error("seed i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// Result type for seed decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// One named byte buffer of a seed. Order among a record's objects is
/// significant: replay consumes them positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedObject {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SeedObject {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A decoded seed: the concrete input an exploration run starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedRecord {
    /// Version the record was read with; `encode` always writes
    /// [`CURRENT_VERSION`].
    pub version: u32,
    /// Argument vector of the run the seed describes.
    pub args: Vec<String>,
    pub sym_argv_count: u32,
    pub sym_argv_len: u32,
    pub objects: Vec<SeedObject>,
}

impl SeedRecord {
    /// Decode a record from a byte slice.
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        Self::decode_from(&mut io::Cursor::new(bytes))
    }

    /// Decode a record from a reader. Consumes exactly one record.
    pub fn decode_from(r: &mut impl Read) -> DecodeResult<Self> {
        let mut magic = [0u8; 5];
        read_exact(r, &mut magic)?;
        if magic != *MAGIC && magic != *LEGACY_MAGIC {
            return Err(DecodeError::BadMagic);
        }

        let version = read_u32(r)?;
        if version > CURRENT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let arg_count = read_u32(r)?;
        let mut args = Vec::with_capacity(capped(arg_count));
        for _ in 0..arg_count {
            args.push(read_string(r)?);
        }

        let (sym_argv_count, sym_argv_len) = if version >= 2 {
            (read_u32(r)?, read_u32(r)?)
        } else {
            (0, 0)
        };

        let object_count = read_u32(r)?;
        let mut objects = Vec::with_capacity(capped(object_count));
        for _ in 0..object_count {
            let name = read_string(r)?;
            let byte_count = read_u32(r)?;
            let bytes = read_buffer(r, byte_count)?;
            objects.push(SeedObject { name, bytes });
        }

        Ok(Self {
            version,
            args,
            sym_argv_count,
            sym_argv_len,
            objects,
        })
    }

    /// Encode the record, always at [`CURRENT_VERSION`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.num_bytes() + 64);
        // Writing to a Vec cannot fail.
        self.encode_to(&mut out).expect("vec write");
        out
    }

    /// Encode the record to a writer.
    pub fn encode_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(MAGIC)?;
        write_u32(w, CURRENT_VERSION)?;

        write_u32(w, self.args.len() as u32)?;
        for arg in &self.args {
            write_string(w, arg)?;
        }

        write_u32(w, self.sym_argv_count)?;
        write_u32(w, self.sym_argv_len)?;

        write_u32(w, self.objects.len() as u32)?;
        for object in &self.objects {
            write_string(w, &object.name)?;
            write_u32(w, object.bytes.len() as u32)?;
            w.write_all(&object.bytes)?;
        }
        Ok(())
    }

    /// Read a record from a seed file.
    pub fn from_file(path: impl AsRef<Path>) -> DecodeResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::decode_from(&mut reader)
    }

    /// Write the record to a seed file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.encode_to(&mut writer)?;
        writer.flush()
    }

    /// Total payload bytes across all objects.
    pub fn num_bytes(&self) -> usize {
        self.objects.iter().map(|o| o.bytes.len()).sum()
    }
}

/// Whether the file starts with an accepted seed magic.
pub fn is_seed_file(path: impl AsRef<Path>) -> bool {
    let mut magic = [0u8; 5];
    match File::open(path) {
        Ok(mut f) => {
            f.read_exact(&mut magic).is_ok() && (magic == *MAGIC || magic == *LEGACY_MAGIC)
        }
        Err(_) => false,
    }
}

/// Initial allocation cap: declared counts are untrusted until the
/// bytes backing them have actually been read.
fn capped(count: u32) -> usize {
    (count as usize).min(4096)
}

fn read_exact(r: &mut impl Read, buf: &mut [u8]) -> DecodeResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::Truncated,
        _ => DecodeError::Io(e),
    })
}

fn read_u32(r: &mut impl Read) -> DecodeResult<u32> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read exactly `len` bytes, growing with the data actually present so
/// a hostile length cannot force a huge up-front allocation.
fn read_buffer(r: &mut impl Read, len: u32) -> DecodeResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(capped(len));
    let read = (&mut *r).take(u64::from(len)).read_to_end(&mut buf)?;
    if read < len as usize {
        return Err(DecodeError::Truncated);
    }
    Ok(buf)
}

fn read_string(r: &mut impl Read) -> DecodeResult<String> {
    let len = read_u32(r)?;
    Ok(String::from_utf8(read_buffer(r, len)?)?)
}

fn write_u32(w: &mut impl Write, value: u32) -> io::Result<()> {
    w.write_all(&value.to_be_bytes())
}

fn write_string(w: &mut impl Write, value: &str) -> io::Result<()> {
    write_u32(w, value.len() as u32)?;
    w.write_all(value.as_bytes())
}
