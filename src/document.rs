//! Read and write pre-processed documents
//!
//! A document is an ordered list of normalized tokens, stored one per file. The layout is:
//!
//! ```text
//! PLDOC          magic, 5 bytes
//! 0x01           format version
//! u32 LE         number of tokens
//! (u32 LE, utf8) for each token, its length in bytes and then the bytes
//! ```
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use unicode_segmentation::UnicodeSegmentation;
use crate::errors::*;

const MAGIC: &[u8; 5] = b"PLDOC";
pub const FORMAT_VERSION: u8 = 1;
/// Refuse absurd lengths from corrupted files rather than allocating them
const MAX_TOKEN_BYTES: u32 = 1 << 16;

/// Write a document to any writer. Nothing is written if a token is too long.
pub fn encode<W: Write>(writer: &mut W, tokens: &[String]) -> Result<()> {
    if let Some(token) = tokens.iter().find(|token| token.len() > MAX_TOKEN_BYTES as usize) {
        return Err(Error::InvalidDocument(format!(
            "token of {} bytes is longer than the limit of {}", token.len(), MAX_TOKEN_BYTES)));
    }
    writer.write_all(MAGIC)?;
    writer.write_u8(FORMAT_VERSION)?;
    writer.write_u32::<LittleEndian>(tokens.len() as u32)?;
    for token in tokens {
        writer.write_u32::<LittleEndian>(token.len() as u32)?;
        writer.write_all(token.as_bytes())?;
    }
    Ok(())
}

/// Read a document from any reader
pub fn decode<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic).map_err(truncated)?;
    if &magic != MAGIC {
        return Err(Error::InvalidDocument(format!(
            "expected the magic bytes {:?} but found {:?}", MAGIC, magic)));
    }
    let version = reader.read_u8().map_err(truncated)?;
    if version != FORMAT_VERSION {
        return Err(Error::InvalidDocument(format!(
            "format version {} is not supported (only {})", version, FORMAT_VERSION)));
    }
    let count = reader.read_u32::<LittleEndian>().map_err(truncated)?;
    // Don't trust the count for the allocation, the file may be cut short
    let mut tokens = Vec::with_capacity(::std::cmp::min(count, 4096) as usize);
    for _ in 0..count {
        let len = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if len > MAX_TOKEN_BYTES {
            return Err(Error::InvalidDocument(format!("token length {} is too large", len)));
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf).map_err(truncated)?;
        let token = String::from_utf8(buf)
            .map_err(|e| Error::InvalidDocument(format!("token is not utf-8: {}", e)))?;
        tokens.push(token);
    }
    Ok(tokens)
}

fn truncated(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::InvalidDocument("the document ends early".to_string())
    } else {
        Error::IOError(err)
    }
}

/// Write one document file, replacing whatever was there
///
/// The old file stays as it was if anything goes wrong.
pub fn write_document<P: AsRef<Path>>(path: P, tokens: &[String]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(parent_of(path.as_ref()))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        encode(&mut writer, tokens)?;
        writer.flush()?;
    }
    temp.persist(path)?;
    Ok(())
}

/// Directory to stage a replacement for `path` in
pub(crate) fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Read one document file
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    decode(&mut reader)
}

/// Lowercased unicode words, punctuation and whitespace dropped
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|word| word.to_lowercase())
        .collect()
}
