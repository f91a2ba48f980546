//! The fixed-layout frame and its async read/write helpers.
//!
//! Multibyte integers are network-byte-order (`byteorder::BigEndian`), per the §9
//! design note that replaces the reference implementation's host-byte-order struct.
//! A one-byte version tag precedes the frame so the layout can evolve later without
//! silently misparsing older peers.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Current wire format version.
pub const FRAME_VERSION: u8 = 1;
/// Fixed width of the identity field, per §6.
pub const MAX_IDENTITY_LEN: usize = 64;
/// Fixed width of the filename field, per §6.
pub const MAX_FILENAME_LEN: usize = 256;
/// Fixed width of the payload field, per §6 (the "default 8 KiB" of §4.1).
pub const MAX_PAYLOAD: usize = 8192;

const HEADER_LEN: usize = 1 + 4 + 4 + 4 + MAX_IDENTITY_LEN + MAX_FILENAME_LEN + 4;
const FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

/// A single request/response frame.
///
/// `kind`/`command`/`error` are carried as raw `i32`s rather than the typed
/// [`super::Kind`]/[`super::Command`]/[`crate::error::Error`] enums so that an unknown
/// or malformed value can still round-trip (and be rejected explicitly by the
/// dispatcher) instead of failing deep inside the framing layer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: i32,
    pub command: i32,
    pub error: i32,
    pub identity: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl Frame {
    /// Builds a request frame with no error set.
    pub fn request(kind: i32, command: i32, identity: &str, filename: &str, data: Vec<u8>) -> Self {
        Self { kind, command, error: 0, identity: identity.to_owned(), filename: filename.to_owned(), data }
    }

    /// Builds a success response frame carrying `data`.
    pub fn ok(kind: i32, command: i32, data: Vec<u8>) -> Self {
        Self { kind, command, error: 0, identity: String::new(), filename: String::new(), data }
    }

    /// Builds an error response frame.
    pub fn err(kind: i32, command: i32, error: crate::error::Error) -> Self {
        Self {
            kind,
            command,
            error: error.code(),
            identity: String::new(),
            filename: String::new(),
            data: Vec::new(),
        }
    }

    /// Interprets the payload as UTF-8 text (the `|`-delimited sub-encodings of §6).
    pub fn data_str(&self) -> &str {
        std::str::from_utf8(&self.data).unwrap_or("")
    }
}

fn write_padded(dest: &mut impl Write, s: &str, width: usize) -> io::Result<()> {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width.saturating_sub(1));
    dest.write_all(&bytes[..n])?;
    let pad = width - n;
    dest.write_all(&vec![0u8; pad])
}

fn read_padded(src: &mut impl Read, width: usize) -> io::Result<String> {
    let mut buf = vec![0u8; width];
    src.read_exact(&mut buf)?;
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..nul]).into_owned())
}

/// Serializes `frame` into the fixed-size wire layout and writes it in full.
pub async fn write_frame<W: AsyncWrite + Unpin>(sink: &mut W, frame: &Frame) -> io::Result<()> {
    if frame.identity.len() >= MAX_IDENTITY_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "identity too long"));
    }
    if frame.filename.len() >= MAX_FILENAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "filename too long"));
    }
    if frame.data.len() > MAX_PAYLOAD {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "payload exceeds frame capacity"));
    }

    let mut buf = Vec::with_capacity(FRAME_LEN);
    buf.write_u8(FRAME_VERSION)?;
    buf.write_i32::<BigEndian>(frame.kind)?;
    buf.write_i32::<BigEndian>(frame.command)?;
    buf.write_i32::<BigEndian>(frame.error)?;
    write_padded(&mut buf, &frame.identity, MAX_IDENTITY_LEN)?;
    write_padded(&mut buf, &frame.filename, MAX_FILENAME_LEN)?;
    buf.write_i32::<BigEndian>(frame.data.len() as i32)?;
    buf.extend_from_slice(&frame.data);
    buf.resize(FRAME_LEN, 0);

    sink.write_all(&buf).await?;
    sink.flush().await
}

/// Reads one full fixed-size frame. A short read (peer closed mid-frame) is
/// reported as `UnexpectedEof`, which callers treat as an availability error.
pub async fn read_frame<R: AsyncRead + Unpin>(src: &mut R) -> io::Result<Frame> {
    let mut buf = vec![0u8; FRAME_LEN];
    src.read_exact(&mut buf).await?;

    let mut cursor = Cursor::new(&buf[..]);
    let version = cursor.read_u8()?;
    if version != FRAME_VERSION {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "unsupported frame version"));
    }
    let kind = cursor.read_i32::<BigEndian>()?;
    let command = cursor.read_i32::<BigEndian>()?;
    let error = cursor.read_i32::<BigEndian>()?;
    let identity = read_padded(&mut cursor, MAX_IDENTITY_LEN)?;
    let filename = read_padded(&mut cursor, MAX_FILENAME_LEN)?;
    let data_len = cursor.read_i32::<BigEndian>()? as usize;
    if data_len > MAX_PAYLOAD {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "payload length exceeds capacity"));
    }
    let mut data = vec![0u8; data_len];
    cursor.read_exact(&mut data)?;

    Ok(Frame { kind, command, error, identity, filename, data })
}
