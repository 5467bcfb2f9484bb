//! Beam wire protocol implementation.
//!
//! Beam speaks a minimal binary protocol over a single TCP stream. All
//! multi-byte integers are big-endian; strings are raw bytes behind an
//! explicit u64 length prefix, never padded and never delimited.
//!
//! ## Session layout
//!
//! ```text
//! listener (sender)                      dialer (receiver)
//! ─────────────────                      ─────────────────
//!   accept/reject signal (1 byte)  ──►
//!                                  ◄──   proposed chunk size (8 bytes)
//!   negotiated chunk size (8)      ──►
//!                                  ◄──   receiver-ready signal (1 byte)
//!   filename length (8)            ──►
//!   filename bytes (N)             ──►
//!   permission bits (4)            ──►
//!   chunk count (8)                ──►
//!   last-chunk length (8)          ──►
//!   file data, chunk by chunk      ──►
//! ```
//!
//! The data phase carries no per-chunk framing: both sides walk the same
//! chunk count in lockstep, and the final chunk carries exactly
//! `last_chunk_len` bytes — padding is never transmitted.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// Upper bound on the filename-length field. Anything beyond this is a
/// corrupt or hostile stream, not a real filename.
pub const MAX_FILENAME_LEN: u64 = 1024;

/// Accept/reject signal exchanged during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Signal {
    /// The peer turned the session down
    Rejected = 0,
    /// The peer accepted and the session proceeds
    Accepted = 1,
}

impl Signal {
    /// Parse a signal from a byte. Only 0 and 1 are in the domain.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Rejected),
            1 => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// Read a single byte.
pub async fn read_u8<R>(reader: &mut R) -> Result<u8>
where
    R: AsyncReadExt + Unpin,
{
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).await?;
    Ok(buf[0])
}

/// Write a single byte.
pub async fn write_u8<W>(writer: &mut W, v: u8) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&[v]).await?;
    Ok(())
}

/// Read a big-endian u32.
pub async fn read_u32<R>(reader: &mut R) -> Result<u32>
where
    R: AsyncReadExt + Unpin,
{
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await?;
    Ok(u32::from_be_bytes(buf))
}

/// Write a big-endian u32.
pub async fn write_u32<W>(writer: &mut W, v: u32) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&v.to_be_bytes()).await?;
    Ok(())
}

/// Read a big-endian u64.
pub async fn read_u64<R>(reader: &mut R) -> Result<u64>
where
    R: AsyncReadExt + Unpin,
{
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).await?;
    Ok(u64::from_be_bytes(buf))
}

/// Write a big-endian u64.
pub async fn write_u64<W>(writer: &mut W, v: u64) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&v.to_be_bytes()).await?;
    Ok(())
}

/// Read a handshake signal, failing on out-of-domain bytes.
pub async fn read_signal<R>(reader: &mut R) -> Result<Signal>
where
    R: AsyncReadExt + Unpin,
{
    let byte = read_u8(reader).await?;
    Signal::from_byte(byte).ok_or(Error::UnexpectedSignal(byte))
}

/// Write a handshake signal and flush it, so a one-byte verdict is not
/// left sitting in a write buffer while the peer blocks on it.
pub async fn write_signal<W>(writer: &mut W, signal: Signal) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    write_u8(writer, signal as u8).await?;
    writer.flush().await?;
    Ok(())
}

/// How a file of a given size splits into chunks of a given size.
///
/// `last_chunk_len` is the number of valid bytes in the final chunk:
/// between 1 and `chunk_size` for non-empty files, and exactly
/// `chunk_size` when the size is a positive multiple of the chunk size.
/// An empty file has zero chunks, and the data phase is skipped
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Number of chunks, `ceil(size / chunk_size)`
    pub chunk_count: u64,
    /// Valid bytes in the final chunk
    pub last_chunk_len: u64,
}

impl ChunkLayout {
    /// Compute the layout for a file of `size` bytes at `chunk_size`.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero; negotiation rejects that before
    /// any layout is computed.
    #[must_use]
    pub fn compute(size: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be at least 1");

        let chunk_count = size.div_ceil(chunk_size);
        let last_chunk_len = if chunk_count == 0 {
            0
        } else {
            size - (chunk_count - 1) * chunk_size
        };

        Self {
            chunk_count,
            last_chunk_len,
        }
    }

    /// Check a layout received off the wire against the negotiated
    /// chunk size before trusting its arithmetic.
    ///
    /// A peer following the protocol derives both fields from the same
    /// negotiation, so an out-of-range `last_chunk_len` or a chunk
    /// count whose total size overflows is protocol confusion, not a
    /// file shape.
    pub fn validate(&self, chunk_size: u64) -> Result<()> {
        if self.chunk_count == 0 {
            if self.last_chunk_len != 0 {
                return Err(Error::Protocol(format!(
                    "zero chunks but a last-chunk length of {}",
                    self.last_chunk_len
                )));
            }
            return Ok(());
        }

        if self.last_chunk_len == 0 || self.last_chunk_len > chunk_size {
            return Err(Error::Protocol(format!(
                "last-chunk length {} outside 1..={chunk_size}",
                self.last_chunk_len
            )));
        }

        if (self.chunk_count - 1)
            .checked_mul(chunk_size)
            .and_then(|bytes| bytes.checked_add(self.last_chunk_len))
            .is_none()
        {
            return Err(Error::Protocol(format!(
                "chunk count {} at chunk size {chunk_size} overflows the file size",
                self.chunk_count
            )));
        }

        Ok(())
    }

    /// Valid bytes in chunk `index` (zero-based).
    #[must_use]
    pub fn chunk_len(&self, index: u64, chunk_size: u64) -> u64 {
        if index + 1 == self.chunk_count {
            self.last_chunk_len
        } else {
            chunk_size
        }
    }

    /// Total file size this layout describes.
    #[must_use]
    pub fn total_bytes(&self, chunk_size: u64) -> u64 {
        if self.chunk_count == 0 {
            0
        } else {
            (self.chunk_count - 1) * chunk_size + self.last_chunk_len
        }
    }
}

/// Metadata describing the one file a session transfers.
///
/// Built once on the sending side from a filesystem stat, written to the
/// wire immediately, and read back into an equivalent structure on the
/// receiving side. Field order and widths on the wire are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManifest {
    /// Base name of the file, without any directory components
    pub file_name: String,
    /// Raw permission bits of the source file
    pub mode: u32,
    /// Chunk layout the sender derived from the negotiated chunk size
    pub layout: ChunkLayout,
}

impl FileManifest {
    /// Write the manifest fields in wire order.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWriteExt + Unpin,
    {
        let name = self.file_name.as_bytes();
        write_u64(writer, name.len() as u64).await?;
        writer.write_all(name).await?;
        write_u32(writer, self.mode).await?;
        write_u64(writer, self.layout.chunk_count).await?;
        write_u64(writer, self.layout.last_chunk_len).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read a manifest in wire order, validating the filename.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the filename length exceeds
    /// [`MAX_FILENAME_LEN`], and an `InvalidFileName` error if the bytes
    /// are not UTF-8 or name anything other than a bare file.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncReadExt + Unpin,
    {
        let name_len = read_u64(reader).await?;
        if name_len == 0 || name_len > MAX_FILENAME_LEN {
            return Err(Error::Protocol(format!(
                "filename length {name_len} outside 1..={MAX_FILENAME_LEN}"
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let mut name_buf = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_buf).await?;
        let file_name = String::from_utf8(name_buf)
            .map_err(|_| Error::InvalidFileName("not valid UTF-8".to_string()))?;
        validate_file_name(&file_name)?;

        let mode = read_u32(reader).await?;
        let chunk_count = read_u64(reader).await?;
        let last_chunk_len = read_u64(reader).await?;

        Ok(Self {
            file_name,
            mode,
            layout: ChunkLayout {
                chunk_count,
                last_chunk_len,
            },
        })
    }
}

/// Reject filenames that would escape the destination directory.
///
/// The wire carries a base name only; a peer sending separators or
/// parent references is not following the protocol.
fn validate_file_name(name: &str) -> Result<()> {
    if name == "." || name == ".." {
        return Err(Error::InvalidFileName(format!("'{name}'")));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(Error::InvalidFileName(format!(
            "'{name}' contains path separators"
        )));
    }
    Ok(())
}

/// Listener side of chunk-size negotiation.
///
/// Reads the receiver's proposal, picks the minimum of it and our own
/// preference, echoes the result, and waits for the receiver-ready
/// signal confirming the receiver agrees.
pub async fn negotiate_chunk_size_listener<S>(stream: &mut S, own: u64) -> Result<u64>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    let proposed = read_u64(stream).await?;
    if proposed == 0 {
        return Err(Error::Protocol("peer proposed a zero chunk size".to_string()));
    }

    let negotiated = own.min(proposed);
    if negotiated < own {
        tracing::info!(
            proposed,
            negotiated,
            "receiver uses a smaller chunk size, adopting it"
        );
    }
    write_u64(stream, negotiated).await?;
    stream.flush().await?;

    match read_signal(stream).await? {
        Signal::Accepted => Ok(negotiated),
        Signal::Rejected => Err(Error::NegotiationDeclined),
    }
}

/// Dialer side of chunk-size negotiation.
///
/// Sends our proposal and validates the echo: a peer that hands back a
/// larger (or zero) chunk size is not running this protocol, and we
/// signal rejection rather than read file data with an inconsistent
/// unit size.
pub async fn negotiate_chunk_size_dialer<S>(stream: &mut S, proposed: u64) -> Result<u64>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    write_u64(stream, proposed).await?;
    stream.flush().await?;

    let returned = read_u64(stream).await?;
    if returned == 0 || returned > proposed {
        write_signal(stream, Signal::Rejected).await?;
        return Err(Error::ChunkSizeRejected { proposed, returned });
    }

    write_signal(stream, Signal::Accepted).await?;
    Ok(returned)
}
