use std::io;

use thiserror::Error;

/// Errors produced while opening or querying a bigWig/bigBed file.
#[derive(Error, Debug)]
pub enum BBIError {
    /// The file's magic number matches neither endian form of the expected
    /// format constant. The handle is not cached.
    #[error("invalid magic number 0x{0:08X} (not a bigWig or bigBed file)")]
    InvalidMagic(u32),
    /// A secondary structure (chromosome B+ tree, R+ tree) was missing its
    /// magic, or a header field produced an impossible offset.
    #[error("malformed file: {0}")]
    MalformedFile(String),
    /// The requested chromosome is not present in the file's B+ tree.
    #[error("chromosome {0} not found")]
    UnknownChromosome(String),
    /// The range request failed, timed out, or returned a non-success status.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The response body held fewer bytes than the `Range` header asked for.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    /// The zlib stream inside a data block was malformed.
    #[error("decompression failed: {0}")]
    Decompress(#[source] io::Error),
    /// A read ran past the end of an in-memory buffer. Decoders for
    /// variable-length blocks use this as their end-of-block signal.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    /// A record inside a block did not conform to its declared schema.
    #[error("malformed record: {0}")]
    Decode(String),
}
