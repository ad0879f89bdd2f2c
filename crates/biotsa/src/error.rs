// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! One enum grouped the same way as the spec's error taxonomy: input
//! validity, codec, filter, transport, license, I/O. Every fallible
//! boundary in this crate returns [`Result`]; nothing is silently dropped.

use std::fmt;

/// Grouped error type for every subsystem in this crate.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Input validity
    // ========================================================================
    /// A time/sample slice failed conditioning (e.g. start after end).
    InvalidSlice(String),
    /// A caller-supplied flag bitmask contains bits this version doesn't know.
    UnknownFlag(u32),
    /// Requested matrix dimensions are zero or otherwise unsatisfiable.
    InvalidDimensions(String),
    /// `get_matrix` was called with no active channels.
    NoActiveChannels,
    /// The requested output element type can't hold the data (e.g. `Si2` with clipping).
    UnsupportedElementType,

    // ========================================================================
    // Codec
    // ========================================================================
    /// Block CRC did not match the computed CRC.
    CrcMismatch { offset: u64 },
    /// Header claims more bytes than were delivered.
    BlockTooShort { offset: u64, claimed: u32, have: usize },
    /// Algorithm bits in the block header match none of RED/PRED/MBE/VDS.
    UnknownAlgorithm { offset: u64, bits: u8 },
    /// VDS anchor insertion did not converge within the fixed spacing cap.
    VdsOverLimit { segment_len: usize, cap: usize },
    /// A cursor read/write ran past the end of its buffer.
    Codec(CodecError),

    // ========================================================================
    // Filter
    // ========================================================================
    /// Cutoffs are out of order or out of range for the requested filter kind.
    BadCutoffs(String),
    /// Filter order is zero or otherwise unsupported.
    BadOrder(usize),
    /// `filtfilt` input is shorter than the required padding length.
    DataTooShortForPad { data_len: usize, pad_len: usize },
    /// Filter design produced non-finite coefficients.
    FilterDesignNonFinite,

    // ========================================================================
    // Transport
    // ========================================================================
    /// Failed to open a socket.
    SocketOpenFailed(std::io::Error),
    /// Peer closed the connection mid-frame.
    SocketClosed,
    /// Transport-level I/O failure not covered by a more specific variant.
    SocketFailure(std::io::Error),
    /// Received frame's ID did not match what the caller expected.
    IdMismatch { expected: [u8; 4], got: [u8; 4] },
    /// Receive did not complete within the connection's configured timeout.
    Timeout,

    // ========================================================================
    // License
    // ========================================================================
    /// No cache entry exists for the requested product.
    NoLicense,
    /// Cache entry's timeout has elapsed and revalidation failed.
    ExpiredLicense,
    /// Cache entry's machine code does not match this host.
    WrongMachine,
    /// Server round-trip failed; caller may retry in degraded mode.
    ServerUnreachable,

    // ========================================================================
    // I/O
    // ========================================================================
    /// A file could not be opened.
    FileOpenFailed { path: String, source: std::io::Error },
    /// Fewer bytes were read than requested.
    ShortRead { wanted: usize, got: usize },
    /// Fewer bytes were written than requested.
    ShortWrite { wanted: usize, got: usize },
}

/// Errors from the bounds-checked byte cursors used by the codec layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A read ran past the end of the source buffer.
    ReadFailed { offset: usize, reason: String },
    /// A write ran past the end of the destination buffer.
    WriteFailed { offset: usize, reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Input validity
            Error::InvalidSlice(msg) => write!(f, "invalid time/sample slice: {msg}"),
            Error::UnknownFlag(bits) => write!(f, "unknown flag bits: {bits:#x}"),
            Error::InvalidDimensions(msg) => write!(f, "invalid matrix dimensions: {msg}"),
            Error::NoActiveChannels => write!(f, "no active channels for this request"),
            Error::UnsupportedElementType => write!(f, "output element type cannot hold this data"),

            // Codec
            Error::CrcMismatch { offset } => write!(f, "CRC mismatch at block offset {offset}"),
            Error::BlockTooShort { offset, claimed, have } => write!(
                f,
                "block at offset {offset} claims {claimed} bytes but only {have} were delivered"
            ),
            Error::UnknownAlgorithm { offset, bits } => write!(
                f,
                "unknown codec algorithm bits {bits:#04x} in block at offset {offset}"
            ),
            Error::VdsOverLimit { segment_len, cap } => write!(
                f,
                "VDS anchor search did not converge for {segment_len} samples (cap {cap})"
            ),
            Error::Codec(e) => write!(f, "{e}"),

            // Filter
            Error::BadCutoffs(msg) => write!(f, "bad filter cutoffs: {msg}"),
            Error::BadOrder(order) => write!(f, "unsupported filter order: {order}"),
            Error::DataTooShortForPad { data_len, pad_len } => write!(
                f,
                "filtfilt input length {data_len} is shorter than required pad length {pad_len}"
            ),
            Error::FilterDesignNonFinite => {
                write!(f, "filter design produced non-finite coefficients")
            }

            // Transport
            Error::SocketOpenFailed(e) => write!(f, "socket failed to open: {e}"),
            Error::SocketClosed => write!(f, "socket closed mid-frame"),
            Error::SocketFailure(e) => write!(f, "socket I/O failure: {e}"),
            Error::IdMismatch { expected, got } => write!(
                f,
                "frame ID mismatch: expected {:?}, got {:?}",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(got)
            ),
            Error::Timeout => write!(f, "receive timed out"),

            // License
            Error::NoLicense => write!(f, "no license cache entry for this product"),
            Error::ExpiredLicense => write!(f, "license has expired"),
            Error::WrongMachine => write!(f, "license machine code does not match this host"),
            Error::ServerUnreachable => write!(f, "license server unreachable"),

            // I/O
            Error::FileOpenFailed { path, source } => {
                write!(f, "failed to open {path}: {source}")
            }
            Error::ShortRead { wanted, got } => {
                write!(f, "short read: wanted {wanted} bytes, got {got}")
            }
            Error::ShortWrite { wanted, got } => {
                write!(f, "short write: wanted {wanted} bytes, got {got}")
            }
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {offset}: {reason}")
            }
            CodecError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {offset}: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SocketOpenFailed(e) | Error::SocketFailure(e) => Some(e),
            Error::FileOpenFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

/// Convenient alias for API results using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
