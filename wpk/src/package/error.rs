// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! This module provides the error definitions for errors that can occur within the building, encoding,
//! decoding and verification of web package (.wpk) files.
//!
//! The five codec failure kinds are kept as separate types, so that callers can tell a malformed byte
//! stream ([ReaderError]) from a badly ordered one ([ParserError]), from one that simply stopped early
//! ([TruncationError]), and from a well-formed package that fails its signature check
//! ([VerificationError]). The first four travel inside [Error]. A [VerificationError] only arises once a
//! package is complete, and is returned on its own.

use super::token::TokenKind;
use thiserror::Error;

/// Top-level error type for the package module.
#[derive(Error, Debug)]
pub enum Error {
    /// An error that has been re-badged from the `std::io` subsystem. This kind of error might arise
    /// when a content stream or content sink fails while a package is being encoded or decoded.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// A field value failed validation before it could be encoded.
    #[error(transparent)]
    FormatError(#[from] FormatError),

    /// The byte stream being decoded is lexically malformed.
    #[error(transparent)]
    ReaderError(#[from] ReaderError),

    /// The byte stream being decoded contains well-formed tokens in an order the grammar forbids.
    #[error(transparent)]
    ParserError(#[from] ParserError),

    /// The byte stream ended before the package was complete.
    #[error(transparent)]
    TruncationError(#[from] TruncationError),

    /// Error coming from the key material used to sign or verify a package.
    #[cfg(feature = "key-management")]
    #[error(transparent)]
    KeyError(#[from] crate::keys::error::KeyError),
}

/// A field value does not satisfy the rules of its frame. These errors are raised before any bytes of the
/// offending frame are produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid content encoding: {0}")]
    InvalidContentEncoding(String),

    #[error("The build date {0} is outside the years 0000 to 9999.")]
    BuildDateOutOfRange(String),

    #[error("Invalid content length: {0}. Content lengths must be below 2^24.")]
    ContentLengthOutOfRange(u64),

    #[error("The content of {file_name} does not have the declared length of {declared} bytes.")]
    ContentLengthMismatch { file_name: String, declared: u32 },

    #[error("The certificate is {0} bytes long, but at most 65535 bytes can be embedded.")]
    CertificateTooLarge(usize),

    #[error("The signature is {0} bytes long, but at most 255 bytes can be embedded.")]
    SignatureTooLarge(usize),

    #[error("The file {0} already exists in the package.")]
    DuplicateFileName(String),

    #[error("The file {0} has no content hash, which is required for signing.")]
    MissingContentHash(String),

    #[error("The content of {0} is detached and cannot be encoded.")]
    DetachedContent(String),

    #[error("The next frame is {frame_length} bytes long, but the sink only holds {capacity} bytes.")]
    SinkTooSmall { frame_length: usize, capacity: usize },
}

/// A lexical error, with the absolute byte offset (counted from the first byte fed into the session) of
/// the frame in which it was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (frame at byte offset {offset})")]
pub struct ReaderError {
    pub kind: ReaderErrorKind,
    pub offset: u64,
}

/// The reasons a byte stream can be lexically malformed. String payloads carry the offending bytes with
/// non-printable characters escaped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderErrorKind {
    #[error("Unknown token 0x{0:02X}")]
    UnknownToken(u8),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid build date: {0}")]
    InvalidBuildDate(String),

    #[error("Invalid content encoding: {0}")]
    InvalidContentEncoding(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Unexpected bytes after the end of the package")]
    TrailingBytes,
}

/// Well-lexed tokens arrived in an order that the grammar does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Unexpected token {found}, expected {}", alternatives(.expected))]
    UnexpectedToken {
        found: TokenKind,
        expected: &'static [TokenKind],
    },

    #[error("The file {0} appears more than once in the package.")]
    DuplicateFileName(String),
}

/// The input was flagged as complete while the package was not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TruncationError {
    #[error("The input ended inside a {frame} frame at byte offset {offset}.")]
    MidFrame { frame: TokenKind, offset: u64 },

    #[error("The input ended at byte offset {offset}, expecting {}", alternatives(.expected))]
    MidPackage {
        offset: u64,
        expected: &'static [TokenKind],
    },
}

/// The package is structurally valid, but cannot be shown to come from the holder of the signing key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("The package is not signed.")]
    Unsigned,

    #[error("The package signature does not match its contents.")]
    SignatureMismatch,

    #[error("The file {0} has no content hash, so its content is not covered by the signature.")]
    MissingContentHash(String),

    #[error("The content of {0} does not match its content hash.")]
    ContentHashMismatch(String),
}

fn alternatives(kinds: &[TokenKind]) -> String {
    let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
    names.join(" | ")
}
