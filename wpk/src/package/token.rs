// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! The token vocabulary of the web package format.
//!
//! Every frame in a package begins with a one-byte marker. The marker values are fixed for this revision of
//! the format. Marker values `0x05` - `0x0F` and `0x14` - `0xFE` are reserved for future use, and a reader
//! will reject them as unknown tokens.

use chrono::{DateTime, Utc};
use std::fmt;

/// The literal bytes that follow the signature marker. Modelled on the PNG signature, so that line-ending
/// conversions and truncation to 7-bit bytes are detected early.
pub const MAGIC: &[u8; 7] = b"WPK\r\n\x1A\n";

/// Signature frame marker.
pub const SIGNATURE: u8 = 0x89;

/// Domain frame marker.
pub const DOMAIN: u8 = 0x01;

/// Build date frame marker.
pub const BUILD_DATE: u8 = 0x02;

/// Certificate frame marker.
pub const CERTIFICATE: u8 = 0x03;

/// Content encoding frame marker.
pub const CONTENT_ENCODING: u8 = 0x04;

/// File name frame marker.
pub const FILE_NAME: u8 = 0x10;

/// Content type frame marker.
pub const CONTENT_TYPE: u8 = 0x11;

/// Content hash frame marker.
pub const CONTENT_HASH: u8 = 0x12;

/// Content length frame marker.
pub const CONTENT_LENGTH: u8 = 0x13;

/// Start of content marker. The raw content bytes follow immediately.
pub const START_CONTENT: u8 = 0xFF;

/// End of files marker. Terminates the package.
pub const END_OF_FILES: u8 = 0x00;

/// Width in bytes of a content hash (SHA-256).
pub const CONTENT_HASH_LENGTH: usize = 32;

/// Width in bytes of the content length payload.
pub const CONTENT_LENGTH_WIDTH: usize = 3;

/// Content lengths must be strictly below this value.
pub const CONTENT_LENGTH_LIMIT: u32 = 1 << 24;

/// Signatures are prefixed with a single length byte.
pub const MAX_SIGNATURE_LENGTH: usize = u8::MAX as usize;

/// Certificates are prefixed with a two-byte big-endian length.
pub const MAX_CERTIFICATE_LENGTH: usize = u16::MAX as usize;

/// The kind of a token, without its value. Used for grammar decisions and error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Signature,
    Domain,
    BuildDate,
    Certificate,
    ContentEncoding,
    FileName,
    ContentType,
    ContentHash,
    ContentLength,
    StartContent,
    Content,
    EndOfFiles,
}

impl TokenKind {
    /// Maps a marker byte onto the token it introduces, if any. `Content` has no marker, because its
    /// extent is implied by the preceding content length.
    pub fn from_marker(marker: u8) -> Option<TokenKind> {
        match marker {
            SIGNATURE => Some(TokenKind::Signature),
            DOMAIN => Some(TokenKind::Domain),
            BUILD_DATE => Some(TokenKind::BuildDate),
            CERTIFICATE => Some(TokenKind::Certificate),
            CONTENT_ENCODING => Some(TokenKind::ContentEncoding),
            FILE_NAME => Some(TokenKind::FileName),
            CONTENT_TYPE => Some(TokenKind::ContentType),
            CONTENT_HASH => Some(TokenKind::ContentHash),
            CONTENT_LENGTH => Some(TokenKind::ContentLength),
            START_CONTENT => Some(TokenKind::StartContent),
            END_OF_FILES => Some(TokenKind::EndOfFiles),
            _ => None,
        }
    }

    /// The grammar name of the token, as used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Signature => "signature",
            TokenKind::Domain => "domain",
            TokenKind::BuildDate => "build-date",
            TokenKind::Certificate => "certificate",
            TokenKind::ContentEncoding => "content-encoding",
            TokenKind::FileName => "file-name",
            TokenKind::ContentType => "content-type",
            TokenKind::ContentHash => "content-hash",
            TokenKind::ContentLength => "content-length",
            TokenKind::StartContent => "start-content",
            TokenKind::Content => "content",
            TokenKind::EndOfFiles => "end-of-files",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexically valid token, as produced by the [Reader](super::reader::Reader) and consumed by the
/// [Parser](super::grammar::Parser).
///
/// Content bytes never pass through the parser one by one. The reader streams them into a
/// [ContentSink](super::reader::ContentSink) and hands the parser whatever the sink made of them, so that
/// no layer has to hold a whole file in memory unless the sink chooses to.
#[derive(Debug, PartialEq)]
pub enum Token {
    Signature(Vec<u8>),
    Domain(String),
    BuildDate(DateTime<Utc>),
    Certificate(Vec<u8>),
    ContentEncoding(super::ContentEncoding),
    FileName(String),
    ContentType(String),
    ContentHash([u8; CONTENT_HASH_LENGTH]),
    ContentLength(u32),
    StartContent,
    Content(super::Content),
    EndOfFiles,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Signature(_) => TokenKind::Signature,
            Token::Domain(_) => TokenKind::Domain,
            Token::BuildDate(_) => TokenKind::BuildDate,
            Token::Certificate(_) => TokenKind::Certificate,
            Token::ContentEncoding(_) => TokenKind::ContentEncoding,
            Token::FileName(_) => TokenKind::FileName,
            Token::ContentType(_) => TokenKind::ContentType,
            Token::ContentHash(_) => TokenKind::ContentHash,
            Token::ContentLength(_) => TokenKind::ContentLength,
            Token::StartContent => TokenKind::StartContent,
            Token::Content(_) => TokenKind::Content,
            Token::EndOfFiles => TokenKind::EndOfFiles,
        }
    }
}
