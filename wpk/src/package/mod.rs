// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! This module implements the web package (.wpk) file format.
//!
//! A web package bundles the files of a web site (or part of one) into a single stream, so that the site can
//! be served from wherever the package lands. The format is a flat sequence of frames, each introduced by a
//! one-byte marker. A package opens with a signature frame, carries a little package-wide metadata, and then
//! lists its files, each one with its name, media type, optional SHA-256 content hash and length, followed by
//! the raw content bytes.
//!
//! Packages are produced by the [Writer](writer::Writer), which fills caller-supplied buffers of any size,
//! and consumed by the [Reader](reader::Reader), which accepts input in chunks of any size. Neither side
//! requires the whole package, or even a whole file, to be in memory at once.

pub mod buffer;
pub mod error;
pub mod format;
pub mod grammar;
pub mod hash;
pub mod reader;
pub mod rules;
pub mod token;
pub mod writer;

pub use reader::{decode, read_from_stream};
pub use writer::{encode, write_to_stream};

use chrono::{DateTime, SubsecRound, Utc};
use error::{FormatError, VerificationError};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Convenient result alias for this module.
pub type Result<T> = std::result::Result<T, error::Error>;

/// The media type under which web packages are served.
pub const MEDIA_TYPE: &str = "application/prs.davekok.webpackage";

/// The content coding that applies to every file in a package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    Gzip,
    Compress,
    Deflate,
    Br,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Compress => "compress",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Br => "br",
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncoding {
    type Err = FormatError;

    /// Labels are matched without regard to ASCII case.
    fn from_str(label: &str) -> std::result::Result<Self, Self::Err> {
        match label.to_ascii_lowercase().as_str() {
            "gzip" => Ok(ContentEncoding::Gzip),
            "compress" => Ok(ContentEncoding::Compress),
            "deflate" => Ok(ContentEncoding::Deflate),
            "br" => Ok(ContentEncoding::Br),
            _ => Err(FormatError::InvalidContentEncoding(label.to_string())),
        }
    }
}

/// The content of a file.
pub enum Content {
    /// Content held in memory.
    Bytes(Vec<u8>),

    /// Content pulled from a reader while the package is being written. The reader must yield at least the
    /// declared content length of the file; anything beyond that is left unread.
    Stream(Box<dyn Read + Send>),

    /// Content that is not held by the package, because it was handed to a
    /// [ContentSink](reader::ContentSink) that kept it elsewhere while decoding.
    Detached,
}

impl Content {
    /// The content bytes, if held in memory.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::Bytes(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Content::Stream(_) => f.write_str("Stream"),
            Content::Detached => f.write_str("Detached"),
        }
    }
}

/// Streams never compare equal, since their bytes cannot be inspected without consuming them.
impl PartialEq for Content {
    fn eq(&self, other: &Content) -> bool {
        match (self, other) {
            (Content::Bytes(a), Content::Bytes(b)) => a == b,
            (Content::Detached, Content::Detached) => true,
            _ => false,
        }
    }
}

/// One file of a package.
#[derive(Debug, PartialEq)]
pub struct FileEntry {
    file_name: String,
    content_type: String,
    content_hash: Option<[u8; token::CONTENT_HASH_LENGTH]>,
    content_length: u32,
    content: Content,
}

impl FileEntry {
    /// Creates a file entry, validating the name, the media type and the content length. In-memory content
    /// must be exactly `content_length` bytes long.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content_length: u32,
        content: Content,
    ) -> Result<FileEntry> {
        let file_name = file_name.into();
        let content_type = content_type.into();

        if !rules::is_valid_file_name(&file_name) {
            return Err(FormatError::InvalidFileName(file_name).into());
        }
        if !rules::is_valid_content_type(&content_type) {
            return Err(FormatError::InvalidContentType(content_type).into());
        }
        if content_length >= token::CONTENT_LENGTH_LIMIT {
            return Err(FormatError::ContentLengthOutOfRange(content_length as u64).into());
        }
        if let Content::Bytes(bytes) = &content {
            if bytes.len() != content_length as usize {
                return Err(FormatError::ContentLengthMismatch {
                    file_name,
                    declared: content_length,
                }
                .into());
            }
        }

        Ok(FileEntry {
            file_name,
            content_type,
            content_hash: None,
            content_length,
            content,
        })
    }

    /// Creates a file entry from in-memory content, computing its length and content hash.
    pub fn from_bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<FileEntry> {
        if bytes.len() as u64 >= token::CONTENT_LENGTH_LIMIT as u64 {
            return Err(FormatError::ContentLengthOutOfRange(bytes.len() as u64).into());
        }
        let content_hash = hash::content_hash(&bytes);
        let entry = FileEntry::new(file_name, content_type, bytes.len() as u32, Content::Bytes(bytes))?;
        Ok(entry.with_content_hash(content_hash))
    }

    // Values arriving from the parser have already been validated by the reader.
    pub(crate) fn from_parts(
        file_name: String,
        content_type: String,
        content_hash: Option<[u8; token::CONTENT_HASH_LENGTH]>,
        content_length: u32,
        content: Content,
    ) -> FileEntry {
        FileEntry {
            file_name,
            content_type,
            content_hash,
            content_length,
            content,
        }
    }

    pub fn with_content_hash(self, content_hash: [u8; token::CONTENT_HASH_LENGTH]) -> FileEntry {
        FileEntry {
            content_hash: Some(content_hash),
            ..self
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_hash(&self) -> Option<&[u8; token::CONTENT_HASH_LENGTH]> {
        self.content_hash.as_ref()
    }

    pub fn content_length(&self) -> u32 {
        self.content_length
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    pub fn into_content(self) -> Content {
        self.content
    }

    /// Checks in-memory content against the content hash. Streamed and detached content cannot be checked
    /// here, and passes.
    pub fn verify_content(&self) -> std::result::Result<(), VerificationError> {
        let expected = self
            .content_hash
            .ok_or_else(|| VerificationError::MissingContentHash(self.file_name.clone()))?;
        match &self.content {
            Content::Bytes(bytes) if hash::content_hash(bytes) != expected => {
                Err(VerificationError::ContentHashMismatch(self.file_name.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// A web package. Packages are immutable values; the `with_*` methods consume the package and return an
/// extended copy.
#[derive(Debug, PartialEq)]
pub struct Package {
    signature: Option<Vec<u8>>,
    domain: Option<String>,
    build_date: DateTime<Utc>,
    certificate: Option<Vec<u8>>,
    content_encoding: Option<ContentEncoding>,
    files: Vec<FileEntry>,
}

impl Package {
    /// Creates an empty, unsigned package. The build date is truncated to whole seconds, which is the
    /// precision of the wire format.
    pub fn new(build_date: DateTime<Utc>) -> Package {
        Package {
            signature: None,
            domain: None,
            build_date: build_date.trunc_subsecs(0),
            certificate: None,
            content_encoding: None,
            files: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        signature: Option<Vec<u8>>,
        domain: Option<String>,
        build_date: DateTime<Utc>,
        certificate: Option<Vec<u8>>,
        content_encoding: Option<ContentEncoding>,
        files: Vec<FileEntry>,
    ) -> Package {
        Package {
            signature,
            domain,
            build_date,
            certificate,
            content_encoding,
            files,
        }
    }

    pub fn with_domain(self, domain: impl Into<String>) -> Result<Package> {
        let domain = domain.into();
        if !rules::is_valid_domain(&domain) {
            return Err(FormatError::InvalidDomain(domain).into());
        }
        Ok(Package {
            domain: Some(domain),
            ..self
        })
    }

    pub fn with_content_encoding(self, content_encoding: ContentEncoding) -> Package {
        Package {
            content_encoding: Some(content_encoding),
            ..self
        }
    }

    pub fn with_certificate(self, certificate: Vec<u8>) -> Result<Package> {
        if certificate.len() > token::MAX_CERTIFICATE_LENGTH {
            return Err(FormatError::CertificateTooLarge(certificate.len()).into());
        }
        Ok(Package {
            certificate: Some(certificate),
            ..self
        })
    }

    /// Attaches a signature. An empty signature leaves the package unsigned.
    pub fn with_signature(self, signature: Vec<u8>) -> Result<Package> {
        if signature.len() > token::MAX_SIGNATURE_LENGTH {
            return Err(FormatError::SignatureTooLarge(signature.len()).into());
        }
        Ok(Package {
            signature: if signature.is_empty() { None } else { Some(signature) },
            ..self
        })
    }

    pub fn without_signature(self) -> Package {
        Package {
            signature: None,
            ..self
        }
    }

    /// Appends a file. File names must be unique within a package.
    pub fn with_file(mut self, file: FileEntry) -> Result<Package> {
        if self.get(file.file_name()).is_some() {
            return Err(FormatError::DuplicateFileName(file.file_name).into());
        }
        self.files.push(file);
        Ok(self)
    }

    /// Appends several files, failing on the first duplicate name.
    pub fn with_files(self, files: impl IntoIterator<Item = FileEntry>) -> Result<Package> {
        let mut names: HashSet<String> = self.files.iter().map(|f| f.file_name.clone()).collect();
        let mut package = self;
        for file in files {
            if !names.insert(file.file_name.clone()) {
                return Err(FormatError::DuplicateFileName(file.file_name).into());
            }
            package.files.push(file);
        }
        Ok(package)
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn build_date(&self) -> &DateTime<Utc> {
        &self.build_date
    }

    pub fn certificate(&self) -> Option<&[u8]> {
        self.certificate.as_deref()
    }

    pub fn content_encoding(&self) -> Option<ContentEncoding> {
        self.content_encoding
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [FileEntry] {
        &mut self.files
    }

    /// Looks up a file by name.
    pub fn get(&self, file_name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|file| file.file_name == file_name)
    }

    pub fn into_files(self) -> Vec<FileEntry> {
        self.files
    }

    /// The exact number of bytes the package encodes to.
    pub fn encoded_length(&self) -> u64 {
        format::length_package(self)
    }
}
