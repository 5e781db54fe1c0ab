// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! The package grammar.
//!
//! ```text
//! package := signature domain? build-date certificate? content-encoding? file* end-of-files
//! file    := file-name content-type content-hash? content-length start-content content
//! ```
//!
//! The [Parser] is a table-driven recogniser over [Token] values. Each state of the table names the
//! tokens that may come next, which is also what gets reported when something else arrives. Reductions
//! are pure: they only move token values into the structures being built.

use super::error::ParserError;
use super::token::{Token, TokenKind, CONTENT_HASH_LENGTH};
use super::{Content, ContentEncoding, FileEntry, Package};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expect {
    Signature,
    DomainOrBuildDate,
    BuildDate,
    AfterBuildDate,
    AfterCertificate,
    Files,
    ContentType,
    HashOrLength,
    ContentLength,
    StartContent,
    Content,
    Done,
}

impl Expect {
    fn alternatives(self) -> &'static [TokenKind] {
        use TokenKind::*;
        match self {
            Expect::Signature => &[Signature],
            Expect::DomainOrBuildDate => &[Domain, BuildDate],
            Expect::BuildDate => &[BuildDate],
            Expect::AfterBuildDate => &[Certificate, ContentEncoding, FileName, EndOfFiles],
            Expect::AfterCertificate => &[ContentEncoding, FileName, EndOfFiles],
            Expect::Files => &[FileName, EndOfFiles],
            Expect::ContentType => &[ContentType],
            Expect::HashOrLength => &[ContentHash, ContentLength],
            Expect::ContentLength => &[ContentLength],
            Expect::StartContent => &[StartContent],
            Expect::Content => &[Content],
            Expect::Done => &[],
        }
    }
}

#[derive(Debug)]
struct PendingFile {
    file_name: String,
    content_type: String,
    content_hash: Option<[u8; CONTENT_HASH_LENGTH]>,
    content_length: u32,
}

/// Assembles a [Package] from a token sequence.
#[derive(Debug)]
pub struct Parser {
    expect: Expect,
    signature: Option<Vec<u8>>,
    domain: Option<String>,
    build_date: Option<DateTime<Utc>>,
    certificate: Option<Vec<u8>>,
    content_encoding: Option<ContentEncoding>,
    files: Vec<FileEntry>,
    file_names: HashSet<String>,
    pending: Option<PendingFile>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser::new()
    }
}

impl Parser {
    pub fn new() -> Parser {
        Parser {
            expect: Expect::Signature,
            signature: None,
            domain: None,
            build_date: None,
            certificate: None,
            content_encoding: None,
            files: Vec::new(),
            file_names: HashSet::new(),
            pending: None,
        }
    }

    /// The tokens the grammar allows next.
    pub fn expected(&self) -> &'static [TokenKind] {
        self.expect.alternatives()
    }

    /// The name and declared length of the file whose head has been parsed, once the parser has accepted
    /// its start-content marker or is about to.
    pub fn pending_file(&self) -> Option<(&str, u32)> {
        self.pending
            .as_ref()
            .map(|file| (file.file_name.as_str(), file.content_length))
    }

    /// Offers the next token. Returns the finished package when the token completes it.
    pub fn push(&mut self, token: Token) -> Result<Option<Package>, ParserError> {
        let found = token.kind();
        self.expect = match (self.expect, token) {
            (Expect::Signature, Token::Signature(signature)) => {
                self.signature = if signature.is_empty() { None } else { Some(signature) };
                Expect::DomainOrBuildDate
            }
            (Expect::DomainOrBuildDate, Token::Domain(domain)) => {
                self.domain = Some(domain);
                Expect::BuildDate
            }
            (Expect::DomainOrBuildDate, Token::BuildDate(build_date))
            | (Expect::BuildDate, Token::BuildDate(build_date)) => {
                self.build_date = Some(build_date);
                Expect::AfterBuildDate
            }
            (Expect::AfterBuildDate, Token::Certificate(certificate)) => {
                self.certificate = Some(certificate);
                Expect::AfterCertificate
            }
            (Expect::AfterBuildDate, Token::ContentEncoding(content_encoding))
            | (Expect::AfterCertificate, Token::ContentEncoding(content_encoding)) => {
                self.content_encoding = Some(content_encoding);
                Expect::Files
            }
            (Expect::AfterBuildDate, Token::FileName(file_name))
            | (Expect::AfterCertificate, Token::FileName(file_name))
            | (Expect::Files, Token::FileName(file_name)) => {
                if !self.file_names.insert(file_name.clone()) {
                    return Err(ParserError::DuplicateFileName(file_name));
                }
                self.pending = Some(PendingFile {
                    file_name,
                    content_type: String::new(),
                    content_hash: None,
                    content_length: 0,
                });
                Expect::ContentType
            }
            (Expect::ContentType, Token::ContentType(content_type)) => {
                if let Some(file) = self.pending.as_mut() {
                    file.content_type = content_type;
                }
                Expect::HashOrLength
            }
            (Expect::HashOrLength, Token::ContentHash(content_hash)) => {
                if let Some(file) = self.pending.as_mut() {
                    file.content_hash = Some(content_hash);
                }
                Expect::ContentLength
            }
            (Expect::HashOrLength, Token::ContentLength(content_length))
            | (Expect::ContentLength, Token::ContentLength(content_length)) => {
                if let Some(file) = self.pending.as_mut() {
                    file.content_length = content_length;
                }
                Expect::StartContent
            }
            (Expect::StartContent, Token::StartContent) => Expect::Content,
            (Expect::Content, Token::Content(content)) => {
                self.finish_file(content);
                Expect::Files
            }
            (Expect::AfterBuildDate, Token::EndOfFiles)
            | (Expect::AfterCertificate, Token::EndOfFiles)
            | (Expect::Files, Token::EndOfFiles) => {
                self.expect = Expect::Done;
                return Ok(self.finish_package());
            }
            (expect, _) => {
                return Err(ParserError::UnexpectedToken {
                    found,
                    expected: expect.alternatives(),
                })
            }
        };
        Ok(None)
    }

    fn finish_file(&mut self, content: Content) {
        if let Some(file) = self.pending.take() {
            self.files.push(FileEntry::from_parts(
                file.file_name,
                file.content_type,
                file.content_hash,
                file.content_length,
                content,
            ));
        }
    }

    fn finish_package(&mut self) -> Option<Package> {
        let build_date = self.build_date.take()?;
        Some(Package::from_parts(
            self.signature.take(),
            self.domain.take(),
            build_date,
            self.certificate.take(),
            self.content_encoding.take(),
            std::mem::take(&mut self.files),
        ))
    }
}
