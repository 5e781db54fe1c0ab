// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Incremental decoding of web packages.
//!
//! The [Reader] turns chunks of bytes into tokens and feeds them to a [Parser]. Input may be split at any
//! byte boundary: a frame that straddles two chunks is accumulated until it is complete, and decoding
//! resumes where the previous chunk stopped. Splitting the same input differently always yields the same
//! package or the same error.
//!
//! Content bytes are not accumulated. As they arrive, they are passed straight on to a [ContentSink], which
//! decides what to keep. The default [MemorySink] keeps everything in memory; a sink that writes each file
//! to disk can decode packages of any size in constant memory.

use super::buffer::{ByteSource, ReadBuffer};
use super::error::{ReaderError, ReaderErrorKind, TruncationError};
use super::grammar::Parser;
use super::rules::{
    BuildDateScanner, ContentCodingScanner, ContentTypeScanner, DomainScanner, FileNameScanner, Scan, Scanner,
};
use super::token::*;
use super::{Content, ContentEncoding, Package, Result};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::convert::TryFrom;
use std::io::{self, ErrorKind, Read};
use std::mem;

/// The chunk size used by [read_from_stream].
pub const STREAM_CHUNK_LENGTH: usize = 8 * 1024;

/// Receives file content while a package is being decoded.
pub trait ContentSink {
    /// A new file begins. Exactly `content_length` bytes will be written before `finish` is called.
    fn start(&mut self, file_name: &str, content_length: u32) -> io::Result<()>;

    /// The next slice of the file's content.
    fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// The file is complete. The returned value becomes the content of the decoded file entry.
    fn finish(&mut self) -> io::Result<Content>;

    /// Decoding failed part way through a file. Whatever was written for it should be dropped.
    fn discard(&mut self) {}
}

/// Keeps file content in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Vec<u8>,
}

impl ContentSink for MemorySink {
    fn start(&mut self, _file_name: &str, content_length: u32) -> io::Result<()> {
        self.buffer = Vec::with_capacity(content_length as usize);
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<Content> {
        Ok(Content::Bytes(mem::take(&mut self.buffer)))
    }

    fn discard(&mut self) {
        self.buffer = Vec::new();
    }
}

/// The outcome of offering a chunk to a [Reader].
#[derive(Debug)]
pub enum ReadStatus {
    /// The chunk has been consumed, and the package is not complete yet.
    NeedMore,

    /// The package is complete. Bytes of the chunk after the end of the package are left unread.
    Complete(Package),
}

#[derive(Debug)]
enum State {
    Marker,
    Magic,
    SignatureLength,
    Signature(usize),
    Domain(DomainScanner),
    BuildDate(BuildDateScanner),
    CertificateLength,
    Certificate(usize),
    ContentEncoding(ContentCodingScanner),
    FileName(FileNameScanner),
    ContentType(ContentTypeScanner),
    ContentHash,
    ContentLength,
    Content(u32),
    Finished,
}

impl State {
    fn frame(&self) -> TokenKind {
        match self {
            State::Marker | State::Finished => TokenKind::EndOfFiles,
            State::Magic | State::SignatureLength | State::Signature(_) => TokenKind::Signature,
            State::Domain(_) => TokenKind::Domain,
            State::BuildDate(_) => TokenKind::BuildDate,
            State::CertificateLength | State::Certificate(_) => TokenKind::Certificate,
            State::ContentEncoding(_) => TokenKind::ContentEncoding,
            State::FileName(_) => TokenKind::FileName,
            State::ContentType(_) => TokenKind::ContentType,
            State::ContentHash => TokenKind::ContentHash,
            State::ContentLength => TokenKind::ContentLength,
            State::Content(_) => TokenKind::Content,
        }
    }
}

enum Scanned {
    Partial,
    Complete,
    Rejected,
}

/// A resumable package decoder.
///
/// Each call to [read](Reader::read) consumes as much of the chunk as it can. After an error the reader
/// resets itself and discards the rest of the chunk, so a reader is never left half way through a package
/// it can no longer make sense of.
#[derive(Debug)]
pub struct Reader<K = MemorySink> {
    state: State,
    parser: Parser,
    sink: K,
    field: Vec<u8>,
    offset: u64,
    frame_offset: u64,
    completed: Option<Package>,
}

impl Reader<MemorySink> {
    pub fn new() -> Reader<MemorySink> {
        Reader::with_sink(MemorySink::default())
    }
}

impl Default for Reader<MemorySink> {
    fn default() -> Self {
        Reader::new()
    }
}

impl<K: ContentSink> Reader<K> {
    pub fn with_sink(sink: K) -> Reader<K> {
        Reader {
            state: State::Marker,
            parser: Parser::new(),
            sink,
            field: Vec::new(),
            offset: 0,
            frame_offset: 0,
            completed: None,
        }
    }

    /// Offers the next chunk of input.
    ///
    /// On the final chunk (see [ByteSource::is_last_chunk]) the reader either completes the package or
    /// fails with a [TruncationError]; it never asks for more.
    pub fn read<S: ByteSource>(&mut self, source: &mut S) -> Result<ReadStatus> {
        match self.read_chunk(source) {
            Ok(status) => Ok(status),
            Err(e) => {
                debug!("Package decoding failed at byte offset {}: {}", self.frame_offset, e);
                source.reset();
                self.reset();
                Err(e)
            }
        }
    }

    /// Returns the reader to its initial state, ready for a new package.
    pub fn reset(&mut self) {
        self.sink.discard();
        self.state = State::Marker;
        self.parser = Parser::new();
        self.field.clear();
        self.offset = 0;
        self.frame_offset = 0;
        self.completed = None;
    }

    /// The number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    fn read_chunk<S: ByteSource>(&mut self, source: &mut S) -> Result<ReadStatus> {
        loop {
            if let Some(package) = self.completed.take() {
                return Ok(ReadStatus::Complete(package));
            }
            if let State::Finished = self.state {
                if source.available().is_empty() {
                    return Ok(ReadStatus::NeedMore);
                }
                return Err(self.lexical(ReaderErrorKind::TrailingBytes));
            }
            if source.available().is_empty() {
                if source.is_last_chunk() {
                    return Err(self.truncation().into());
                }
                return Ok(ReadStatus::NeedMore);
            }
            self.step(source)?;
        }
    }

    fn truncation(&self) -> TruncationError {
        match self.state {
            State::Marker | State::Finished => TruncationError::MidPackage {
                offset: self.offset,
                expected: self.parser.expected(),
            },
            _ => TruncationError::MidFrame {
                frame: self.state.frame(),
                offset: self.frame_offset,
            },
        }
    }

    fn step<S: ByteSource>(&mut self, source: &mut S) -> Result<()> {
        let state = mem::replace(&mut self.state, State::Marker);
        self.state = match state {
            State::Marker => self.start_frame(source)?,
            State::Magic => {
                if !self.fill(source, MAGIC.len()) {
                    State::Magic
                } else if self.field == MAGIC {
                    self.field.clear();
                    State::SignatureLength
                } else {
                    return Err(self.lexical(ReaderErrorKind::InvalidSignature(escape(&self.field))));
                }
            }
            State::SignatureLength => {
                if self.fill(source, 1) {
                    let length = self.field[0] as usize;
                    self.field.clear();
                    self.fixed_length(TokenKind::Signature, length)?
                } else {
                    State::SignatureLength
                }
            }
            State::Signature(length) => {
                if self.fill(source, length) {
                    let signature = mem::take(&mut self.field);
                    self.push(Token::Signature(signature))?;
                    State::Marker
                } else {
                    State::Signature(length)
                }
            }
            State::CertificateLength => {
                if self.fill(source, 2) {
                    let length = u16::from_be_bytes([self.field[0], self.field[1]]) as usize;
                    self.field.clear();
                    self.fixed_length(TokenKind::Certificate, length)?
                } else {
                    State::CertificateLength
                }
            }
            State::Certificate(length) => {
                if self.fill(source, length) {
                    let certificate = mem::take(&mut self.field);
                    self.push(Token::Certificate(certificate))?;
                    State::Marker
                } else {
                    State::Certificate(length)
                }
            }
            State::Domain(mut scanner) => match self.scan(&mut scanner, source) {
                Scanned::Partial => State::Domain(scanner),
                Scanned::Complete => {
                    let domain = self.take_text();
                    self.push(Token::Domain(domain))?;
                    State::Marker
                }
                Scanned::Rejected => {
                    return Err(self.lexical(ReaderErrorKind::InvalidDomain(escape(&self.field))));
                }
            },
            State::BuildDate(mut scanner) => match self.scan(&mut scanner, source) {
                Scanned::Partial => State::BuildDate(scanner),
                Scanned::Complete => {
                    let text = self.take_text();
                    let build_date = DateTime::parse_from_rfc3339(&text)
                        .map_err(|_| self.lexical(ReaderErrorKind::InvalidBuildDate(text.clone())))?;
                    self.push(Token::BuildDate(build_date.with_timezone(&Utc)))?;
                    State::Marker
                }
                Scanned::Rejected => {
                    return Err(self.lexical(ReaderErrorKind::InvalidBuildDate(escape(&self.field))));
                }
            },
            State::ContentEncoding(mut scanner) => match self.scan(&mut scanner, source) {
                Scanned::Partial => State::ContentEncoding(scanner),
                Scanned::Complete => {
                    let label = self.take_text();
                    let content_encoding = label
                        .parse::<ContentEncoding>()
                        .map_err(|_| self.lexical(ReaderErrorKind::InvalidContentEncoding(label.clone())))?;
                    self.push(Token::ContentEncoding(content_encoding))?;
                    State::Marker
                }
                Scanned::Rejected => {
                    return Err(self.lexical(ReaderErrorKind::InvalidContentEncoding(escape(&self.field))));
                }
            },
            State::FileName(mut scanner) => match self.scan(&mut scanner, source) {
                Scanned::Partial => State::FileName(scanner),
                Scanned::Complete => {
                    let file_name = self.take_text();
                    self.push(Token::FileName(file_name))?;
                    State::Marker
                }
                Scanned::Rejected => {
                    return Err(self.lexical(ReaderErrorKind::InvalidFileName(escape(&self.field))));
                }
            },
            State::ContentType(mut scanner) => match self.scan(&mut scanner, source) {
                Scanned::Partial => State::ContentType(scanner),
                Scanned::Complete => {
                    let content_type = self.take_text();
                    self.push(Token::ContentType(content_type))?;
                    State::Marker
                }
                Scanned::Rejected => {
                    return Err(self.lexical(ReaderErrorKind::InvalidContentType(escape(&self.field))));
                }
            },
            State::ContentHash => {
                if self.fill(source, CONTENT_HASH_LENGTH) {
                    let mut content_hash = [0u8; CONTENT_HASH_LENGTH];
                    content_hash.copy_from_slice(&self.field);
                    self.field.clear();
                    self.push(Token::ContentHash(content_hash))?;
                    State::Marker
                } else {
                    State::ContentHash
                }
            }
            State::ContentLength => {
                if self.fill(source, CONTENT_LENGTH_WIDTH) {
                    let length = u32::from_be_bytes([0, self.field[0], self.field[1], self.field[2]]);
                    self.field.clear();
                    self.push(Token::ContentLength(length))?;
                    State::Marker
                } else {
                    State::ContentLength
                }
            }
            State::Content(remaining) => {
                let count = usize::try_from(remaining)
                    .unwrap_or(usize::MAX)
                    .min(source.available().len());
                source.mark();
                source.advance(count);
                self.sink.write(source.marked())?;
                self.offset += count as u64;

                let remaining = remaining - count as u32;
                if remaining == 0 {
                    self.finish_content()?
                } else {
                    State::Content(remaining)
                }
            }
            State::Finished => State::Finished,
        };
        Ok(())
    }

    fn start_frame<S: ByteSource>(&mut self, source: &mut S) -> Result<State> {
        self.frame_offset = self.offset;
        let marker = match source.current() {
            Some(marker) => marker,
            None => return Ok(State::Marker),
        };
        let kind = match TokenKind::from_marker(marker) {
            Some(kind) => kind,
            None => return Err(self.lexical(ReaderErrorKind::UnknownToken(marker))),
        };
        source.advance(1);
        self.offset += 1;
        trace!("Found {} frame at byte offset {}", kind, self.frame_offset);

        let state = match kind {
            TokenKind::Signature => State::Magic,
            TokenKind::Domain => State::Domain(DomainScanner::default()),
            TokenKind::BuildDate => State::BuildDate(BuildDateScanner::default()),
            TokenKind::Certificate => State::CertificateLength,
            TokenKind::ContentEncoding => State::ContentEncoding(ContentCodingScanner::default()),
            TokenKind::FileName => State::FileName(FileNameScanner::default()),
            TokenKind::ContentType => State::ContentType(ContentTypeScanner::default()),
            TokenKind::ContentHash => State::ContentHash,
            TokenKind::ContentLength => State::ContentLength,
            TokenKind::StartContent => self.start_content()?,
            TokenKind::EndOfFiles => {
                self.push(Token::EndOfFiles)?;
                State::Finished
            }
            TokenKind::Content => State::Marker,
        };
        Ok(state)
    }

    fn start_content(&mut self) -> Result<State> {
        self.push(Token::StartContent)?;
        let length = match self.parser.pending_file() {
            Some((file_name, length)) => {
                debug!("Decoding {} ({} bytes)", file_name, length);
                self.sink.start(file_name, length)?;
                length
            }
            None => 0,
        };
        if length == 0 {
            self.finish_content()
        } else {
            Ok(State::Content(length))
        }
    }

    fn finish_content(&mut self) -> Result<State> {
        let content = self.sink.finish()?;
        self.push(Token::Content(content))?;
        Ok(State::Marker)
    }

    fn fixed_length(&mut self, kind: TokenKind, length: usize) -> Result<State> {
        if length > 0 {
            return Ok(match kind {
                TokenKind::Signature => State::Signature(length),
                _ => State::Certificate(length),
            });
        }
        let token = match kind {
            TokenKind::Signature => Token::Signature(Vec::new()),
            _ => Token::Certificate(Vec::new()),
        };
        self.push(token)?;
        Ok(State::Marker)
    }

    fn push(&mut self, token: Token) -> Result<()> {
        if let Some(package) = self.parser.push(token)? {
            self.completed = Some(package);
        }
        Ok(())
    }

    // Appends bytes from the source to the field until it is `width` bytes long, or the chunk runs out.
    fn fill<S: ByteSource>(&mut self, source: &mut S, width: usize) -> bool {
        let count = (width - self.field.len()).min(source.available().len());
        source.mark();
        source.advance(count);
        self.field.extend_from_slice(source.marked());
        self.offset += count as u64;
        self.field.len() == width
    }

    fn scan<T: Scanner, S: ByteSource>(&mut self, scanner: &mut T, source: &mut S) -> Scanned {
        let mut count = 0;
        let mut outcome = Scanned::Partial;
        for byte in source.available() {
            match scanner.feed(*byte) {
                Scan::Accept => count += 1,
                Scan::Complete => {
                    count += 1;
                    outcome = Scanned::Complete;
                    break;
                }
                Scan::Done => {
                    outcome = Scanned::Complete;
                    break;
                }
                Scan::Reject => {
                    count += 1;
                    outcome = Scanned::Rejected;
                    break;
                }
            }
        }
        source.mark();
        source.advance(count);
        self.field.extend_from_slice(source.marked());
        self.offset += count as u64;
        outcome
    }

    fn take_text(&mut self) -> String {
        // The scanners only accept ASCII.
        let text = String::from_utf8_lossy(&self.field).into_owned();
        self.field.clear();
        text
    }

    fn lexical(&self, kind: ReaderErrorKind) -> super::error::Error {
        ReaderError {
            kind,
            offset: self.frame_offset,
        }
        .into()
    }
}

fn escape(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|b| std::ascii::escape_default(*b))
        .map(char::from)
        .collect()
}

/// A one-shot decoder that hands its result to a continuation.
///
/// Each call to [feed](Decoder::feed) consumes the decoder. While the package is incomplete, a decoder for
/// the remaining input is returned. Once the package is complete or decoding has failed, the continuation
/// is called exactly once and nothing is returned.
pub struct Decoder<F, K = MemorySink> {
    reader: Reader<K>,
    continuation: F,
}

impl<F: FnOnce(Result<Package>)> Decoder<F, MemorySink> {
    pub fn new(continuation: F) -> Decoder<F, MemorySink> {
        Decoder::with_sink(MemorySink::default(), continuation)
    }
}

impl<F: FnOnce(Result<Package>), K: ContentSink> Decoder<F, K> {
    pub fn with_sink(sink: K, continuation: F) -> Decoder<F, K> {
        Decoder {
            reader: Reader::with_sink(sink),
            continuation,
        }
    }

    pub fn feed<S: ByteSource>(mut self, source: &mut S) -> Option<Decoder<F, K>> {
        match self.reader.read(source) {
            Ok(ReadStatus::NeedMore) => Some(self),
            Ok(ReadStatus::Complete(package)) => {
                (self.continuation)(Ok(package));
                None
            }
            Err(e) => {
                (self.continuation)(Err(e));
                None
            }
        }
    }
}

/// Decodes a package held entirely in memory. Bytes after the end of the package are an error.
pub fn decode(bytes: &[u8]) -> Result<Package> {
    let mut reader = Reader::new();
    let mut source = ReadBuffer::last(bytes);
    let package = match reader.read(&mut source)? {
        ReadStatus::Complete(package) => package,
        ReadStatus::NeedMore => return Err(reader.truncation().into()),
    };
    if !source.available().is_empty() {
        return Err(reader.lexical(ReaderErrorKind::TrailingBytes));
    }
    Ok(package)
}

/// Decodes a package from a stream, keeping file content in memory.
pub fn read_from_stream<R: Read>(stream: &mut R) -> Result<Package> {
    read_from_stream_with_sink(stream, MemorySink::default())
}

/// Decodes a package from a stream, passing file content to `sink`. The stream must end with the package.
pub fn read_from_stream_with_sink<R: Read, K: ContentSink>(stream: &mut R, sink: K) -> Result<Package> {
    let mut reader = Reader::with_sink(sink);
    let mut chunk = vec![0u8; STREAM_CHUNK_LENGTH];
    loop {
        let count = match stream.read(&mut chunk) {
            Ok(count) => count,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let mut source = if count == 0 {
            ReadBuffer::last(&chunk[..0])
        } else {
            ReadBuffer::new(&chunk[..count])
        };
        if let ReadStatus::Complete(package) = reader.read(&mut source)? {
            if !source.available().is_empty() {
                return Err(reader.lexical(ReaderErrorKind::TrailingBytes));
            }
            // The package may end exactly on a read boundary, with more bytes still to come.
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => return Ok(package),
                    Ok(_) => return Err(reader.lexical(ReaderErrorKind::TrailingBytes)),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::error::{Error, ParserError};
    use crate::package::{encode, FileEntry};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    const INDEX: &[u8] = b"<!doctype html><html></html>";

    fn date() -> DateTime<Utc> {
        Utc.ymd(2021, 11, 19).and_hms(16, 41, 23)
    }

    // A single unsigned file, with the frames written out by hand.
    fn scenario_a() -> Vec<u8> {
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-11-19T16:41:23Z");
        bytes.extend_from_slice(b"\x10/");
        bytes.extend_from_slice(b"\x11text/html; charset=us-ascii");
        bytes.push(0x13);
        bytes.extend_from_slice(&(INDEX.len() as u32).to_be_bytes()[1..]);
        bytes.push(0xFF);
        bytes.extend_from_slice(INDEX);
        bytes.push(0x00);
        bytes
    }

    fn rich_package() -> Package {
        Package::new(date())
            .with_domain("example.com")
            .unwrap()
            .with_certificate(vec![0x30, 0x82, 0x01, 0x0A])
            .unwrap()
            .with_content_encoding(ContentEncoding::Gzip)
            .with_signature(vec![0x5A; 64])
            .unwrap()
            .with_file(FileEntry::from_bytes("/", "text/html; charset=\"utf-8\"", INDEX.to_vec()).unwrap())
            .unwrap()
            .with_file(FileEntry::from_bytes("/empty.txt", "text/plain", Vec::new()).unwrap())
            .unwrap()
            .with_file(FileEntry::new("/data.bin", "application/octet-stream", 3, Content::Bytes(vec![0, 0xFF, 0x10])).unwrap())
            .unwrap()
    }

    fn read_in_chunks(bytes: &[u8], chunk_length: usize) -> Result<Package> {
        let mut reader = Reader::new();
        for chunk in bytes.chunks(chunk_length) {
            if let ReadStatus::Complete(package) = reader.read(&mut ReadBuffer::new(chunk))? {
                return Ok(package);
            }
        }
        match reader.read(&mut ReadBuffer::last(&[]))? {
            ReadStatus::Complete(package) => Ok(package),
            ReadStatus::NeedMore => panic!("The reader asked for more after the last chunk."),
        }
    }

    fn error_text(result: Result<Package>) -> String {
        match result {
            Ok(_) => panic!("Expected an error."),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn test_decode_scenario_a() {
        let package = decode(&scenario_a()).unwrap();
        assert_eq!(package.build_date(), &date());
        assert!(package.signature().is_none());
        assert_eq!(package.files().len(), 1);

        let file = &package.files()[0];
        assert_eq!(file.file_name(), "/");
        assert_eq!(file.content_type(), "text/html; charset=us-ascii");
        assert_eq!(file.content_length() as usize, INDEX.len());
        assert!(file.content_hash().is_none());
        assert_eq!(file.content().as_bytes(), Some(INDEX));
    }

    #[test]
    fn test_scenario_a_round_trips_byte_for_byte() {
        let bytes = scenario_a();
        assert_eq!(encode(decode(&bytes).unwrap()).unwrap(), bytes);
    }

    #[test]
    fn test_every_split_point_gives_the_same_package() {
        let bytes = encode(rich_package()).unwrap();
        let expected = decode(&bytes).unwrap();
        assert_eq!(expected, rich_package());

        for split in 0..=bytes.len() {
            let mut reader = Reader::new();
            let first = reader.read(&mut ReadBuffer::new(&bytes[..split])).unwrap();
            let package = match first {
                ReadStatus::Complete(package) => package,
                ReadStatus::NeedMore => match reader.read(&mut ReadBuffer::last(&bytes[split..])).unwrap() {
                    ReadStatus::Complete(package) => package,
                    ReadStatus::NeedMore => panic!("Incomplete at split {}", split),
                },
            };
            assert_eq!(package, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = encode(rich_package()).unwrap();
        assert_eq!(read_in_chunks(&bytes, 1).unwrap(), rich_package());
        assert_eq!(read_in_chunks(&bytes, 7).unwrap(), rich_package());
    }

    #[test]
    fn test_errors_do_not_depend_on_chunking() {
        let mut bytes = scenario_a();
        // Corrupt the file name into a relative one.
        let position = bytes.iter().position(|b| *b == b'/').unwrap();
        bytes[position] = b'x';

        let expected = error_text(decode(&bytes));
        for chunk_length in 1..bytes.len() {
            assert_eq!(error_text(read_in_chunks(&bytes, chunk_length)), expected);
        }
    }

    #[test]
    fn test_truncation_mid_package() {
        // Scenario B: the input ends right after a content length frame.
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-11-19T16:41:23Z");
        bytes.extend_from_slice(b"\x10/a\x11text/plain\x13\x00\x00\x02");

        match decode(&bytes).unwrap_err() {
            Error::TruncationError(TruncationError::MidPackage { offset, expected }) => {
                assert_eq!(offset, bytes.len() as u64);
                assert_eq!(expected, &[TokenKind::StartContent]);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_truncation_mid_frame() {
        let bytes = scenario_a();
        let cut = &bytes[..bytes.len() - 5];
        match decode(cut).unwrap_err() {
            Error::TruncationError(TruncationError::MidFrame { frame, .. }) => {
                assert_eq!(frame, TokenKind::Content)
            }
            _ => panic!("Unexpected error type."),
        }

        match decode(&bytes[..12]).unwrap_err() {
            Error::TruncationError(TruncationError::MidFrame { frame, offset }) => {
                assert_eq!(frame, TokenKind::BuildDate);
                assert_eq!(offset, 9);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_empty_input_is_truncated() {
        match decode(&[]).unwrap_err() {
            Error::TruncationError(TruncationError::MidPackage { offset, expected }) => {
                assert_eq!(offset, 0);
                assert_eq!(expected, &[TokenKind::Signature]);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_unknown_marker() {
        let mut bytes = scenario_a();
        bytes.insert(9, 0x42);
        match decode(&bytes).unwrap_err() {
            Error::ReaderError(e) => {
                assert_eq!(e.kind, ReaderErrorKind::UnknownToken(0x42));
                assert_eq!(e.offset, 9);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = scenario_a();
        bytes[4] = b'\n';
        match decode(&bytes).unwrap_err() {
            Error::ReaderError(e) => match e.kind {
                ReaderErrorKind::InvalidSignature(_) => assert_eq!(e.offset, 0),
                _ => panic!("Unexpected error kind."),
            },
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_impossible_build_date() {
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-02-30T16:41:23Z\x00");
        match decode(&bytes).unwrap_err() {
            Error::ReaderError(e) => {
                assert_eq!(e.kind, ReaderErrorKind::InvalidBuildDate("2021-02-30T16:41:23Z".to_string()))
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_build_date_offset_is_normalised() {
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-11-19T18:41:23+02:00\x00");
        assert_eq!(decode(&bytes).unwrap().build_date(), &date());
    }

    #[test]
    fn test_content_encoding_is_case_insensitive() {
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-11-19T16:41:23Z\x04GZip\x00");
        assert_eq!(decode(&bytes).unwrap().content_encoding(), Some(ContentEncoding::Gzip));
    }

    #[test]
    fn test_order_violation_is_a_parser_error() {
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x10/a\x11");
        match decode(&bytes).unwrap_err() {
            Error::ParserError(ParserError::UnexpectedToken { found, expected }) => {
                assert_eq!(found, TokenKind::FileName);
                assert_eq!(expected, &[TokenKind::Domain, TokenKind::BuildDate]);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_unknown_top_level_type() {
        // Scenario C on the decoding side.
        let mut bytes = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        bytes.extend_from_slice(b"\x022021-11-19T16:41:23Z");
        bytes.extend_from_slice(b"\x10/a\x11bogus-type/x\x13\x00\x00\x00\xFF\x00");
        match decode(&bytes).unwrap_err() {
            Error::ReaderError(e) => match e.kind {
                ReaderErrorKind::InvalidContentType(_) => assert_eq!(e.offset, 33),
                _ => panic!("Unexpected error kind."),
            },
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = scenario_a();
        bytes.push(0x00);
        match decode(&bytes).unwrap_err() {
            Error::ReaderError(e) => assert_eq!(e.kind, ReaderErrorKind::TrailingBytes),
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_reader_resets_after_error() {
        let mut reader = Reader::new();
        let mut garbage = ReadBuffer::new(b"\x42\x42\x42");
        assert!(reader.read(&mut garbage).is_err());
        assert!(garbage.available().is_empty());
        assert_eq!(reader.offset(), 0);

        let bytes = scenario_a();
        match reader.read(&mut ReadBuffer::last(&bytes)).unwrap() {
            ReadStatus::Complete(package) => assert_eq!(package.files().len(), 1),
            ReadStatus::NeedMore => panic!("Expected a package."),
        }
    }

    #[test]
    fn test_read_from_stream() {
        let bytes = encode(rich_package()).unwrap();
        let mut stream: &[u8] = &bytes;
        assert_eq!(read_from_stream(&mut stream).unwrap(), rich_package());
    }

    // Hands out one slice per call to read().
    struct SplitStream {
        reads: Vec<Vec<u8>>,
    }

    impl Read for SplitStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.reads.is_empty() {
                return Ok(0);
            }
            let next = self.reads.remove(0);
            buf[..next.len()].copy_from_slice(&next);
            Ok(next.len())
        }
    }

    #[test]
    fn test_read_from_stream_trailing_bytes_in_later_read() {
        let bytes = encode(rich_package()).unwrap();

        let mut together = bytes.clone();
        together.push(0x00);
        let mut stream = SplitStream { reads: vec![together] };
        match read_from_stream(&mut stream).unwrap_err() {
            Error::ReaderError(e) => assert_eq!(e.kind, ReaderErrorKind::TrailingBytes),
            _ => panic!("Unexpected error type."),
        }

        let mut stream = SplitStream {
            reads: vec![bytes.clone(), vec![0x00]],
        };
        match read_from_stream(&mut stream).unwrap_err() {
            Error::ReaderError(e) => assert_eq!(e.kind, ReaderErrorKind::TrailingBytes),
            _ => panic!("Unexpected error type."),
        }

        let mut stream = SplitStream { reads: vec![bytes] };
        assert_eq!(read_from_stream(&mut stream).unwrap(), rich_package());
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl ContentSink for RecordingSink {
        fn start(&mut self, file_name: &str, content_length: u32) -> io::Result<()> {
            self.events.borrow_mut().push(format!("start {} {}", file_name, content_length));
            Ok(())
        }

        fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
            self.events.borrow_mut().push(format!("write {}", chunk.len()));
            Ok(())
        }

        fn finish(&mut self) -> io::Result<Content> {
            self.events.borrow_mut().push("finish".to_string());
            Ok(Content::Detached)
        }
    }

    #[test]
    fn test_content_is_streamed_to_the_sink() {
        let sink = RecordingSink::default();
        let events = sink.events.clone();
        let bytes = scenario_a();

        let mut reader = Reader::with_sink(sink);
        let split = bytes.len() - 10;
        assert!(matches!(reader.read(&mut ReadBuffer::new(&bytes[..split])).unwrap(), ReadStatus::NeedMore));
        let package = match reader.read(&mut ReadBuffer::last(&bytes[split..])).unwrap() {
            ReadStatus::Complete(package) => package,
            ReadStatus::NeedMore => panic!("Expected a package."),
        };

        assert_eq!(package.files()[0].content(), &Content::Detached);
        assert_eq!(
            *events.borrow(),
            vec![
                format!("start / {}", INDEX.len()),
                format!("write {}", INDEX.len() - 9),
                "write 9".to_string(),
                "finish".to_string(),
            ]
        );
    }

    #[test]
    fn test_decoder_calls_continuation_once() {
        let bytes = scenario_a();
        let result = Rc::new(RefCell::new(None));
        let captured = result.clone();

        let mut decoder = Some(Decoder::new(move |r: Result<Package>| {
            *captured.borrow_mut() = Some(r.map(|p| p.files().len()));
        }));
        for chunk in bytes.chunks(5) {
            decoder = decoder.and_then(|d| d.feed(&mut ReadBuffer::new(chunk)));
        }
        assert!(decoder.is_none());
        assert_eq!(result.borrow_mut().take().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_decoder_reports_truncation() {
        let bytes = scenario_a();
        let result = Rc::new(RefCell::new(None));
        let captured = result.clone();

        let decoder = Decoder::new(move |r: Result<Package>| {
            *captured.borrow_mut() = Some(r.is_err());
        });
        let decoder = decoder.feed(&mut ReadBuffer::new(&bytes[..20])).unwrap();
        assert!(decoder.feed(&mut ReadBuffer::last(&[])).is_none());
        assert_eq!(*result.borrow(), Some(true));
    }
}
