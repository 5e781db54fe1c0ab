// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Incremental encoding of web packages.
//!
//! The [Writer] emits a package into a [ByteSink] of whatever size the caller provides. Metadata frames are
//! atomic: a frame is written whole or not at all, so a sink must have room for at least
//! [MAX_FRAME_LENGTH] bytes when it is empty. A frame larger than the sink's whole capacity fails with
//! [FormatError::SinkTooSmall]. Content is written in pieces of any size, pulled from memory
//! or from a stream as room becomes available.

use super::buffer::{ByteSink, WriteBuffer};
use super::error::FormatError;
use super::format::{self, MAX_FRAME_LENGTH};
use super::{Content, Package, Result};
use log::debug;
use std::io::Write;

/// The outcome of offering room to a [Writer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    /// The sink is full. Drain it and call [write](Writer::write) again.
    NeedCapacity,

    /// The whole package has been written.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
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
    Finished,
}

/// A resumable package encoder.
#[derive(Debug)]
pub struct Writer {
    package: Package,
    state: State,
    file: usize,
    written: u32,
}

impl Writer {
    pub fn new(package: Package) -> Writer {
        Writer {
            package,
            state: State::Signature,
            file: 0,
            written: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Gives back the package. Streamed content that has been written is consumed.
    pub fn into_package(self) -> Package {
        self.package
    }

    /// Writes as much of the package as fits into `sink`.
    ///
    /// Calling this again after [WriteStatus::Finished] writes nothing and reports `Finished` again.
    pub fn write<K: ByteSink>(&mut self, sink: &mut K) -> Result<WriteStatus> {
        loop {
            if self.state == State::Content {
                if !self.write_content(sink)? {
                    return Ok(WriteStatus::NeedCapacity);
                }
                self.file += 1;
                self.state = State::FileName;
                continue;
            }

            let package = &self.package;
            let file = package.files().get(self.file);

            let next = match (self.state, file) {
                (State::Signature, _) => {
                    let signature = package.signature();
                    if !put(sink, format::length_signature(signature), || format::format_signature(signature))? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    State::Domain
                }
                (State::Domain, _) => {
                    if let Some(domain) = package.domain() {
                        if !put(sink, format::length_domain(domain), || format::format_domain(domain))? {
                            return Ok(WriteStatus::NeedCapacity);
                        }
                    }
                    State::BuildDate
                }
                (State::BuildDate, _) => {
                    let build_date = package.build_date();
                    if !put(sink, format::length_build_date(build_date), || {
                        format::format_build_date(build_date)
                    })? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    State::Certificate
                }
                (State::Certificate, _) => {
                    if let Some(certificate) = package.certificate() {
                        if !put(sink, format::length_certificate(certificate), || {
                            format::format_certificate(certificate)
                        })? {
                            return Ok(WriteStatus::NeedCapacity);
                        }
                    }
                    State::ContentEncoding
                }
                (State::ContentEncoding, _) => {
                    if let Some(encoding) = package.content_encoding() {
                        if !put(sink, format::length_content_encoding(encoding), || {
                            Ok(format::format_content_encoding(encoding))
                        })? {
                            return Ok(WriteStatus::NeedCapacity);
                        }
                    }
                    State::FileName
                }
                (State::FileName, None) => State::EndOfFiles,
                (State::FileName, Some(file)) => {
                    let name = file.file_name();
                    if !put(sink, format::length_file_name(name), || format::format_file_name(name))? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    debug!("Encoding {} ({} bytes)", name, file.content_length());
                    State::ContentType
                }
                (State::ContentType, Some(file)) => {
                    let content_type = file.content_type();
                    if !put(sink, format::length_content_type(content_type), || {
                        format::format_content_type(content_type)
                    })? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    State::ContentHash
                }
                (State::ContentHash, Some(file)) => {
                    if let Some(hash) = file.content_hash() {
                        if !put(sink, format::length_content_hash(hash), || Ok(format::format_content_hash(hash)))? {
                            return Ok(WriteStatus::NeedCapacity);
                        }
                    }
                    State::ContentLength
                }
                (State::ContentLength, Some(file)) => {
                    let length = file.content_length();
                    if let Content::Detached = file.content() {
                        return Err(FormatError::DetachedContent(file.file_name().to_string()).into());
                    }
                    if !put(sink, format::length_content_length(length), || {
                        format::format_content_length(length)
                    })? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    State::StartContent
                }
                (State::StartContent, Some(_)) => {
                    if !put(sink, format::length_start_content(), || Ok(format::format_start_content()))? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    self.written = 0;
                    State::Content
                }
                (State::EndOfFiles, _) => {
                    if !put(sink, format::length_end_of_files(), || Ok(format::format_end_of_files()))? {
                        return Ok(WriteStatus::NeedCapacity);
                    }
                    State::Finished
                }
                (State::Finished, _) => return Ok(WriteStatus::Finished),
                (State::Content, _) | (_, None) => State::EndOfFiles,
            };
            self.state = next;
        }
    }

    // Writes content of the current file until it is complete (true) or the sink is full (false).
    fn write_content<K: ByteSink>(&mut self, sink: &mut K) -> Result<bool> {
        let file = &mut self.package.files_mut()[self.file];
        let declared = file.content_length();

        while self.written < declared {
            let remaining = (declared - self.written) as usize;
            if sink.remaining() == 0 {
                return Ok(false);
            }
            let count = match file.content_mut() {
                Content::Bytes(bytes) => {
                    let start = self.written as usize;
                    let count = remaining.min(sink.remaining());
                    sink.append(&bytes[start..start + count]);
                    count
                }
                Content::Stream(reader) => sink.append_from(reader.as_mut(), remaining)?,
                Content::Detached => 0,
            };
            if count == 0 {
                return Err(FormatError::ContentLengthMismatch {
                    file_name: file.file_name().to_string(),
                    declared,
                }
                .into());
            }
            self.written += count as u32;
        }
        Ok(true)
    }
}

// Appends a whole frame if it fits. The frame is only formatted once it is known to fit.
fn put<K, F>(sink: &mut K, length: usize, frame: F) -> Result<bool>
where
    K: ByteSink,
    F: FnOnce() -> std::result::Result<Vec<u8>, FormatError>,
{
    if sink.capacity() < length {
        return Err(FormatError::SinkTooSmall {
            frame_length: length,
            capacity: sink.capacity(),
        }
        .into());
    }
    if sink.remaining() < length {
        return Ok(false);
    }
    let bytes = frame()?;
    debug_assert_eq!(bytes.len(), length);
    sink.append(&bytes);
    Ok(true)
}

/// Encodes a package in memory.
pub fn encode(package: Package) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(package.encoded_length() as usize);
    let mut writer = Writer::new(package);
    writer.write(&mut bytes)?;
    Ok(bytes)
}

/// Encodes a package into a stream, through a buffer of [MAX_FRAME_LENGTH] bytes.
pub fn write_to_stream<W: Write>(package: Package, stream: &mut W) -> Result<()> {
    let mut writer = Writer::new(package);
    let mut buffer = WriteBuffer::with_capacity(MAX_FRAME_LENGTH);
    loop {
        let status = writer.write(&mut buffer)?;
        stream.write_all(buffer.as_slice())?;
        buffer.clear();
        if status == WriteStatus::Finished {
            break;
        }
    }
    stream.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::error::Error;
    use crate::package::token::CONTENT_LENGTH_LIMIT;
    use crate::package::{decode, ContentEncoding, FileEntry};
    use chrono::{DateTime, TimeZone, Utc};
    use std::io::{self, Read};

    fn date() -> DateTime<Utc> {
        Utc.ymd(2021, 11, 19).and_hms(16, 41, 23)
    }

    fn package() -> Package {
        Package::new(date())
            .with_domain("example.com")
            .unwrap()
            .with_content_encoding(ContentEncoding::Br)
            .with_file(FileEntry::from_bytes("/index.html", "text/html", b"<!doctype html>".to_vec()).unwrap())
            .unwrap()
            .with_file(FileEntry::from_bytes("/style.css", "text/css", b"body { margin: 0 }".to_vec()).unwrap())
            .unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode(Package::new(date())).unwrap();
        let mut expected = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        expected.extend_from_slice(b"\x022021-11-19T16:41:23Z\x00");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_scenario_a_layout() {
        let content = b"<!doctype html><html></html>".to_vec();
        let length = content.len() as u32;
        let file = FileEntry::new("/", "text/html; charset=us-ascii", length, Content::Bytes(content.clone())).unwrap();
        let bytes = encode(Package::new(date()).with_file(file).unwrap()).unwrap();

        let mut expected = b"\x89WPK\r\n\x1A\n\x00".to_vec();
        expected.extend_from_slice(b"\x022021-11-19T16:41:23Z");
        expected.extend_from_slice(b"\x10/");
        expected.extend_from_slice(b"\x11text/html; charset=us-ascii");
        expected.extend_from_slice(&[0x13, 0x00, 0x00, length as u8, 0xFF]);
        expected.extend_from_slice(&content);
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_unknown_top_level_type_is_a_format_error() {
        // Scenario C on the encoding side.
        match FileEntry::new("/a", "bogus-type/x", 0, Content::Bytes(Vec::new())).unwrap_err() {
            Error::FormatError(FormatError::InvalidContentType(value)) => assert_eq!(value, "bogus-type/x"),
            _ => panic!("Unexpected error type."),
        }
        assert_eq!(
            format::format_content_type("bogus-type/x").unwrap_err(),
            FormatError::InvalidContentType("bogus-type/x".to_string())
        );
    }

    #[test]
    fn test_encoded_length_is_exact() {
        let bytes = encode(package()).unwrap();
        assert_eq!(bytes.len() as u64, package().encoded_length());
    }

    #[test]
    fn test_small_buffers_produce_identical_output() {
        let expected = encode(package()).unwrap();
        // Room for the largest frame in the package, a content hash.
        let smallest = format::length_content_hash(&[0; 32]);

        for capacity in smallest..expected.len() + 1 {
            let mut writer = Writer::new(package());
            let mut buffer = WriteBuffer::with_capacity(capacity);
            let mut output = Vec::new();
            while writer.write(&mut buffer).unwrap() == WriteStatus::NeedCapacity {
                output.extend(buffer.take());
            }
            output.extend(buffer.take());
            assert_eq!(output, expected, "capacity {}", capacity);
            assert!(writer.is_finished());
        }
    }

    #[test]
    fn test_frames_are_never_split() {
        let mut writer = Writer::new(package());
        let mut buffer = WriteBuffer::with_capacity(format::length_signature(None) + 5);
        assert_eq!(writer.write(&mut buffer).unwrap(), WriteStatus::NeedCapacity);
        // The domain frame needs 12 bytes and must not be started.
        assert_eq!(buffer.as_slice(), b"\x89WPK\r\n\x1A\n\x00");
    }

    #[test]
    fn test_sink_smaller_than_a_frame() {
        let mut writer = Writer::new(package());
        let mut buffer = WriteBuffer::with_capacity(8);
        match writer.write(&mut buffer).unwrap_err() {
            Error::FormatError(FormatError::SinkTooSmall { frame_length, capacity }) => {
                assert_eq!(frame_length, format::length_signature(None));
                assert_eq!(capacity, 8);
            }
            _ => panic!("Unexpected error type."),
        }
        assert!(buffer.is_empty());
        assert!(!writer.is_finished());
    }

    #[test]
    fn test_finished_writer_stays_finished() {
        let mut writer = Writer::new(Package::new(date()));
        let mut sink: Vec<u8> = Vec::new();
        assert_eq!(writer.write(&mut sink).unwrap(), WriteStatus::Finished);
        let length = sink.len();
        assert_eq!(writer.write(&mut sink).unwrap(), WriteStatus::Finished);
        assert_eq!(sink.len(), length);
        assert_eq!(writer.into_package(), Package::new(date()));
    }

    #[test]
    fn test_streamed_content() {
        let content: &'static [u8] = b"streamed content";
        let file = FileEntry::new(
            "/stream.txt",
            "text/plain",
            content.len() as u32,
            Content::Stream(Box::new(content)),
        )
        .unwrap();
        let package = Package::new(date()).with_file(file).unwrap();

        let mut output: Vec<u8> = Vec::new();
        write_to_stream(package, &mut output).unwrap();

        let decoded = decode(&output).unwrap();
        assert_eq!(decoded.get("/stream.txt").unwrap().content().as_bytes(), Some(content));
    }

    #[test]
    fn test_short_stream_is_a_format_error() {
        let file = FileEntry::new(
            "/short.txt",
            "text/plain",
            10,
            Content::Stream(Box::new(&b"short"[..])),
        )
        .unwrap();
        let package = Package::new(date()).with_file(file).unwrap();

        match encode(package).unwrap_err() {
            Error::FormatError(FormatError::ContentLengthMismatch { file_name, declared }) => {
                assert_eq!(file_name, "/short.txt");
                assert_eq!(declared, 10);
            }
            _ => panic!("Unexpected error type."),
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_stream_failure_is_an_io_error() {
        let file = FileEntry::new("/a", "text/plain", 1, Content::Stream(Box::new(FailingReader))).unwrap();
        let package = Package::new(date()).with_file(file).unwrap();
        match encode(package).unwrap_err() {
            Error::IoError(e) => assert_eq!(e.to_string(), "disk on fire"),
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_detached_content_cannot_be_encoded() {
        let file = FileEntry::new("/a", "text/plain", 1, Content::Detached).unwrap();
        let package = Package::new(date()).with_file(file).unwrap();
        match encode(package).unwrap_err() {
            Error::FormatError(FormatError::DetachedContent(name)) => assert_eq!(name, "/a"),
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_largest_content_length() {
        let length = CONTENT_LENGTH_LIMIT - 1;
        let content = vec![0xA5u8; length as usize];
        let package = Package::new(date())
            .with_file(FileEntry::from_bytes("/big.bin", "application/octet-stream", content).unwrap())
            .unwrap();

        let bytes = encode(package).unwrap();
        let decoded = decode(&bytes).unwrap();
        let file = decoded.get("/big.bin").unwrap();
        assert_eq!(file.content_length(), length);
        assert!(file.verify_content().is_ok());

        let too_big = vec![0u8; CONTENT_LENGTH_LIMIT as usize];
        match FileEntry::from_bytes("/big.bin", "application/octet-stream", too_big).unwrap_err() {
            Error::FormatError(FormatError::ContentLengthOutOfRange(n)) => assert_eq!(n, 1 << 24),
            _ => panic!("Unexpected error type."),
        }
    }
}
