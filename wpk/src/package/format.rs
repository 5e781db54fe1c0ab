// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Frame formatters.
//!
//! Each frame kind has a `format_*` function that validates a field value and produces the exact bytes of
//! its frame, marker included, and a `length_*` function that predicts the size of that frame without
//! producing it. For every legal value `length_x(v) == format_x(v)?.len()`, which is what lets the
//! [Writer](super::writer::Writer) decide whether a frame fits before it writes a single byte of it.

use super::error::FormatError;
use super::rules;
use super::token::*;
use super::{ContentEncoding, FileEntry, Package};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use std::convert::TryFrom;

/// The largest frame that is never split across writes: a certificate of maximum size.
pub const MAX_FRAME_LENGTH: usize = 1 + 2 + MAX_CERTIFICATE_LENGTH;

pub fn format_signature(signature: Option<&[u8]>) -> Result<Vec<u8>, FormatError> {
    let signature = signature.unwrap_or_default();
    let length = u8::try_from(signature.len()).map_err(|_| FormatError::SignatureTooLarge(signature.len()))?;

    let mut frame = Vec::with_capacity(length_signature(Some(signature)));
    frame.push(SIGNATURE);
    frame.extend_from_slice(MAGIC);
    frame.push(length);
    frame.extend_from_slice(signature);
    Ok(frame)
}

pub fn length_signature(signature: Option<&[u8]>) -> usize {
    1 + MAGIC.len() + 1 + signature.map_or(0, |s| s.len())
}

pub fn format_domain(domain: &str) -> Result<Vec<u8>, FormatError> {
    if !rules::is_valid_domain(domain) {
        return Err(FormatError::InvalidDomain(domain.to_string()));
    }
    Ok(marked(DOMAIN, domain.as_bytes()))
}

pub fn length_domain(domain: &str) -> usize {
    1 + domain.len()
}

/// Build dates are always written in UTC with whole seconds, such as `2021-11-19T16:41:23Z`.
pub fn format_build_date(build_date: &DateTime<Utc>) -> Result<Vec<u8>, FormatError> {
    if !(0..=9999).contains(&build_date.year()) {
        return Err(FormatError::BuildDateOutOfRange(build_date.to_string()));
    }
    let text = build_date.to_rfc3339_opts(SecondsFormat::Secs, true);
    Ok(marked(BUILD_DATE, text.as_bytes()))
}

pub fn length_build_date(_build_date: &DateTime<Utc>) -> usize {
    1 + "YYYY-MM-DDTHH:MM:SSZ".len()
}

pub fn format_certificate(certificate: &[u8]) -> Result<Vec<u8>, FormatError> {
    let length =
        u16::try_from(certificate.len()).map_err(|_| FormatError::CertificateTooLarge(certificate.len()))?;

    let mut frame = Vec::with_capacity(length_certificate(certificate));
    frame.push(CERTIFICATE);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(certificate);
    Ok(frame)
}

pub fn length_certificate(certificate: &[u8]) -> usize {
    1 + 2 + certificate.len()
}

pub fn format_content_encoding(content_encoding: ContentEncoding) -> Vec<u8> {
    marked(CONTENT_ENCODING, content_encoding.as_str().as_bytes())
}

pub fn length_content_encoding(content_encoding: ContentEncoding) -> usize {
    1 + content_encoding.as_str().len()
}

pub fn format_file_name(file_name: &str) -> Result<Vec<u8>, FormatError> {
    if !rules::is_valid_file_name(file_name) {
        return Err(FormatError::InvalidFileName(file_name.to_string()));
    }
    Ok(marked(FILE_NAME, file_name.as_bytes()))
}

pub fn length_file_name(file_name: &str) -> usize {
    1 + file_name.len()
}

pub fn format_content_type(content_type: &str) -> Result<Vec<u8>, FormatError> {
    if !rules::is_valid_content_type(content_type) {
        return Err(FormatError::InvalidContentType(content_type.to_string()));
    }
    Ok(marked(CONTENT_TYPE, content_type.as_bytes()))
}

pub fn length_content_type(content_type: &str) -> usize {
    1 + content_type.len()
}

pub fn format_content_hash(content_hash: &[u8; CONTENT_HASH_LENGTH]) -> Vec<u8> {
    marked(CONTENT_HASH, content_hash)
}

pub fn length_content_hash(_content_hash: &[u8; CONTENT_HASH_LENGTH]) -> usize {
    1 + CONTENT_HASH_LENGTH
}

/// Content lengths are written as a 3-byte big-endian integer.
pub fn format_content_length(content_length: u32) -> Result<Vec<u8>, FormatError> {
    if content_length >= CONTENT_LENGTH_LIMIT {
        return Err(FormatError::ContentLengthOutOfRange(content_length as u64));
    }
    Ok(marked(CONTENT_LENGTH, &content_length.to_be_bytes()[1..]))
}

pub fn length_content_length(_content_length: u32) -> usize {
    1 + CONTENT_LENGTH_WIDTH
}

pub fn format_start_content() -> Vec<u8> {
    vec![START_CONTENT]
}

pub fn length_start_content() -> usize {
    1
}

pub fn format_end_of_files() -> Vec<u8> {
    vec![END_OF_FILES]
}

pub fn length_end_of_files() -> usize {
    1
}

/// The size of the frames that precede the content of a file.
pub fn length_file_head(file: &FileEntry) -> usize {
    length_file_name(file.file_name())
        + length_content_type(file.content_type())
        + file.content_hash().map_or(0, length_content_hash)
        + length_content_length(file.content_length())
        + length_start_content()
}

/// The size of the encoded package, content included. Useful to announce a length up front, such as in an
/// HTTP `Content-Length` header, before streaming the package.
pub fn length_package(package: &Package) -> u64 {
    let head = length_signature(package.signature())
        + package.domain().map_or(0, length_domain)
        + length_build_date(package.build_date())
        + package.certificate().map_or(0, length_certificate)
        + package.content_encoding().map_or(0, length_content_encoding);

    let files: u64 = package
        .files()
        .iter()
        .map(|file| length_file_head(file) as u64 + file.content_length() as u64)
        .sum();

    head as u64 + files + length_end_of_files() as u64
}

fn marked(marker: u8, value: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + value.len());
    frame.push(marker);
    frame.extend_from_slice(value);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unsigned_signature_frame() {
        let frame = format_signature(None).unwrap();
        assert_eq!(frame, b"\x89WPK\r\n\x1A\n\x00");
        assert_eq!(frame.len(), length_signature(None));
    }

    #[test]
    fn test_signature_frame_carries_length() {
        let signature = vec![0xAB; 255];
        let frame = format_signature(Some(&signature)).unwrap();
        assert_eq!(frame[8], 255);
        assert_eq!(&frame[9..], &signature[..]);
        assert_eq!(frame.len(), length_signature(Some(&signature)));
    }

    #[test]
    fn test_oversized_signature_is_rejected() {
        let signature = vec![0u8; 256];
        assert_eq!(
            format_signature(Some(&signature)).unwrap_err(),
            FormatError::SignatureTooLarge(256)
        );
    }

    #[test]
    fn test_build_date_frame() {
        let date = Utc.ymd(2021, 11, 19).and_hms(16, 41, 23);
        let frame = format_build_date(&date).unwrap();
        assert_eq!(frame, b"\x022021-11-19T16:41:23Z");
        assert_eq!(frame.len(), length_build_date(&date));
    }

    #[test]
    fn test_build_date_beyond_four_digit_years_is_rejected() {
        let date = Utc.ymd(10000, 1, 1).and_hms(0, 0, 0);
        match format_build_date(&date).unwrap_err() {
            FormatError::BuildDateOutOfRange(_) => (),
            _ => panic!("Unexpected error type."),
        }
    }

    #[test]
    fn test_content_length_is_three_bytes_big_endian() {
        assert_eq!(format_content_length(0).unwrap(), vec![0x13, 0, 0, 0]);
        assert_eq!(format_content_length(0x01_02_03).unwrap(), vec![0x13, 1, 2, 3]);
        assert_eq!(
            format_content_length(CONTENT_LENGTH_LIMIT - 1).unwrap(),
            vec![0x13, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            format_content_length(CONTENT_LENGTH_LIMIT).unwrap_err(),
            FormatError::ContentLengthOutOfRange(1 << 24)
        );
    }

    #[test]
    fn test_certificate_frame() {
        let frame = format_certificate(&[1, 2, 3]).unwrap();
        assert_eq!(frame, vec![0x03, 0x00, 0x03, 1, 2, 3]);
        assert_eq!(frame.len(), length_certificate(&[1, 2, 3]));

        let oversized = vec![0u8; MAX_CERTIFICATE_LENGTH + 1];
        assert_eq!(
            format_certificate(&oversized).unwrap_err(),
            FormatError::CertificateTooLarge(MAX_CERTIFICATE_LENGTH + 1)
        );
        assert_eq!(
            format_certificate(&oversized[1..]).unwrap().len(),
            MAX_FRAME_LENGTH
        );
    }

    #[test]
    fn test_text_frames_validate_their_values() {
        assert_eq!(format_file_name("/index.html").unwrap(), b"\x10/index.html");
        assert_eq!(format_content_type("text/html").unwrap(), b"\x11text/html");
        assert_eq!(format_domain("example.com").unwrap(), b"\x01example.com");

        assert_eq!(
            format_file_name("index.html").unwrap_err(),
            FormatError::InvalidFileName("index.html".to_string())
        );
        assert_eq!(
            format_content_type("text").unwrap_err(),
            FormatError::InvalidContentType("text".to_string())
        );
        assert_eq!(
            format_domain("example..com").unwrap_err(),
            FormatError::InvalidDomain("example..com".to_string())
        );
    }

    #[test]
    fn test_lengths_agree_with_formatters() {
        for name in &["/", "/a", "/assets/app.js"] {
            assert_eq!(format_file_name(name).unwrap().len(), length_file_name(name));
        }
        for content_type in &["text/html", "text/html; charset=utf-8", "image/svg+xml"] {
            assert_eq!(
                format_content_type(content_type).unwrap().len(),
                length_content_type(content_type)
            );
        }
        for encoding in &[
            ContentEncoding::Gzip,
            ContentEncoding::Compress,
            ContentEncoding::Deflate,
            ContentEncoding::Br,
        ] {
            assert_eq!(
                format_content_encoding(*encoding).len(),
                length_content_encoding(*encoding)
            );
        }
        let hash = [7u8; CONTENT_HASH_LENGTH];
        assert_eq!(format_content_hash(&hash).len(), length_content_hash(&hash));
        assert_eq!(format_start_content().len(), length_start_content());
        assert_eq!(format_end_of_files().len(), length_end_of_files());
    }
}
