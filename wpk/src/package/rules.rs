// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Byte-level validators for the sub-grammars of the web package format.
//!
//! Several frames carry a payload with no length prefix: the payload ends at the first byte that cannot
//! continue it, which is then the marker of the next frame. Each such payload is described by a small
//! regular grammar, and each grammar is implemented here as a [Scanner]: a state machine that is offered
//! one byte at a time and never backtracks.
//!
//! The same scanners are used by the [Reader](super::reader::Reader), which feeds them bytes as they
//! arrive from the network or disk, and by the [formatter](super::format), which runs them over a whole
//! value before encoding it. Encoder and decoder therefore agree exactly on what is valid.
//!
//! ```text
//! file-name      = "/" ([A-Za-z0-9_-]+ "/")* ([A-Za-z0-9_-]+ ("." [A-Za-z0-9_-]+)?)?
//! domain         = label ("." label)*            ; label = [A-Za-z0-9-]{1,63}
//! build-date     = date "T" time ("Z" | ("+" | "-") [0-9]{2} ":" [0-9]{2})
//! content-type   = top-level "/" [A-Za-z0-9_.+-]+ (";" " "* tchar+ "=" (tchar+ | quoted))*
//! quoted         = DQUOTE [\x20\x21\x23-\x7E]* DQUOTE
//! content-coding = "gzip" | "compress" | "deflate" | "br"
//! ```

/// Upper bound on the length of a file name, keeping metadata frames small.
pub const MAX_FILE_NAME_LENGTH: usize = 1024;

/// Upper bound on the length of a content type.
pub const MAX_CONTENT_TYPE_LENGTH: usize = 255;

/// Upper bound on the length of a domain name (RFC 1035).
pub const MAX_DOMAIN_LENGTH: usize = 253;

const MAX_LABEL_LENGTH: usize = 63;

/// The registered top-level media types that a content type may start with.
pub const TOP_LEVEL_TYPES: [&str; 10] = [
    "application",
    "audio",
    "example",
    "font",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

/// The content coding labels that a package may declare.
pub const CONTENT_CODINGS: [&str; 4] = ["gzip", "compress", "deflate", "br"];

/// The outcome of offering a single byte to a [Scanner].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan {
    /// The byte belongs to the value; more may follow.
    Accept,
    /// The byte belongs to the value, and completes it. The value cannot be extended any further.
    Complete,
    /// The byte does not belong to the value, and the bytes seen so far form a complete value. The byte
    /// has not been consumed.
    Done,
    /// The value is malformed.
    Reject,
}

/// A byte-at-a-time recogniser for one of the sub-grammars.
pub trait Scanner: Default {
    /// Offers the next byte of the value.
    fn feed(&mut self, byte: u8) -> Scan;

    /// Whether the bytes offered so far form a complete value, were the value to end here.
    fn is_accepting(&self) -> bool;
}

/// Runs a scanner over a complete value, which is valid only if every byte is accepted and the scanner
/// finishes in an accepting state.
pub fn validate<S: Scanner>(value: &[u8]) -> bool {
    let mut scanner = S::default();
    for (i, byte) in value.iter().enumerate() {
        match scanner.feed(*byte) {
            Scan::Accept => continue,
            Scan::Complete => return i + 1 == value.len(),
            Scan::Done | Scan::Reject => return false,
        }
    }
    scanner.is_accepting()
}

pub fn is_valid_file_name(file_name: &str) -> bool {
    validate::<FileNameScanner>(file_name.as_bytes())
}

pub fn is_valid_content_type(content_type: &str) -> bool {
    validate::<ContentTypeScanner>(content_type.as_bytes())
}

pub fn is_valid_domain(domain: &str) -> bool {
    validate::<DomainScanner>(domain.as_bytes())
}

fn is_segment_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

fn is_subtype_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-' | b'+')
}

// RFC 7230 token characters.
fn is_tchar(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

fn is_qtext(byte: u8) -> bool {
    byte == 0x20 || byte == 0x21 || (0x23..=0x7E).contains(&byte)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileNameState {
    Root,
    SegmentStart,
    Segment,
    ExtensionStart,
    Extension,
}

/// Recognises an absolute, slash-separated file name.
#[derive(Clone, Debug)]
pub struct FileNameScanner {
    state: FileNameState,
    length: usize,
}

impl Default for FileNameScanner {
    fn default() -> Self {
        FileNameScanner {
            state: FileNameState::Root,
            length: 0,
        }
    }
}

impl Scanner for FileNameScanner {
    fn feed(&mut self, byte: u8) -> Scan {
        use FileNameState::*;

        let (next, scan) = match (self.state, byte) {
            (Root, b'/') => (SegmentStart, Scan::Accept),
            (Root, _) => return Scan::Reject,
            (SegmentStart, b) if is_segment_byte(b) => (Segment, Scan::Accept),
            (SegmentStart, _) => return Scan::Done,
            (Segment, b) if is_segment_byte(b) => (Segment, Scan::Accept),
            (Segment, b'/') => (SegmentStart, Scan::Accept),
            (Segment, b'.') => (ExtensionStart, Scan::Accept),
            (Segment, _) => return Scan::Done,
            (ExtensionStart, b) if is_segment_byte(b) => (Extension, Scan::Accept),
            (ExtensionStart, _) => return Scan::Reject,
            (Extension, b) if is_segment_byte(b) => (Extension, Scan::Accept),
            (Extension, _) => return Scan::Done,
        };

        self.length += 1;
        if self.length > MAX_FILE_NAME_LENGTH {
            return Scan::Reject;
        }
        self.state = next;
        scan
    }

    fn is_accepting(&self) -> bool {
        matches!(
            self.state,
            FileNameState::SegmentStart | FileNameState::Segment | FileNameState::Extension
        )
    }
}

/// Recognises a dotted domain name.
#[derive(Clone, Debug, Default)]
pub struct DomainScanner {
    in_label: bool,
    label_length: usize,
    length: usize,
}

impl Scanner for DomainScanner {
    fn feed(&mut self, byte: u8) -> Scan {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            self.in_label = true;
            self.label_length += 1;
        } else if byte == b'.' && self.in_label {
            self.in_label = false;
            self.label_length = 0;
        } else if self.in_label {
            return Scan::Done;
        } else {
            return Scan::Reject;
        }

        self.length += 1;
        if self.length > MAX_DOMAIN_LENGTH || self.label_length > MAX_LABEL_LENGTH {
            return Scan::Reject;
        }
        Scan::Accept
    }

    fn is_accepting(&self) -> bool {
        self.in_label
    }
}

/// Recognises an ISO-8601 timestamp of the form `2021-11-19T16:41:23Z` or `2021-11-19T16:41:23+02:00`.
///
/// Only the shape and the digit ranges are checked here; whether the date actually exists (such as
/// 30 February) is left to the caller, which parses the completed value.
#[derive(Clone, Debug, Default)]
pub struct BuildDateScanner {
    position: usize,
    previous: u8,
    complete: bool,
}

impl Scanner for BuildDateScanner {
    fn feed(&mut self, byte: u8) -> Scan {
        if self.complete {
            return Scan::Done;
        }

        let digit = byte.is_ascii_digit();
        let accepted = match self.position {
            0..=3 => digit,
            4 | 7 => byte == b'-',
            5 => byte == b'0' || byte == b'1',
            6 => match self.previous {
                b'0' => (b'1'..=b'9').contains(&byte),
                _ => (b'0'..=b'2').contains(&byte),
            },
            8 => (b'0'..=b'3').contains(&byte),
            9 => match self.previous {
                b'0' => (b'1'..=b'9').contains(&byte),
                b'3' => byte == b'0' || byte == b'1',
                _ => digit,
            },
            10 => byte == b'T',
            11 => (b'0'..=b'2').contains(&byte),
            12 => match self.previous {
                b'2' => (b'0'..=b'3').contains(&byte),
                _ => digit,
            },
            13 | 16 | 22 => byte == b':',
            14 | 17 => (b'0'..=b'5').contains(&byte),
            15 | 18 | 20 | 21 | 23 | 24 => digit,
            19 => byte == b'Z' || byte == b'+' || byte == b'-',
            _ => false,
        };

        if !accepted {
            return Scan::Reject;
        }

        self.previous = byte;
        self.position += 1;
        if (self.position == 20 && byte == b'Z') || self.position == 25 {
            self.complete = true;
            return Scan::Complete;
        }
        Scan::Accept
    }

    fn is_accepting(&self) -> bool {
        self.complete
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ContentTypeState {
    TopLevel,
    SubtypeStart,
    Subtype,
    ParameterStart,
    ParameterName,
    ValueStart,
    BareValue,
    QuotedValue,
    QuotedClosed,
}

/// Recognises a media type with optional parameters, such as `text/html; charset="us-ascii"`.
#[derive(Clone, Debug)]
pub struct ContentTypeScanner {
    state: ContentTypeState,
    top_level: [u8; 11],
    top_level_length: usize,
    length: usize,
}

impl Default for ContentTypeScanner {
    fn default() -> Self {
        ContentTypeScanner {
            state: ContentTypeState::TopLevel,
            top_level: [0; 11],
            top_level_length: 0,
            length: 0,
        }
    }
}

impl ContentTypeScanner {
    fn top_level_is_registered(&self) -> bool {
        let name = &self.top_level[..self.top_level_length];
        TOP_LEVEL_TYPES
            .iter()
            .any(|candidate| candidate.as_bytes().eq_ignore_ascii_case(name))
    }
}

impl Scanner for ContentTypeScanner {
    fn feed(&mut self, byte: u8) -> Scan {
        use ContentTypeState::*;

        let next = match (self.state, byte) {
            (TopLevel, b'/') if self.top_level_is_registered() => SubtypeStart,
            (TopLevel, b) if b.is_ascii_alphabetic() && self.top_level_length < self.top_level.len() => {
                self.top_level[self.top_level_length] = b;
                self.top_level_length += 1;
                TopLevel
            }
            (TopLevel, _) => return Scan::Reject,
            (SubtypeStart, b) | (Subtype, b) if is_subtype_byte(b) => Subtype,
            (SubtypeStart, _) => return Scan::Reject,
            (ParameterStart, b' ') => ParameterStart,
            (ParameterStart, b) | (ParameterName, b) if is_tchar(b) => ParameterName,
            (ParameterStart, _) => return Scan::Reject,
            (ParameterName, b'=') => ValueStart,
            (ParameterName, _) => return Scan::Reject,
            (ValueStart, b'"') => QuotedValue,
            (ValueStart, b) | (BareValue, b) if is_tchar(b) => BareValue,
            (ValueStart, _) => return Scan::Reject,
            (QuotedValue, b'"') => QuotedClosed,
            (QuotedValue, b) if is_qtext(b) => QuotedValue,
            (QuotedValue, _) => return Scan::Reject,
            (Subtype, b';') | (BareValue, b';') | (QuotedClosed, b';') => ParameterStart,
            (Subtype, _) | (BareValue, _) | (QuotedClosed, _) => return Scan::Done,
        };

        self.length += 1;
        if self.length > MAX_CONTENT_TYPE_LENGTH {
            return Scan::Reject;
        }
        self.state = next;
        Scan::Accept
    }

    fn is_accepting(&self) -> bool {
        matches!(
            self.state,
            ContentTypeState::Subtype | ContentTypeState::BareValue | ContentTypeState::QuotedClosed
        )
    }
}

/// Recognises one of the content coding labels, ignoring ASCII case. No label is a prefix of another, so
/// the scanner completes as soon as a whole label has been seen.
#[derive(Clone, Debug, Default)]
pub struct ContentCodingScanner {
    seen: [u8; 8],
    length: usize,
}

impl Scanner for ContentCodingScanner {
    fn feed(&mut self, byte: u8) -> Scan {
        if self.length == self.seen.len() {
            return Scan::Reject;
        }
        self.seen[self.length] = byte.to_ascii_lowercase();
        self.length += 1;

        let seen = &self.seen[..self.length];
        if CONTENT_CODINGS.iter().any(|label| label.as_bytes() == seen) {
            Scan::Complete
        } else if CONTENT_CODINGS.iter().any(|label| label.as_bytes().starts_with(seen)) {
            Scan::Accept
        } else {
            Scan::Reject
        }
    }

    fn is_accepting(&self) -> bool {
        let seen = &self.seen[..self.length];
        CONTENT_CODINGS.iter().any(|label| label.as_bytes() == seen)
    }
}
