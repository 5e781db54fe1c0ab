// Copyright 2021 Contributors to the Web Package project.
// SPDX-License-Identifier: MIT

//! Byte buffers shared by the [Reader](super::reader::Reader) and [Writer](super::writer::Writer).
//!
//! Neither side of the codec ever sees a whole package. The reader is handed one chunk at a time through a
//! [ByteSource], and the writer fills whatever room a [ByteSink] offers. The caller owns both buffers and
//! decides where the bytes come from and where they go.

use std::io::{self, ErrorKind, Read};

/// A chunk of input bytes with a read position.
pub trait ByteSource {
    /// The byte at the read position, if any.
    fn current(&self) -> Option<u8> {
        self.available().first().copied()
    }

    /// The unread bytes of the chunk.
    fn available(&self) -> &[u8];

    /// Moves the read position forward by `count` bytes, or to the end of the chunk.
    fn advance(&mut self, count: usize);

    /// Remembers the read position, so that the bytes read since can be retrieved with `marked`.
    fn mark(&mut self);

    /// The bytes between the last mark and the read position.
    fn marked(&self) -> &[u8];

    /// Discards all unread bytes. Used to leave the input in a clean state after an error.
    fn reset(&mut self);

    /// Whether this chunk is the final chunk of the input.
    fn is_last_chunk(&self) -> bool;
}

/// Room for output bytes.
pub trait ByteSink {
    /// How many more bytes can be appended.
    fn remaining(&self) -> usize;

    /// How many bytes the sink holds when empty.
    fn capacity(&self) -> usize;

    /// Appends bytes. The caller must check `remaining` first.
    fn append(&mut self, bytes: &[u8]);

    /// Appends at most `limit` bytes read from `reader`, bounded by the remaining room. Returns the number of
    /// bytes appended, which is zero only if the reader is exhausted or there is no room.
    fn append_from(&mut self, reader: &mut dyn Read, limit: usize) -> io::Result<usize>;
}

/// A [ByteSource] over a borrowed slice.
#[derive(Debug)]
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    position: usize,
    mark: usize,
    last: bool,
}

impl<'a> ReadBuffer<'a> {
    /// A chunk that more chunks will follow.
    pub fn new(data: &'a [u8]) -> ReadBuffer<'a> {
        ReadBuffer {
            data,
            position: 0,
            mark: 0,
            last: false,
        }
    }

    /// The final chunk of the input. It may be empty, which simply signals the end of the input.
    pub fn last(data: &'a [u8]) -> ReadBuffer<'a> {
        ReadBuffer {
            last: true,
            ..ReadBuffer::new(data)
        }
    }

    /// How many bytes of the chunk have been consumed.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<'a> ByteSource for ReadBuffer<'a> {
    fn available(&self) -> &[u8] {
        &self.data[self.position..]
    }

    fn advance(&mut self, count: usize) {
        self.position = self.data.len().min(self.position + count);
    }

    fn mark(&mut self) {
        self.mark = self.position;
    }

    fn marked(&self) -> &[u8] {
        &self.data[self.mark..self.position]
    }

    fn reset(&mut self) {
        self.position = self.data.len();
        self.mark = self.position;
    }

    fn is_last_chunk(&self) -> bool {
        self.last
    }
}

/// A bounded [ByteSink]. The capacity is fixed at construction, and the caller drains the buffer with
/// `take` or `clear` to make room again.
#[derive(Debug)]
pub struct WriteBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl WriteBuffer {
    pub fn with_capacity(capacity: usize) -> WriteBuffer {
        WriteBuffer {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Removes and returns the buffered bytes.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.data, Vec::with_capacity(self.capacity))
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl ByteSink for WriteBuffer {
    fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn append(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= self.remaining());
        self.data.extend_from_slice(bytes);
    }

    fn append_from(&mut self, reader: &mut dyn Read, limit: usize) -> io::Result<usize> {
        let wanted = limit.min(self.remaining());
        read_into(&mut self.data, reader, wanted)
    }
}

/// A growable vector is a sink without a limit.
impl ByteSink for Vec<u8> {
    fn remaining(&self) -> usize {
        usize::MAX - self.len()
    }

    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn append(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn append_from(&mut self, reader: &mut dyn Read, limit: usize) -> io::Result<usize> {
        read_into(self, reader, limit.min(STREAM_CHUNK_LENGTH))
    }
}

/// The read size used when pulling content from a stream into an unbounded sink.
const STREAM_CHUNK_LENGTH: usize = 64 * 1024;

fn read_into(data: &mut Vec<u8>, reader: &mut dyn Read, wanted: usize) -> io::Result<usize> {
    if wanted == 0 {
        return Ok(0);
    }
    let start = data.len();
    data.resize(start + wanted, 0);
    loop {
        match reader.read(&mut data[start..]) {
            Ok(count) => {
                data.truncate(start + count);
                return Ok(count);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                data.truncate(start);
                return Err(e);
            }
        }
    }
}
