//! Newline-delimited frame reassembly.
//!
//! The client splits each frame into small characteristic writes:
//! ```text
//! write 1: {"token":"3fa9…","comm
//! write 2: and":"RUN","info":{}}\n
//! ```
//!
//! The framer accumulates raw bytes and decodes UTF-8 only once a frame is
//! complete, since a chunk boundary may split a multi-byte character. One
//! chunk may complete several frames; bytes after the last newline stay
//! buffered for the next frame.
//!
//! A frame longer than the configured bound is reported once as
//! [`FrameError::Overflow`], then everything up to the next newline is
//! thrown away so the stream resynchronises on the following frame.

use std::collections::VecDeque;

use crate::error::FrameError;

const DELIMITER: u8 = b'\n';

pub struct LineFramer {
    buf: Vec<u8>,
    limit: usize,
    discarding: bool,
    ready: VecDeque<Result<String, FrameError>>,
}

impl LineFramer {
    /// `limit` bounds one frame's payload, delimiter excluded.
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            discarding: false,
            ready: VecDeque::new(),
        }
    }

    /// Feed one characteristic write.
    pub fn push(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while !rest.is_empty() {
            if let Some(i) = rest.iter().position(|&b| b == DELIMITER) {
                self.extend(&rest[..i]);
                self.finish_frame();
                rest = &rest[i + 1..];
            } else {
                self.extend(rest);
                rest = &[];
            }
        }
    }

    /// Next completed frame or framing error, oldest first.
    pub fn next_frame(&mut self) -> Option<Result<String, FrameError>> {
        self.ready.pop_front()
    }

    /// Bytes buffered towards the current, incomplete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop partial and completed frames.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
        self.ready.clear();
    }

    fn extend(&mut self, bytes: &[u8]) {
        if self.discarding || bytes.is_empty() {
            return;
        }
        if self.buf.len() + bytes.len() > self.limit {
            self.buf.clear();
            self.discarding = true;
            self.ready
                .push_back(Err(FrameError::Overflow { limit: self.limit }));
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    fn finish_frame(&mut self) {
        if self.discarding {
            self.discarding = false;
            return;
        }
        // A bare delimiter carries nothing.
        if self.buf.is_empty() {
            return;
        }
        let bytes = core::mem::take(&mut self.buf);
        self.ready
            .push_back(String::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8));
    }
}
