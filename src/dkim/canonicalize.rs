/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs LLC <hello@stalw.art>
 *
 * SPDX-License-Identifier: Apache-2.0 OR MIT
 */

use super::Canonicalization;
use crate::common::{
    crypto::{HashAlgorithm, HashContext, HashOutput},
    headers::Writer,
};

/// Streaming body canonicalizer.
///
/// Chunks may be split anywhere, including between the `\r` and `\n` of a
/// line terminator: the concatenated output of every `filter` call followed
/// by `flush` is the same as canonicalizing the whole body in one call.
pub trait BodyCanonicalizer {
    /// Consumes a chunk and writes the canonical bytes it completes.
    fn filter(&mut self, chunk: &[u8], out: &mut impl Writer);

    /// Signals end of input. Buffered empty lines are discarded and a
    /// non-empty body is terminated with a single `\r\n`. The canonicalizer
    /// is left in its initial state.
    fn flush(&mut self, out: &mut impl Writer);

    /// Drops all buffered state.
    fn reset(&mut self);

    /// Upper bound on the bytes the next `filter` call can produce.
    fn max_output_len(&self, chunk_len: usize) -> usize;

    fn filter_to_vec(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.max_output_len(chunk.len()));
        self.filter(chunk, &mut out);
        out
    }

    fn flush_to_vec(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.max_output_len(0));
        self.flush(&mut out);
        out
    }

    /// Canonicalizes a complete body, discarding any earlier state.
    fn canonicalize(&mut self, body: &[u8]) -> Vec<u8> {
        self.reset();
        let mut out = self.filter_to_vec(body);
        self.flush(&mut out);
        out
    }
}

/// The `simple` body algorithm (RFC 6376, section 3.4.3).
#[derive(Debug, Clone)]
pub struct SimpleBody {
    crlf_seq: usize,
    pending_cr: bool,
    is_empty: bool,
}

/// The `relaxed` body algorithm (RFC 6376, section 3.4.4).
#[derive(Debug, Clone)]
pub struct RelaxedBody {
    crlf_seq: usize,
    pending_cr: bool,
    pending_space: bool,
    is_empty: bool,
}

impl SimpleBody {
    pub fn new() -> Self {
        SimpleBody {
            crlf_seq: 0,
            pending_cr: false,
            is_empty: true,
        }
    }

    fn content(&mut self, ch: u8, out: &mut impl Writer) {
        while self.crlf_seq > 0 {
            out.write(b"\r\n");
            self.crlf_seq -= 1;
        }
        out.write(&[ch]);
        self.is_empty = false;
    }
}

impl Default for SimpleBody {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyCanonicalizer for SimpleBody {
    fn filter(&mut self, chunk: &[u8], out: &mut impl Writer) {
        for &ch in chunk {
            if std::mem::take(&mut self.pending_cr) && ch != b'\n' {
                self.content(b'\r', out);
            }

            match ch {
                b'\n' => {
                    self.crlf_seq += 1;
                }
                b'\r' => {
                    self.pending_cr = true;
                }
                _ => self.content(ch, out),
            }
        }
    }

    fn flush(&mut self, out: &mut impl Writer) {
        if self.pending_cr {
            self.content(b'\r', out);
        }
        if !self.is_empty {
            out.write(b"\r\n");
        }
        self.reset();
    }

    fn reset(&mut self) {
        *self = SimpleBody::new();
    }

    fn max_output_len(&self, chunk_len: usize) -> usize {
        2 * (chunk_len + self.crlf_seq) + 3
    }
}

impl RelaxedBody {
    pub fn new() -> Self {
        RelaxedBody {
            crlf_seq: 0,
            pending_cr: false,
            pending_space: false,
            is_empty: true,
        }
    }

    fn content(&mut self, ch: u8, out: &mut impl Writer) {
        while self.crlf_seq > 0 {
            out.write(b"\r\n");
            self.crlf_seq -= 1;
        }
        if std::mem::take(&mut self.pending_space) {
            out.write(b" ");
        }
        out.write(&[ch]);
        self.is_empty = false;
    }
}

impl Default for RelaxedBody {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyCanonicalizer for RelaxedBody {
    fn filter(&mut self, chunk: &[u8], out: &mut impl Writer) {
        for &ch in chunk {
            if std::mem::take(&mut self.pending_cr) && ch != b'\n' {
                self.content(b'\r', out);
            }

            match ch {
                b' ' | b'\t' => {
                    self.pending_space = true;
                }
                b'\n' => {
                    self.pending_space = false;
                    self.crlf_seq += 1;
                }
                b'\r' => {
                    self.pending_cr = true;
                }
                _ => self.content(ch, out),
            }
        }
    }

    fn flush(&mut self, out: &mut impl Writer) {
        if self.pending_cr {
            self.content(b'\r', out);
        }
        if !self.is_empty {
            out.write(b"\r\n");
        }
        self.reset();
    }

    fn reset(&mut self) {
        *self = RelaxedBody::new();
    }

    fn max_output_len(&self, chunk_len: usize) -> usize {
        2 * (chunk_len + self.crlf_seq) + 4
    }
}

/// Body canonicalizer selected at runtime.
#[derive(Debug, Clone)]
pub enum BodyFilter {
    Simple(SimpleBody),
    Relaxed(RelaxedBody),
}

impl BodyFilter {
    pub fn canonicalization(&self) -> Canonicalization {
        match self {
            BodyFilter::Simple(_) => Canonicalization::Simple,
            BodyFilter::Relaxed(_) => Canonicalization::Relaxed,
        }
    }
}

impl BodyCanonicalizer for BodyFilter {
    fn filter(&mut self, chunk: &[u8], out: &mut impl Writer) {
        match self {
            BodyFilter::Simple(body) => body.filter(chunk, out),
            BodyFilter::Relaxed(body) => body.filter(chunk, out),
        }
    }

    fn flush(&mut self, out: &mut impl Writer) {
        match self {
            BodyFilter::Simple(body) => body.flush(out),
            BodyFilter::Relaxed(body) => body.flush(out),
        }
    }

    fn reset(&mut self) {
        match self {
            BodyFilter::Simple(body) => body.reset(),
            BodyFilter::Relaxed(body) => body.reset(),
        }
    }

    fn max_output_len(&self, chunk_len: usize) -> usize {
        match self {
            BodyFilter::Simple(body) => body.max_output_len(chunk_len),
            BodyFilter::Relaxed(body) => body.max_output_len(chunk_len),
        }
    }
}

/// Incremental body hasher for streaming DKIM signing and verification.
///
/// Body chunks are canonicalized and written to the hash context as they
/// arrive. A `body_length_limit` (the `l=` tag) caps the number of
/// canonical bytes hashed; `Some(0)` hashes nothing.
pub struct BodyHasher<H> {
    hasher: H,
    body: BodyFilter,
    body_length_limit: Option<u64>,
    bytes_hashed: u64,
}

struct LimitedWriter<'a, H> {
    inner: &'a mut H,
    limit: Option<u64>,
    written: &'a mut u64,
}

impl<H: Writer> Writer for LimitedWriter<'_, H> {
    fn write(&mut self, buf: &[u8]) {
        let buf = if let Some(limit) = self.limit {
            let remaining = limit.saturating_sub(*self.written);
            &buf[..std::cmp::min(remaining, buf.len() as u64) as usize]
        } else {
            buf
        };

        if !buf.is_empty() {
            self.inner.write(buf);
            *self.written += buf.len() as u64;
        }
    }
}

impl<H: Writer> BodyHasher<H> {
    /// Creates a new incremental body hasher. Without a `body_length_limit`
    /// the whole body is hashed.
    pub fn new(
        hasher: H,
        canonicalization: Canonicalization,
        body_length_limit: Option<u64>,
    ) -> Self {
        Self {
            hasher,
            body: canonicalization.body_canonicalizer(),
            body_length_limit,
            bytes_hashed: 0,
        }
    }

    /// Feeds a chunk of raw body data.
    pub fn write(&mut self, chunk: &[u8]) {
        let mut out = LimitedWriter {
            inner: &mut self.hasher,
            limit: self.body_length_limit,
            written: &mut self.bytes_hashed,
        };
        self.body.filter(chunk, &mut out);
    }

    /// Canonical bytes hashed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Flushes the canonicalizer and returns the hash context along with the
    /// number of canonical bytes hashed.
    pub fn finish(mut self) -> (H, u64) {
        let canonicalization = self.body.canonicalization();
        let mut out = LimitedWriter {
            inner: &mut self.hasher,
            limit: self.body_length_limit,
            written: &mut self.bytes_hashed,
        };
        self.body.flush(&mut out);

        // An empty body is a single CRLF under simple canonicalization.
        if *out.written == 0 && canonicalization == Canonicalization::Simple {
            out.write(b"\r\n");
        }

        (self.hasher, self.bytes_hashed)
    }
}

impl Canonicalization {
    /// Returns a fresh streaming canonicalizer for message bodies.
    pub fn body_canonicalizer(&self) -> BodyFilter {
        match self {
            Canonicalization::Simple => BodyFilter::Simple(SimpleBody::new()),
            Canonicalization::Relaxed => BodyFilter::Relaxed(RelaxedBody::new()),
        }
    }

    /// Computes the body hash (`bh=`) of a complete body.
    pub fn hash_body(&self, algorithm: HashAlgorithm, body: &[u8]) -> HashOutput {
        let mut hasher = BodyHasher::new(algorithm.hasher(), *self, None);
        hasher.write(body);
        hasher.finish().0.complete()
    }
}
