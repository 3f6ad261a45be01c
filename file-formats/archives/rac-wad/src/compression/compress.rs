//! LZ block compression
//!
//! The input is cut into fixed size chunks which are compressed independently
//! (matches never reach back across a chunk boundary), so the chunks can be
//! handed to a pool of workers and the output is identical for any worker
//! count.

use std::io::Cursor;

use binrw::BinWrite;
use rayon::prelude::*;

use super::header::{WAD_HEADER_SIZE, WadHeader};
use crate::{Error, Result};

/// Number of input bytes compressed as one independent unit
pub const CHUNK_SIZE: usize = 0x20000;

const MIN_MATCH: usize = 3;
const MAX_DISTANCE: usize = 0xbfff;
const MAX_MEDIUM_DISTANCE: usize = 0x4000;
const MAX_SHORT_DISTANCE: usize = 0x800;
const MAX_SHORT_LENGTH: usize = 8;
const MAX_MEDIUM_LENGTH: usize = 0x1f + 0xff + 2;
const MAX_FAR_LENGTH: usize = 7 + 0xff + 2;
const MAX_LITERAL_RUN: usize = 0xff + 18;
const MIN_LITERAL_RUN: usize = 4;

const HASH_BITS: u32 = 15;
const MAX_CHAIN_DEPTH: usize = 64;
const NO_POSITION: u32 = u32::MAX;

/// Compress `src` into a single LZ block using `thread_count` workers
pub fn compress_wad(src: &[u8], thread_count: usize) -> Result<Vec<u8>> {
    if thread_count == 0 {
        return Err(Error::compression(
            "At least one compression worker is required",
        ));
    }

    let chunks: Vec<&[u8]> = src.chunks(CHUNK_SIZE).collect();
    log::debug!(
        "Compressing 0x{:x} bytes as {} chunk(s) on {} worker(s)",
        src.len(),
        chunks.len(),
        thread_count
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .map_err(|e| Error::compression(format!("Failed to start compression workers: {e}")))?;
    let compressed: Vec<Vec<u8>> =
        pool.install(|| chunks.par_iter().map(|chunk| compress_chunk(chunk)).collect());

    let payload_size: usize = compressed.iter().map(Vec::len).sum();
    let total_size = i32::try_from(WAD_HEADER_SIZE + payload_size).map_err(|_| {
        Error::compression(format!(
            "Compressed size 0x{payload_size:x} does not fit in a WAD header"
        ))
    })?;

    let mut cursor = Cursor::new(Vec::with_capacity(WAD_HEADER_SIZE + payload_size));
    WadHeader::new(total_size).write(&mut cursor)?;
    let mut dest = cursor.into_inner();
    for chunk in compressed {
        dest.extend_from_slice(&chunk);
    }
    Ok(dest)
}

/// Compress one chunk with greedy parsing over a hash chain match finder
fn compress_chunk(src: &[u8]) -> Vec<u8> {
    let mut finder = MatchFinder::new(src);
    let mut writer = PacketWriter::default();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < src.len() {
        match finder.find(pos) {
            Some(found) => {
                writer.literals(&src[literal_start..pos]);
                writer.lookback(found.distance, found.length);
                for covered in pos..pos + found.length {
                    finder.insert(covered);
                }
                pos += found.length;
                literal_start = pos;
            }
            None => {
                finder.insert(pos);
                pos += 1;
            }
        }
    }
    writer.literals(&src[literal_start..]);
    writer.dest
}

#[derive(Debug, Clone, Copy)]
struct Match {
    distance: usize,
    length: usize,
}

fn max_length_for(distance: usize) -> usize {
    if distance <= MAX_MEDIUM_DISTANCE {
        MAX_MEDIUM_LENGTH
    } else {
        MAX_FAR_LENGTH
    }
}

struct MatchFinder<'a> {
    src: &'a [u8],
    head: Vec<u32>,
    prev: Vec<u32>,
}

impl<'a> MatchFinder<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            head: vec![NO_POSITION; 1 << HASH_BITS],
            prev: vec![NO_POSITION; src.len()],
        }
    }

    fn hash(&self, pos: usize) -> usize {
        let value = u32::from(self.src[pos])
            | (u32::from(self.src[pos + 1]) << 8)
            | (u32::from(self.src[pos + 2]) << 16);
        (value.wrapping_mul(0x9e37_79b1) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, pos: usize) {
        if pos + MIN_MATCH > self.src.len() {
            return;
        }
        let hash = self.hash(pos);
        self.prev[pos] = self.head[hash];
        self.head[hash] = pos as u32;
    }

    fn find(&self, pos: usize) -> Option<Match> {
        if pos + MIN_MATCH > self.src.len() {
            return None;
        }
        let remaining = self.src.len() - pos;
        let mut best: Option<Match> = None;
        let mut candidate = self.head[self.hash(pos)];
        let mut depth = 0;

        while candidate != NO_POSITION && depth < MAX_CHAIN_DEPTH {
            let start = candidate as usize;
            let distance = pos - start;
            if distance > MAX_DISTANCE {
                break;
            }
            let limit = max_length_for(distance).min(remaining);
            let length = self.src[start..]
                .iter()
                .zip(&self.src[pos..pos + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if length >= MIN_MATCH && best.is_none_or(|b| length > b.length) {
                best = Some(Match { distance, length });
                // Older candidates are further away and cannot allow a longer match.
                if length == limit {
                    break;
                }
            }
            candidate = self.prev[start];
            depth += 1;
        }
        best
    }
}

/// Emits packets, remembering where the last match keeps its literal count
#[derive(Default)]
struct PacketWriter {
    dest: Vec<u8>,
    last_match_literals: Option<usize>,
}

impl PacketWriter {
    fn literals(&mut self, literals: &[u8]) {
        if literals.is_empty() {
            return;
        }

        if literals.len() < MIN_LITERAL_RUN {
            let count = literals.len() as u8;
            match self.last_match_literals.take() {
                Some(index) => self.dest[index] |= count,
                // Sync packet: a zero length match carrying the literals.
                None => self.dest.extend_from_slice(&[0x11, count, 0x00]),
            }
            self.dest.extend_from_slice(literals);
            return;
        }

        let mut rest = literals;
        while !rest.is_empty() {
            let take = if rest.len() <= MAX_LITERAL_RUN {
                rest.len()
            } else if rest.len() - MAX_LITERAL_RUN < MIN_LITERAL_RUN {
                rest.len() - MIN_LITERAL_RUN
            } else {
                MAX_LITERAL_RUN
            };
            if take <= 18 {
                self.dest.push((take - 3) as u8);
            } else {
                self.dest.push(0);
                self.dest.push((take - 18) as u8);
            }
            self.dest.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
        }
        self.last_match_literals = None;
    }

    fn lookback(&mut self, distance: usize, length: usize) {
        if distance <= MAX_SHORT_DISTANCE && length <= MAX_SHORT_LENGTH {
            let d = distance - 1;
            self.dest.push((((length - 1) << 5) | ((d & 7) << 2)) as u8);
            self.last_match_literals = Some(self.dest.len() - 1);
            self.dest.push((d >> 3) as u8);
        } else if distance <= MAX_MEDIUM_DISTANCE {
            let n = length - 2;
            if n <= 0x1f {
                self.dest.push(0x20 | n as u8);
            } else {
                self.dest.push(0x20);
                self.dest.push((n - 0x1f) as u8);
            }
            let d = distance - 1;
            self.last_match_literals = Some(self.dest.len());
            self.dest.push(((d & 0x3f) << 2) as u8);
            self.dest.push((d >> 6) as u8);
        } else {
            let d = distance - MAX_MEDIUM_DISTANCE;
            let far_bit = if d >= 0x4000 { 8 } else { 0 };
            let field = d & 0x3fff;
            let n = length - 2;
            if n <= 7 {
                self.dest.push(0x10 | far_bit | n as u8);
            } else {
                self.dest.push(0x10 | far_bit);
                self.dest.push((n - 7) as u8);
            }
            self.last_match_literals = Some(self.dest.len());
            self.dest.push(((field & 0x3f) << 2) as u8);
            self.dest.push((field >> 6) as u8);
        }
    }
}
