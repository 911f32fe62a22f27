//! Splits document text into overlapping fixed-size chunks for embedding and search.
//! A window of `chunk_size` characters slides forward by `chunk_size - overlap`,
//! so neighbouring chunks share `overlap` characters and a clause cut at one
//! chunk edge still appears whole in the next.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::source::Document;

/// Default chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default number of characters shared by neighbouring chunks.
pub const DEFAULT_OVERLAP: usize = 200;

/// A chunk of document text, with its position and source reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Clause number (or page tag) this chunk came from. Empty when unknown.
    pub source_tag: String,
    /// Position of this chunk in the document (0, 1, 2, …).
    pub sequence_index: usize,
    /// Character span `[start, end)` within the document text.
    pub char_span: (usize, usize),
}

/// A tagged character region of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRegion {
    pub start: usize,
    pub end: usize,
    pub clause: String,
}

/// Maps character regions of a document to clause numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseMap {
    regions: Vec<ClauseRegion>,
}

impl ClauseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that characters `[start, end)` belong to `clause`.
    pub fn push(&mut self, start: usize, end: usize, clause: impl Into<String>) {
        self.regions.push(ClauseRegion {
            start,
            end,
            clause: clause.into(),
        });
    }

    pub fn regions(&self) -> &[ClauseRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The clause whose region overlaps `[start, end)` the most. Earlier regions win ties.
    pub fn tag_for(&self, start: usize, end: usize) -> Option<&str> {
        let mut best: Option<(&ClauseRegion, usize)> = None;
        for region in &self.regions {
            let lo = start.max(region.start);
            let hi = end.min(region.end);
            if hi <= lo {
                continue;
            }
            let shared = hi - lo;
            if best.map_or(true, |(_, b)| shared > b) {
                best = Some((region, shared));
            }
        }
        best.map(|(r, _)| r.clause.as_str())
    }
}

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigurationError> {
        validate(chunk_size, overlap)?;
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk `text` with these parameters.
    pub fn split(&self, text: &str, clauses: Option<&ClauseMap>) -> Vec<Chunk> {
        sliding_window(text, self.chunk_size, self.overlap, clauses)
    }

    /// Chunk a whole document. With a clause map each clause region is chunked
    /// on its own; without one this is [`split`](Self::split).
    ///
    /// With a map, coverage holds per region: every region's characters are
    /// covered with no gap and neighbours inside a region share `overlap`
    /// characters. Text between regions (the part separators) is in no chunk.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        match &doc.clause_map {
            Some(map) if !map.is_empty() => {
                split_regions(&doc.text, self.chunk_size, self.overlap, map)
            }
            _ => self.split(&doc.text, None),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` into chunks of `chunk_size` characters sharing `overlap` characters.
///
/// The last chunk may be shorter than `chunk_size`; it is still emitted.
/// Each chunk is tagged from `clauses` when a map is given.
pub fn split(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    clauses: Option<&ClauseMap>,
) -> Result<Vec<Chunk>, ConfigurationError> {
    validate(chunk_size, overlap)?;
    Ok(sliding_window(text, chunk_size, overlap, clauses))
}

fn validate(chunk_size: usize, overlap: usize) -> Result<(), ConfigurationError> {
    if chunk_size == 0 {
        return Err(ConfigurationError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ConfigurationError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }
    Ok(())
}

/// Character spans `[start, end)` of each window over a text of `total` characters.
fn windows(total: usize, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let step = chunk_size - overlap;
    let mut spans = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        spans.push((start, end));
        if end == total {
            break;
        }
        start += step;
    }
    spans
}

/// Byte offset of every char boundary of `text`, plus the end of the text.
fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn make_chunk(text: String, source_tag: String, sequence_index: usize, char_span: (usize, usize)) -> Chunk {
    Chunk {
        id: format!("chunk-{sequence_index:05}"),
        text,
        source_tag,
        sequence_index,
        char_span,
    }
}

fn sliding_window(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    clauses: Option<&ClauseMap>,
) -> Vec<Chunk> {
    let bounds = char_bounds(text);
    windows(bounds.len() - 1, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(seq, (start, end))| {
            let tag = clauses
                .and_then(|m| m.tag_for(start, end))
                .unwrap_or_default()
                .to_string();
            make_chunk(text[bounds[start]..bounds[end]].to_string(), tag, seq, (start, end))
        })
        .collect()
}

/// Windows each clause region separately so no chunk straddles two clauses.
/// Text outside every region (separators) is not indexed. Spans stay relative
/// to the whole document and sequence numbers run across regions.
fn split_regions(text: &str, chunk_size: usize, overlap: usize, map: &ClauseMap) -> Vec<Chunk> {
    let bounds = char_bounds(text);
    let total = bounds.len() - 1;
    let mut chunks = Vec::new();
    for region in map.regions() {
        let lo = region.start.min(total);
        let hi = region.end.min(total);
        for (start, end) in windows(hi.saturating_sub(lo), chunk_size, overlap) {
            let span = (lo + start, lo + end);
            let body = text[bounds[span.0]..bounds[span.1]].to_string();
            chunks.push(make_chunk(body, region.clause.clone(), chunks.len(), span));
        }
    }
    chunks
}
