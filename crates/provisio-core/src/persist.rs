//! On-disk storage for a built index, and the corpus fingerprint that decides
//! whether a stored index still matches its source.
//!
//! Layout: `<dir>/index.json` holding the format version, fingerprint, embedder id,
//! dimensionality and the ordered `(chunk, vector)` entries. Writes go to a
//! temporary file in the same directory and are renamed into place only once the
//! whole payload is on disk, so a crash never leaves a half-written `index.json`.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chunks::ChunkConfig;
use crate::error::PersistenceError;
use crate::index::CorpusIndex;
use crate::source::Document;
use crate::store::{IndexedChunk, VectorIndex};

pub const INDEX_FILE: &str = "index.json";
const TMP_SUFFIX: &str = ".tmp";
const FORMAT_VERSION: u32 = 1;

/// Content hash of everything an index depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// SHA-256 over the document text, its clause map, the chunking parameters and
    /// the embedder id. Fields are length-prefixed so no two inputs collide by concatenation.
    pub fn compute(doc: &Document, chunking: &ChunkConfig, embedder_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"provisio-corpus-v1");
        update_str(&mut hasher, &doc.text);
        if let Some(map) = &doc.clause_map {
            hasher.update((map.regions().len() as u64).to_le_bytes());
            for region in map.regions() {
                hasher.update((region.start as u64).to_le_bytes());
                hasher.update((region.end as u64).to_le_bytes());
                update_str(&mut hasher, &region.clause);
            }
        } else {
            hasher.update(u64::MAX.to_le_bytes());
        }
        hasher.update((chunking.chunk_size() as u64).to_le_bytes());
        hasher.update((chunking.overlap() as u64).to_le_bytes());
        update_str(&mut hasher, embedder_id);

        let hex = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

#[derive(Serialize)]
struct StoredIndexRef<'a> {
    format_version: u32,
    fingerprint: &'a Fingerprint,
    embedder: &'a str,
    dimension: usize,
    entries: &'a [IndexedChunk],
}

#[derive(Deserialize)]
struct StoredIndex {
    format_version: u32,
    fingerprint: Fingerprint,
    embedder: String,
    dimension: usize,
    entries: Vec<IndexedChunk>,
}

/// Path of the index file inside `dir`.
pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

/// Write `index` to `dir` atomically, creating `dir` if needed.
pub fn save_index(dir: &Path, index: &CorpusIndex) -> Result<(), PersistenceError> {
    std::fs::create_dir_all(dir).map_err(|e| PersistenceError::Write(dir.to_path_buf(), e))?;
    let path = index_path(dir);
    let tmp = dir.join(format!("{INDEX_FILE}{TMP_SUFFIX}"));
    let write_err = |e: std::io::Error| PersistenceError::Write(tmp.clone(), e);

    let stored = StoredIndexRef {
        format_version: FORMAT_VERSION,
        fingerprint: index.fingerprint(),
        embedder: index.embedder(),
        dimension: index.dimension(),
        entries: index.vectors().items(),
    };
    let file = File::create(&tmp).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &stored).map_err(|e| write_err(e.into()))?;
    writer.flush().map_err(write_err)?;
    let file = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    std::fs::rename(&tmp, &path).map_err(|e| PersistenceError::Write(path.clone(), e))
}

/// Read and validate the index stored in `dir`.
pub fn load_index(dir: &Path) -> Result<CorpusIndex, PersistenceError> {
    let path = index_path(dir);
    if !path.is_file() {
        return Err(PersistenceError::Missing(path));
    }
    let file = File::open(&path).map_err(|e| PersistenceError::Read(path.clone(), e))?;
    let stored: StoredIndex = serde_json::from_reader(BufReader::new(file))?;

    if stored.format_version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(stored.format_version));
    }
    for (i, entry) in stored.entries.iter().enumerate() {
        let actual = entry.embedding().len();
        if actual != stored.dimension || actual == 0 {
            return Err(PersistenceError::Dimension {
                entry: i,
                expected: stored.dimension,
                actual,
            });
        }
        if entry.embedding().iter().any(|x| !x.is_finite()) {
            return Err(PersistenceError::NonFinite(i));
        }
    }

    let vectors = VectorIndex::from_parts(stored.entries, stored.dimension);
    Ok(CorpusIndex::from_parts(
        stored.fingerprint,
        stored.embedder,
        vectors,
    ))
}
