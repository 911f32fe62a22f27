//! Document sources: where the corpus text comes from.
//!
//! A source is chosen by explicit configuration and read into one [`Document`]:
//! the raw text plus, where the source knows it, a clause map tagging regions
//! of that text.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::chunks::ClauseMap;
use crate::mock;

/// Separator placed between files of a text corpus and pages of a PDF.
const PART_SEPARATOR: &str = "\n\n";

/// Raw corpus text and its optional clause map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub clause_map: Option<ClauseMap>,
}

/// Where to read the corpus from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentSource {
    /// Built-in set of building-code clauses, for development and tests.
    #[default]
    Mock,
    /// A directory of `.txt` files, one clause per file (clause = file stem).
    TextCorpus { dir: PathBuf },
    /// A PDF, extracted with poppler's `pdftotext`. Pages are tagged `p.<n>`.
    Pdf { path: PathBuf },
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock corpus"),
            Self::TextCorpus { dir } => write!(f, "text corpus {}", dir.display()),
            Self::Pdf { path } => write!(f, "PDF {}", path.display()),
        }
    }
}

impl DocumentSource {
    /// Read the whole source.
    pub fn read(&self) -> Result<Document, SourceError> {
        match self {
            Self::Mock => Ok(mock::document()),
            Self::TextCorpus { dir } => read_text_corpus(dir),
            Self::Pdf { path } => read_pdf(path),
        }
    }
}

/// Joins tagged parts into one document, recording each part's character region.
#[derive(Debug, Default)]
pub(crate) struct DocumentBuilder {
    text: String,
    chars: usize,
    clause_map: ClauseMap,
}

impl DocumentBuilder {
    pub(crate) fn push(&mut self, clause: &str, part: &str) {
        if !self.text.is_empty() {
            self.text.push_str(PART_SEPARATOR);
            self.chars += PART_SEPARATOR.chars().count();
        }
        let len = part.chars().count();
        self.clause_map.push(self.chars, self.chars + len, clause);
        self.text.push_str(part);
        self.chars += len;
    }

    pub(crate) fn finish(self) -> Document {
        Document {
            text: self.text,
            clause_map: Some(self.clause_map),
        }
    }
}

/// Reads every `.txt` file under `root` in file-name order.
/// Hidden files and directories are skipped.
fn read_text_corpus(root: &Path) -> Result<Document, SourceError> {
    if !root.is_dir() {
        return Err(SourceError::NotADirectory(root.to_path_buf()));
    }
    let mut builder = DocumentBuilder::default();
    let mut files = 0;
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry.map_err(|e| SourceError::Walk(e.to_string()))?;
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") && path.is_file() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| SourceError::Read(path.to_path_buf(), e))?;
            let clause = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            builder.push(&clause, text.trim_end());
            files += 1;
        }
    }
    if files == 0 {
        return Err(SourceError::NoDocuments(root.to_path_buf()));
    }
    debug!(files, root = %root.display(), "read text corpus");
    Ok(builder.finish())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Extracts text with `pdftotext <path> -`.
fn read_pdf(path: &Path) -> Result<Document, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let output = Command::new("pdftotext")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| SourceError::Pdf(format!("failed to run pdftotext (is poppler installed?): {e}")))?;
    if !output.status.success() {
        return Err(SourceError::Pdf(format!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let doc = pages_to_document(&String::from_utf8_lossy(&output.stdout));
    if doc.text.trim().is_empty() {
        return Err(SourceError::Pdf(format!(
            "no text extracted from {}",
            path.display()
        )));
    }
    Ok(doc)
}

/// pdftotext separates pages with form feeds. Blank pages are dropped but keep their number.
fn pages_to_document(raw: &str) -> Document {
    let mut builder = DocumentBuilder::default();
    for (i, page) in raw.split('\x0c').enumerate() {
        let page = page.trim();
        if page.is_empty() {
            continue;
        }
        builder.push(&format!("p.{}", i + 1), page);
    }
    builder.finish()
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("no such file: {0}")]
    NotFound(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("no .txt documents under {0}")]
    NoDocuments(PathBuf),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_corpus_tags_each_file_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("8.4.2.txt"), "Resistance factors.\n").unwrap();
        std::fs::write(dir.path().join("4.1.3.2.txt"), "Load combinations.").unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden/9.9.txt"), "ignored").unwrap();

        let source = DocumentSource::TextCorpus {
            dir: dir.path().to_path_buf(),
        };
        let doc = source.read().unwrap();
        assert_eq!(doc.text, "Load combinations.\n\nResistance factors.");

        let map = doc.clause_map.unwrap();
        let clauses: Vec<&str> = map.regions().iter().map(|r| r.clause.as_str()).collect();
        assert_eq!(clauses, vec!["4.1.3.2", "8.4.2"]);
        assert_eq!(map.regions()[0].start, 0);
        assert_eq!(map.regions()[0].end, 18);
        assert_eq!(map.regions()[1].start, 20);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::TextCorpus {
            dir: dir.path().to_path_buf(),
        };
        assert!(matches!(source.read(), Err(SourceError::NoDocuments(_))));
    }

    #[test]
    fn missing_sources_are_errors() {
        let text = DocumentSource::TextCorpus {
            dir: PathBuf::from("/definitely/not/here"),
        };
        assert!(matches!(text.read(), Err(SourceError::NotADirectory(_))));
        let pdf = DocumentSource::Pdf {
            path: PathBuf::from("/definitely/not/here.pdf"),
        };
        assert!(matches!(pdf.read(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn pdf_pages_are_tagged_by_number() {
        let doc = pages_to_document("First page\x0c\x0cThird page\x0c");
        assert_eq!(doc.text, "First page\n\nThird page");
        let map = doc.clause_map.unwrap();
        assert_eq!(map.tag_for(0, 5), Some("p.1"));
        assert_eq!(map.tag_for(12, 22), Some("p.3"));
    }

    #[test]
    fn mock_source_reads_builtin_clauses() {
        let doc = DocumentSource::Mock.read().unwrap();
        assert!(doc.text.contains("4.1.3.2"));
        assert_eq!(doc.clause_map.unwrap().regions().len(), 8);
    }
}
