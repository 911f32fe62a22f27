//! Token-overlap matching over raw chunk text, used when semantic search is unavailable.
//!
//! A chunk's score is the fraction of distinct query terms it contains, or 1.0
//! when it contains the whole query phrase. Scores are not comparable with
//! cosine similarities.

use std::collections::HashSet;

use crate::chunks::Chunk;
use crate::store::{ranked, QueryResult};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it", "of",
    "on", "or", "that", "the", "to", "what", "when", "which", "with",
];

/// Lowercased terms of `text`. Dots inside a term are kept so clause numbers
/// like `4.1.3.2` stay whole.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    terms(query)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Rank `corpus` against `query`, best first, keeping at most `k` chunks that
/// match at least one term. Ties keep corpus order.
pub fn keyword_search(corpus: &[Chunk], query: &str, k: usize) -> Vec<QueryResult> {
    let wanted = query_terms(query);
    if wanted.is_empty() || k == 0 {
        return Vec::new();
    }
    let phrase = query.trim().to_lowercase();

    let mut scored: Vec<(&Chunk, f32)> = corpus
        .iter()
        .filter_map(|chunk| {
            let lower = chunk.text.to_lowercase();
            if lower.contains(&phrase) {
                return Some((chunk, 1.0));
            }
            let have: HashSet<String> = terms(&chunk.text).collect();
            let found = wanted.iter().filter(|t| have.contains(*t)).count();
            (found > 0).then(|| (chunk, found as f32 / wanted.len() as f32))
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked(scored.into_iter().take(k).map(|(c, s)| (c.clone(), s)))
}
