//! Pure scoring functions over record titles. These back the recommendation
//! widgets ([`rank_related`]) and the in-body link injection
//! ([`rank_for_inline_linking`]), which deliberately weigh candidates
//! differently.

use crate::record::PostRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// How many candidates [`rank_for_inline_linking`] returns.
pub const INLINE_LINK_CANDIDATES: usize = 5;

/// Lowercased title words, split on runs of non-word characters. Duplicates
/// collapse.
pub fn tokens(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The number of distinct tokens two titles share. Symmetric, and not
/// normalized by title length.
pub fn similarity(a: &str, b: &str) -> usize {
    let a = tokens(a);
    let b = tokens(b);
    a.intersection(&b).count()
}

/// Bonuses added on top of title similarity by [`rank_related`].
#[derive(Clone, Debug)]
pub struct RankWeights {
    pub same_category: usize,
    pub recent: usize,

    /// Candidates published within this window of `now` get the `recent`
    /// bonus.
    pub recent_window: Duration,
    pub now: DateTime<Utc>,
}

impl RankWeights {
    pub fn new(now: DateTime<Utc>) -> RankWeights {
        RankWeights {
            same_category: 5,
            recent: 2,
            recent_window: Duration::days(60),
            now,
        }
    }
}

/// A candidate's position in the record list and its score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scored {
    pub index: usize,
    pub score: usize,
}

/// Scores every record other than `records[target]` and orders them by
/// descending score. Ties keep list order. Callers truncate.
pub fn rank_related(records: &[PostRecord], target: usize, weights: &RankWeights) -> Vec<Scored> {
    let subject = &records[target];
    let subject_tokens = tokens(&subject.title);
    let mut scored: Vec<Scored> = records
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(index, candidate)| {
            let mut score = subject_tokens.intersection(&tokens(&candidate.title)).count();
            if candidate.category == subject.category {
                score += weights.same_category;
            }
            if weights.now - candidate.published_at <= weights.recent_window {
                score += weights.recent;
            }
            Scored { index, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// The five records whose titles are most similar to `records[target]`'s, by
/// similarity alone. Ties keep list order.
pub fn rank_for_inline_linking(records: &[PostRecord], target: usize) -> Vec<usize> {
    let subject_tokens = tokens(&records[target].title);
    let mut scored: Vec<Scored> = records
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(index, candidate)| Scored {
            index,
            score: subject_tokens.intersection(&tokens(&candidate.title)).count(),
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
        .into_iter()
        .take(INLINE_LINK_CANDIDATES)
        .map(|s| s.index)
        .collect()
}
