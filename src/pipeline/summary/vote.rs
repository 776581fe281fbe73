//! Per-field plurality merge across self-consistency attempts.

use crate::pipeline::text::normalize_sentence_key;
use crate::pipeline::types::{SummaryField, SummaryResult};

struct Cluster<'a> {
    key: String,
    votes: usize,
    longest: &'a str,
}

/// Merge attempts given in attempt-index order.
///
/// Values are grouped by normalized content; empty values abstain. The
/// largest group wins, ties going to the group seen first, and the longest
/// literal in the winning group is kept.
pub fn merge(attempts: &[SummaryResult]) -> SummaryResult {
    let mut merged = SummaryResult::default();
    for field in SummaryField::ALL {
        merged.set(field, vote_field(attempts, field));
    }
    merged
}

fn vote_field(attempts: &[SummaryResult], field: SummaryField) -> String {
    let mut clusters: Vec<Cluster> = Vec::new();
    for attempt in attempts {
        let value = attempt.get(field).trim();
        let key = normalize_sentence_key(value);
        if key.is_empty() {
            continue;
        }
        match clusters.iter_mut().find(|c| c.key == key) {
            Some(cluster) => {
                cluster.votes += 1;
                if value.chars().count() > cluster.longest.chars().count() {
                    cluster.longest = value;
                }
            }
            None => clusters.push(Cluster {
                key,
                votes: 1,
                longest: value,
            }),
        }
    }

    let mut winner: Option<&Cluster> = None;
    for cluster in &clusters {
        if winner.map_or(true, |w| cluster.votes > w.votes) {
            winner = Some(cluster);
        }
    }
    winner.map(|c| c.longest.to_string()).unwrap_or_default()
}
