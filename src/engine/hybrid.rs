use std::collections::HashMap;

use crate::models::MovieId;

use super::rank_descending;

/// Min-max normalization over one engine's candidate set
///
/// Local to a single request: normalized scores from different requests are
/// not comparable. A constant candidate set maps every score to 1.0 (surviving
/// candidates always scored above zero, so flooring them to 0 would misreport
/// them).
fn normalize(candidates: &[(MovieId, f64)]) -> HashMap<MovieId, f64> {
    let Some(max) = candidates.iter().map(|(_, s)| *s).fold(None, fold_max) else {
        return HashMap::new();
    };
    let min = candidates
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::INFINITY, f64::min);
    let span = max - min;

    candidates
        .iter()
        .map(|(id, score)| {
            let normalized = if span == 0.0 { 1.0 } else { (score - min) / span };
            (*id, normalized)
        })
        .collect()
}

fn fold_max(acc: Option<f64>, score: f64) -> Option<f64> {
    Some(match acc {
        Some(max) => max.max(score),
        None => score,
    })
}

/// Blends two candidate lists under a content weight in [0,1]
///
/// Each list is normalized independently, then every movie present in either
/// list is scored `w·content + (1-w)·collaborative`, with absence in one list
/// contributing 0 for that component. Ranked descending, ascending-id
/// tie-break, truncated to k.
pub fn blend(
    content: &[(MovieId, f64)],
    collaborative: &[(MovieId, f64)],
    weight_content: f64,
    k: usize,
) -> Vec<(MovieId, f64)> {
    let content_scores = normalize(content);
    let collaborative_scores = normalize(collaborative);

    let mut combined: Vec<(MovieId, f64)> = content_scores
        .keys()
        .chain(collaborative_scores.keys())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .map(|id| {
            let content_part = content_scores.get(id).copied().unwrap_or(0.0);
            let collaborative_part = collaborative_scores.get(id).copied().unwrap_or(0.0);
            (
                *id,
                weight_content * content_part + (1.0 - weight_content) * collaborative_part,
            )
        })
        .collect();

    rank_descending(&mut combined);
    combined.truncate(k);
    combined
}
