//! Descriptive statistics behind the dashboard visuals. The rendering of
//! word clouds and box charts is an external concern; these functions
//! produce the data those visuals consume.


use itertools::Itertools;
use std::collections::HashMap;

use crate::store::records::PatientCase;

/// Tokens shorter than this carry no visual weight in a word cloud.
const MIN_TOKEN_LENGTH: usize = 3;

/// Age distribution of one diagnosis group among retrieved cases.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeSummary {
    pub diagnosis: String,
    pub count: usize,
    pub min: i64,
    pub median: f64,
    pub max: i64,
}

/// Word-cloud input: lowercased term frequencies over the given texts,
/// most frequent first, ties broken alphabetically for stable output.
#[inline]
pub fn term_frequencies<S: AsRef<str>>(texts: &[S], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for text in texts {
        for token in text.as_ref().split_whitespace() {
            let term: String = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if term.chars().count() >= MIN_TOKEN_LENGTH {
                *counts.entry(term).or_insert(0) += 1;
            }
        }
    }

    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(limit)
        .collect()
}

/// Box-chart input: per-diagnosis age min/median/max over the retrieved
/// similar cases, ordered by group size descending.
#[inline]
pub fn age_by_diagnosis(cases: &[PatientCase]) -> Vec<AgeSummary> {
    let groups: HashMap<&str, Vec<i64>> = cases
        .iter()
        .map(|case| (case.diagnosis.as_str(), case.age))
        .into_group_map();

    groups
        .into_iter()
        .map(|(diagnosis, mut ages)| {
            ages.sort_unstable();
            AgeSummary {
                diagnosis: diagnosis.to_string(),
                count: ages.len(),
                min: ages[0],
                median: median_of_sorted(&ages),
                max: ages[ages.len() - 1],
            }
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.diagnosis.cmp(&b.diagnosis)))
        .collect()
}

fn median_of_sorted(sorted: &[i64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    }
}
