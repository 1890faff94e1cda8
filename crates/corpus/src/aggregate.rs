use crate::types::{NameRecord, NameSeries, NameYearEntry};
use namematch_model::{Gender, NameSort};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// User-selected constraints applied to every parsed record.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pub gender: Gender,
    pub starts_with: String,
    pub max_length: usize,
}

impl NameFilter {
    /// `starts_with` is matched case-insensitively; empty means no prefix
    /// constraint. `usize::MAX` disables the length constraint.
    pub fn new(gender: Gender, starts_with: impl Into<String>, max_length: usize) -> Self {
        Self {
            gender,
            starts_with: starts_with.into(),
            max_length,
        }
    }

    pub fn admits(&self, record: &NameRecord) -> bool {
        if !record
            .name
            .to_lowercase()
            .starts_with(&self.starts_with.to_lowercase())
        {
            return false;
        }
        if record.name.chars().count() > self.max_length {
            return false;
        }
        self.gender.admits(record.gender.code())
    }
}

/// Parse, filter, and aggregate raw corpus lines into per-name year series.
/// Each series stays sorted by descending rank via insertion at the computed
/// point, so the first entry is always the most popular appearance.
pub fn aggregate_lines<'a>(
    lines: impl IntoIterator<Item = &'a str>,
    filter: &NameFilter,
) -> HashMap<String, Vec<NameYearEntry>> {
    let mut series: HashMap<String, Vec<NameYearEntry>> = HashMap::new();

    for line in lines {
        let Some(record) = NameRecord::parse(line) else {
            continue;
        };
        if !filter.admits(&record) {
            continue;
        }

        let entry = NameYearEntry {
            year: record.year,
            rank_in_year: record.rank_in_year,
            total_that_year: record.total_that_year,
            gender: record.gender,
        };
        let entries = series.entry(record.name).or_default();
        let at = entries.partition_point(|existing| existing.rank_in_year >= entry.rank_in_year);
        entries.insert(at, entry);
    }

    series
}

/// Final candidate list: names already decided locally are excluded entirely
/// (by name, independent of gender), then the list is shuffled or ordered by
/// the most popular year-entry.
pub fn candidates(
    series: HashMap<String, Vec<NameYearEntry>>,
    seen_names: &HashSet<String>,
    sort: NameSort,
) -> Vec<NameSeries> {
    let mut list: Vec<NameSeries> = series
        .into_iter()
        .filter(|(name, _)| !seen_names.contains(name))
        .map(|(name, entries)| NameSeries { name, entries })
        .collect();

    match sort {
        NameSort::Random => list.shuffle(&mut rand::thread_rng()),
        NameSort::Popular => list.sort_by(|a, b| {
            b.entries[0]
                .rank_in_year
                .cmp(&a.entries[0].rank_in_year)
                .then_with(|| a.name.cmp(&b.name))
        }),
    }

    list
}
