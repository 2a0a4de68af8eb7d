use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use structopt::StructOpt;

use crate::texture::*;
use base::defs::{Error, ErrorKind::*, Result};

#[derive(Clone, Copy, Debug, StructOpt)]
pub struct SelectionParams {
    #[structopt(
        help = "Minimum alignment for single-best and blend selection",
        long,
        default_value = "0.6"
    )]
    pub well_aligned_threshold: f64,

    #[structopt(
        help = "Maximum number of samples blended into one texture",
        long,
        default_value = "5"
    )]
    pub max_blend_samples: usize,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            well_aligned_threshold: 0.6,
            max_blend_samples: 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScoredSample {
    pub index: usize, // Position within the snapshot.
    pub sample: Arc<CapturedSample>,
    pub score: ViewScore,
}

#[derive(Clone, Debug)]
pub struct WeightedSample {
    pub scored: ScoredSample,
    pub weight: f64,
}

#[derive(Clone, Debug)]
pub enum SelectionResult {
    None,
    Single(ScoredSample),
    Blend(Vec<WeightedSample>), // Best first, weights sum to 1.
}

impl SelectionResult {
    pub fn is_none(&self) -> bool {
        matches!(self, SelectionResult::None)
    }

    pub fn sample_indices(&self) -> Vec<usize> {
        match self {
            SelectionResult::None => vec![],
            SelectionResult::Single(s) => vec![s.index],
            SelectionResult::Blend(ws) => {
                ws.iter().map(|w| w.scored.index).collect()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    SingleBest,
    FirstVisible,
    TopKBlend,
}

impl Strategy {
    pub const ALL: [Strategy; 3] =
        [Strategy::SingleBest, Strategy::FirstVisible, Strategy::TopKBlend];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SingleBest => "single-best",
            Strategy::FirstVisible => "first-visible",
            Strategy::TopKBlend => "top-k-blend",
        }
    }

    pub fn select(
        &self,
        position: &Point3,
        snapshot: &[Arc<CapturedSample>],
        scoring: &ScoringParams,
        selection: &SelectionParams,
    ) -> SelectionResult {
        match self {
            Strategy::SingleBest => {
                select_single_best(position, snapshot, scoring, selection)
            }
            Strategy::FirstVisible => {
                select_first_visible(position, snapshot, scoring)
            }
            Strategy::TopKBlend => {
                select_top_k_blend(position, snapshot, scoring, selection)
            }
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::TopKBlend
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .iter()
            .find(|strategy| strategy.name() == s)
            .copied()
            .ok_or_else(|| {
                Error::new(
                    MalformedData,
                    concat!(
                        "unknown selection strategy (can be 'single-best', ",
                        "'first-visible' or 'top-k-blend')"
                    )
                    .to_string(),
                )
            })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Scores every sample with positive alignment, in snapshot order.
pub fn score_eligible_samples(
    position: &Point3,
    snapshot: &[Arc<CapturedSample>],
    scoring: &ScoringParams,
) -> Vec<ScoredSample> {
    snapshot
        .iter()
        .enumerate()
        .map(|(index, sample)| ScoredSample {
            index,
            sample: sample.clone(),
            score: score(position, &sample.pose, scoring),
        })
        .filter(|s| s.score.is_eligible())
        .collect()
}

fn well_aligned_samples(
    position: &Point3,
    snapshot: &[Arc<CapturedSample>],
    scoring: &ScoringParams,
    selection: &SelectionParams,
) -> Vec<ScoredSample> {
    score_eligible_samples(position, snapshot, scoring)
        .into_iter()
        .filter(|s| s.score.alignment > selection.well_aligned_threshold)
        .collect()
}

pub fn select_single_best(
    position: &Point3,
    snapshot: &[Arc<CapturedSample>],
    scoring: &ScoringParams,
    selection: &SelectionParams,
) -> SelectionResult {
    let mut chosen: Option<ScoredSample> = None;
    for candidate in
        well_aligned_samples(position, snapshot, scoring, selection)
    {
        // Strict comparison keeps the earliest sample on ties.
        let better = match &chosen {
            Some(best) => candidate.score.combined > best.score.combined,
            None => true,
        };
        if better {
            chosen = Some(candidate);
        }
    }

    match chosen {
        Some(s) => SelectionResult::Single(s),
        None => SelectionResult::None,
    }
}

pub fn select_first_visible(
    position: &Point3,
    snapshot: &[Arc<CapturedSample>],
    scoring: &ScoringParams,
) -> SelectionResult {
    // Stable, so equal timestamps keep insertion order.
    let mut order: Vec<usize> = (0..snapshot.len()).collect();
    order.sort_by(|&a, &b| {
        snapshot[a]
            .timestamp
            .partial_cmp(&snapshot[b].timestamp)
            .unwrap_or(Ordering::Equal)
    });

    for index in order {
        let sample = &snapshot[index];
        let s = score(position, &sample.pose, scoring);
        if s.is_eligible() && is_visible(position, &sample.pose, scoring) {
            return SelectionResult::Single(ScoredSample {
                index,
                sample: sample.clone(),
                score: s,
            });
        }
    }

    SelectionResult::None
}

pub fn select_top_k_blend(
    position: &Point3,
    snapshot: &[Arc<CapturedSample>],
    scoring: &ScoringParams,
    selection: &SelectionParams,
) -> SelectionResult {
    let mut candidates =
        well_aligned_samples(position, snapshot, scoring, selection);

    candidates.sort_by(|a, b| {
        b.score
            .combined
            .partial_cmp(&a.score.combined)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(selection.max_blend_samples.max(1));

    if candidates.len() <= 1 {
        return match candidates.pop() {
            Some(s) => SelectionResult::Single(s),
            None => SelectionResult::None,
        };
    }

    let total: f64 = candidates.iter().map(|s| s.score.combined).sum();
    SelectionResult::Blend(
        candidates
            .into_iter()
            .map(|scored| WeightedSample {
                weight: scored.score.combined / total,
                scored,
            })
            .collect(),
    )
}
