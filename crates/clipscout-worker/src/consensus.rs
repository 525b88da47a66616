//! Merge per-provider clip proposals into consensus clips.
//!
//! Candidates are swept in start order and greedily grouped with the open
//! cluster when they overlap it enough. Each cluster becomes one
//! [`AggregatedClip`] whose confidence is the share of invoked providers that
//! proposed it.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use clipscout_models::{AggregatedClip, ClipCandidate, CropRegions, ViralScore};

/// Tunables for clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusConfig {
    /// Overlap over the shorter duration needed to join a cluster
    pub overlap_threshold: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
        }
    }
}

/// Cluster under construction.
struct Cluster {
    start: f64,
    end: f64,
    members: Vec<ClipCandidate>,
}

impl Cluster {
    fn open(candidate: ClipCandidate) -> Self {
        Self {
            start: candidate.start_time,
            end: candidate.end_time,
            members: vec![candidate],
        }
    }

    fn overlap_ratio(&self, candidate: &ClipCandidate) -> f64 {
        let overlap = (self.end.min(candidate.end_time) - self.start.max(candidate.start_time)).max(0.0);
        let shorter = (self.end - self.start).min(candidate.duration());
        if shorter <= 0.0 {
            return 0.0;
        }
        overlap / shorter
    }

    fn push(&mut self, candidate: ClipCandidate) {
        self.start = self.start.min(candidate.start_time);
        self.end = self.end.max(candidate.end_time);
        self.members.push(candidate);
    }
}

/// Deterministic consensus over validated candidates.
#[derive(Debug, Clone, Default)]
pub struct ConsensusAggregator {
    config: ConsensusConfig,
}

impl ConsensusAggregator {
    pub fn new(config: ConsensusConfig) -> Self {
        Self { config }
    }

    /// Cluster `candidates` from `providers_invoked` providers.
    ///
    /// Output is sorted by descending confidence, then descending overall
    /// score. Every clip carries a copy of `crop_regions`.
    pub fn aggregate(
        &self,
        mut candidates: Vec<ClipCandidate>,
        providers_invoked: usize,
        crop_regions: &CropRegions,
    ) -> Vec<AggregatedClip> {
        candidates.sort_by(compare_candidates);

        let mut clusters: Vec<Cluster> = Vec::new();
        for candidate in candidates {
            match clusters.last_mut() {
                Some(open) if open.overlap_ratio(&candidate) >= self.config.overlap_threshold => {
                    open.push(candidate);
                }
                _ => clusters.push(Cluster::open(candidate)),
            }
        }

        let invoked = providers_invoked.max(1);
        let mut clips: Vec<AggregatedClip> = clusters
            .into_iter()
            .map(|cluster| build_clip(cluster, invoked, crop_regions))
            .collect();

        clips.sort_by(compare_clips);

        debug!(
            clips = clips.len(),
            providers_invoked,
            "Aggregated provider candidates"
        );
        clips
    }
}

fn compare_candidates(a: &ClipCandidate, b: &ClipCandidate) -> Ordering {
    a.start_time
        .total_cmp(&b.start_time)
        .then(a.end_time.total_cmp(&b.end_time))
        .then_with(|| a.provider_id.cmp(&b.provider_id))
        // Same provider and interval: stronger scores first, then text, so
        // the dedupe below never depends on input order.
        .then_with(|| b.viral_score.axes().cmp(&a.viral_score.axes()))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.reason.cmp(&b.reason))
        .then_with(|| a.score_explanation.cmp(&b.score_explanation))
}

fn compare_clips(a: &AggregatedClip, b: &AggregatedClip) -> Ordering {
    b.confidence_score
        .total_cmp(&a.confidence_score)
        .then(b.aggregated_viral_score.overall.cmp(&a.aggregated_viral_score.overall))
        .then(a.start_time.total_cmp(&b.start_time))
        .then(a.end_time.total_cmp(&b.end_time))
}

fn build_clip(cluster: Cluster, providers_invoked: usize, crop_regions: &CropRegions) -> AggregatedClip {
    // One vote per provider: keep its best-scored member, earlier start on ties.
    // Members arrive in candidate order, so the first seen wins a tie.
    let mut variations: BTreeMap<String, ClipCandidate> = BTreeMap::new();
    for member in cluster.members {
        let better = variations
            .get(&member.provider_id)
            .map_or(true, |kept| member.viral_score.overall > kept.viral_score.overall);
        if better {
            variations.insert(member.provider_id.clone(), member);
        }
    }

    // Iterating in id order with a strict comparison keeps the lowest id on ties.
    let mut lead: Option<&ClipCandidate> = None;
    for candidate in variations.values() {
        if lead.map_or(true, |l| candidate.viral_score.overall > l.viral_score.overall) {
            lead = Some(candidate);
        }
    }
    let (title, reason, score_explanation) = lead
        .map(|c| (c.title.clone(), c.reason.clone(), c.score_explanation.clone()))
        .unwrap_or_default();

    let aggregated_viral_score = mean_score(variations.values());
    let confidence_score = 100.0 * variations.len() as f64 / providers_invoked as f64;

    AggregatedClip {
        start_time: cluster.start,
        end_time: cluster.end,
        title,
        reason,
        score_explanation,
        recommended_by: variations.keys().cloned().collect(),
        variations,
        aggregated_viral_score,
        confidence_score,
        crop_regions: crop_regions.clone(),
    }
}

/// Per-axis mean, rounded to nearest and clamped.
fn mean_score<'a>(members: impl Iterator<Item = &'a ClipCandidate>) -> ViralScore {
    let mut sums = [0.0f64; 5];
    let mut count = 0usize;
    for member in members {
        for (sum, axis) in sums.iter_mut().zip(member.viral_score.axes()) {
            *sum += axis as f64;
        }
        count += 1;
    }
    if count == 0 {
        return ViralScore::default();
    }
    ViralScore::from_axes(sums.map(|sum| ViralScore::clamp_axis(sum / count as f64)))
}
