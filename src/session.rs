use std::{
    collections::{BTreeMap, BTreeSet},
    time::Instant,
};

use serde::{Deserialize, Serialize};

use crate::{
    config::SessionSettings,
    timeline::ReferenceTimeline,
    types::{ComparisonResult, HitTier, LimbName},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbTotal {
    pub sum: u32,
    pub count: u32,
}

impl LimbTotal {
    pub fn average(&self) -> Option<f32> {
        (self.count > 0).then(|| self.sum as f32 / self.count as f32)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHits {
    pub perfect: u32,
    pub great: u32,
    pub ok: u32,
    pub almost: u32,
    pub miss: u32,
}

impl FrameHits {
    pub fn count(&self, tier: HitTier) -> u32 {
        match tier {
            HitTier::Perfect => self.perfect,
            HitTier::Great => self.great,
            HitTier::Ok => self.ok,
            HitTier::Almost => self.almost,
            HitTier::Miss => self.miss,
        }
    }

    pub fn record(&mut self, tier: HitTier) {
        let slot = match tier {
            HitTier::Perfect => &mut self.perfect,
            HitTier::Great => &mut self.great,
            HitTier::Ok => &mut self.ok,
            HitTier::Almost => &mut self.almost,
            HitTier::Miss => &mut self.miss,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        HitTier::ALL.iter().map(|tier| self.count(*tier)).sum()
    }

    pub fn total_points(&self) -> u32 {
        HitTier::ALL
            .iter()
            .map(|tier| self.count(*tier) * tier.points())
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameHit {
    pub index: usize,
    pub time: f32,
    pub score: u8,
    pub tier: HitTier,
    pub points: u32,
}

/// End-of-session snapshot handed to the report consumer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub score_timeline: Vec<u8>,
    pub limb_totals: BTreeMap<LimbName, LimbTotal>,
    pub frame_hits: FrameHits,
    pub peak_score: u8,
    pub total_frames: usize,
    pub session_duration_ms: u64,
    pub total_points: u32,
}

impl SessionStats {
    pub fn average_score(&self) -> Option<f32> {
        if self.score_timeline.is_empty() {
            return None;
        }
        let sum: u32 = self.score_timeline.iter().map(|s| *s as u32).sum();
        Some(sum as f32 / self.score_timeline.len() as f32)
    }

    pub fn limb_averages(&self) -> BTreeMap<LimbName, f32> {
        self.limb_totals
            .iter()
            .filter_map(|(limb, total)| total.average().map(|avg| (*limb, avg)))
            .collect()
    }

    pub fn weakest_limb(&self) -> Option<LimbName> {
        self.limb_averages()
            .into_iter()
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(limb, _)| limb)
    }
}

/// Tracks which reference frames the user has hit and accumulates the
/// statistics for the final report.
///
/// Must see every playback timestamp: a rewind is only noticed by comparing
/// consecutive ticks.
pub struct SessionTracker {
    settings: SessionSettings,
    scored: BTreeSet<usize>,
    last_time: Option<f32>,
    score_timeline: Vec<u8>,
    limb_totals: BTreeMap<LimbName, LimbTotal>,
    frame_hits: FrameHits,
    peak_score: u8,
    total_points: u32,
    last_sample: Option<Instant>,
    started: Option<Instant>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionTracker {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            scored: BTreeSet::new(),
            last_time: None,
            score_timeline: Vec::new(),
            limb_totals: BTreeMap::new(),
            frame_hits: FrameHits::default(),
            peak_score: 0,
            total_points: 0,
            last_sample: None,
            started: None,
        }
    }

    pub fn is_credited(&self, index: usize) -> bool {
        self.scored.contains(&index)
    }

    pub fn credited(&self) -> impl Iterator<Item = usize> + '_ {
        self.scored.iter().copied()
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn frame_hits(&self) -> &FrameHits {
        &self.frame_hits
    }

    /// Advances the session to `playback_time`. Returns the frame credited
    /// on this tick, if any.
    pub fn tick(
        &mut self,
        timeline: &ReferenceTimeline,
        playback_time: f32,
        smoothed_score: Option<f32>,
        comparison: Option<&ComparisonResult>,
        now: Instant,
    ) -> Option<FrameHit> {
        self.started.get_or_insert(now);

        if let Some(previous) = self.last_time {
            if playback_time < previous - self.settings.rewind_threshold_secs {
                self.uncredit_after(timeline, playback_time);
            }
        }
        self.last_time = Some(playback_time);

        if let Some(score) = smoothed_score {
            self.sample_score(score, now);
        }

        self.credit_hit(timeline, playback_time, smoothed_score, comparison)
    }

    fn uncredit_after(&mut self, timeline: &ReferenceTimeline, playback_time: f32) {
        let before = self.scored.len();
        self.scored.retain(|index| {
            timeline
                .get(*index)
                .is_some_and(|entry| entry.time <= playback_time)
        });
        log::debug!(
            "rewind to {playback_time:.2}s re-opened {} reference frames",
            before - self.scored.len()
        );
    }

    fn sample_score(&mut self, score: f32, now: Instant) {
        let due = match self.last_sample {
            Some(last) => now.saturating_duration_since(last) >= self.settings.sample_interval(),
            None => true,
        };
        if !due {
            return;
        }
        let rounded = score.round().clamp(0.0, 100.0) as u8;
        self.score_timeline.push(rounded);
        self.peak_score = self.peak_score.max(rounded);
        self.last_sample = Some(now);
    }

    fn credit_hit(
        &mut self,
        timeline: &ReferenceTimeline,
        playback_time: f32,
        smoothed_score: Option<f32>,
        comparison: Option<&ComparisonResult>,
    ) -> Option<FrameHit> {
        let window = self.settings.hit_window_secs;
        let (index, entry) = timeline.entries().iter().enumerate().find(|(index, entry)| {
            !self.scored.contains(index)
                && playback_time >= entry.time
                && playback_time < entry.time + window
        })?;

        let score = smoothed_score.map_or(0, |s| s.round().clamp(0.0, 100.0) as u8);
        let tier = HitTier::from_score(score);
        let points = tier.points();

        self.scored.insert(index);
        self.frame_hits.record(tier);
        self.total_points += points;
        if let Some(result) = comparison {
            for (limb, limb_score) in result.limb_scores.iter() {
                let total = self.limb_totals.entry(limb).or_default();
                total.sum += limb_score as u32;
                total.count += 1;
            }
        }

        log::debug!(
            "reference frame {index} at {:.2}s hit: {tier:?} ({score})",
            entry.time
        );
        Some(FrameHit {
            index,
            time: entry.time,
            score,
            tier,
            points,
        })
    }

    /// Snapshots the session and clears every accumulator for the next one.
    pub fn finish(&mut self, timeline: &ReferenceTimeline, now: Instant) -> SessionStats {
        let session_duration_ms = self
            .started
            .map(|start| now.saturating_duration_since(start).as_millis() as u64)
            .unwrap_or(0);

        let stats = SessionStats {
            score_timeline: std::mem::take(&mut self.score_timeline),
            limb_totals: std::mem::take(&mut self.limb_totals),
            frame_hits: self.frame_hits,
            peak_score: self.peak_score,
            total_frames: timeline.len(),
            session_duration_ms,
            total_points: self.total_points,
        };
        self.reset();
        stats
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }
}
