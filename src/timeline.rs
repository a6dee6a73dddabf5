use serde::{Deserialize, Serialize};

use crate::{error::EngineError, types::Pose};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Seconds from the start of the reference video.
    pub time: f32,
    pub pose: Pose,
}

impl TimelineEntry {
    pub fn new(time: f32, pose: Pose) -> Self {
        Self { time, pose }
    }
}

/// Sparse, time-ordered reference poses. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReferenceTimeline {
    entries: Vec<TimelineEntry>,
}

impl ReferenceTimeline {
    pub fn new(entries: Vec<TimelineEntry>) -> Result<Self, EngineError> {
        if entries.is_empty() {
            return Err(EngineError::EmptyTimeline);
        }
        for (index, entry) in entries.iter().enumerate() {
            if !entry.time.is_finite() {
                return Err(EngineError::NonFiniteTime { index });
            }
            if index > 0 && entry.time < entries[index - 1].time {
                return Err(EngineError::UnorderedTimeline {
                    index,
                    time: entry.time,
                    previous: entries[index - 1].time,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Keeps the first frame and then one frame per `interval_secs`.
    pub fn sample_every(track: &[TimelineEntry], interval_secs: f32) -> Result<Self, EngineError> {
        if !(interval_secs.is_finite() && interval_secs > 0.0) {
            return Err(EngineError::InvalidSetting {
                name: "interval_secs",
                reason: format!("must be a positive number, got {interval_secs}"),
            });
        }

        let mut sampled: Vec<TimelineEntry> = Vec::new();
        for entry in track {
            let due = match sampled.last() {
                Some(last) => entry.time >= last.time + interval_secs,
                None => true,
            };
            if due {
                sampled.push(entry.clone());
            }
        }
        Self::new(sampled)
    }

    /// Picks `count` frames spread evenly across the track, first and last
    /// included.
    pub fn sample_count(track: &[TimelineEntry], count: usize) -> Result<Self, EngineError> {
        if count == 0 || track.is_empty() {
            return Err(EngineError::EmptyTimeline);
        }
        if count >= track.len() {
            return Self::new(track.to_vec());
        }
        if count == 1 {
            return Self::new(vec![track[0].clone()]);
        }

        let last = track.len() - 1;
        let sampled = (0..count)
            .map(|i| track[i * last / (count - 1)].clone())
            .collect();
        Self::new(sampled)
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duration(&self) -> f32 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Entry closest to `time`, if one lies within `max_distance` seconds.
    /// Ties go to the earlier entry.
    pub fn nearest(&self, time: f32, max_distance: f32) -> Option<(usize, &TimelineEntry)> {
        let split = self.entries.partition_point(|entry| entry.time < time);
        let before = split.checked_sub(1);
        let after = (split < self.entries.len()).then_some(split);

        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if time - self.entries[b].time <= self.entries[a].time - time {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        let entry = &self.entries[best];
        ((entry.time - time).abs() <= max_distance).then_some((best, entry))
    }
}
