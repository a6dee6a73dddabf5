use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    engine::{CoachSession, PlaybackState, TickInput},
    session::SessionStats,
    timeline::{ReferenceTimeline, TimelineEntry},
    types::{AspectRatios, GestureAction, Pose},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFile {
    pub aspect_ratio: f32,
    pub frames: Vec<TimelineEntry>,
}

impl ReferenceFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_json(path, "reference")
    }

    pub fn into_timeline(self) -> anyhow::Result<(ReferenceTimeline, f32)> {
        let timeline =
            ReferenceTimeline::new(self.frames).context("reference frames are not usable")?;
        Ok((timeline, self.aspect_ratio))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Wall-clock milliseconds since the recording started.
    pub t_ms: u64,
    pub playback_time: f32,
    #[serde(default)]
    pub paused: bool,
    pub pose: Option<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub live_aspect_ratio: f32,
    pub events: Vec<RecordedEvent>,
}

impl SessionFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        read_json(path, "session")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &str) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {kind} file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {kind} file {}", path.display()))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FiredGesture {
    pub t_ms: u64,
    pub action: GestureAction,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplayReport {
    pub gestures: Vec<FiredGesture>,
    pub final_score: Option<u8>,
    pub stats: SessionStats,
}

/// Feeds every recorded event through `session`, then finishes it.
pub fn replay(
    session: &mut CoachSession,
    recording: &SessionFile,
    reference_aspect: f32,
    mut on_event: impl FnMut(usize),
) -> ReplayReport {
    let start = Instant::now();
    let aspects = AspectRatios::new(reference_aspect, recording.live_aspect_ratio);

    let mut gestures = Vec::new();
    let mut final_score = None;
    let mut end = start;

    for (index, event) in recording.events.iter().enumerate() {
        let now = start + Duration::from_millis(event.t_ms);
        end = end.max(now);

        if let Some(anchor) = event.anchor {
            session.set_anchor(anchor, now);
        }

        let output = session.tick(TickInput {
            live: event.pose.clone(),
            playback: PlaybackState {
                time_secs: event.playback_time,
                paused: event.paused,
                aspects,
            },
            now,
        });

        if let Some(action) = output.gesture.fired {
            gestures.push(FiredGesture {
                t_ms: event.t_ms,
                action,
            });
        }
        if let Some(fusion) = &output.fusion {
            final_score = Some(fusion.score);
        }
        on_event(index);
    }

    let stats = session.finish(end);
    ReplayReport {
        gestures,
        final_score,
        stats,
    }
}
