use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::{
    config::EngineConfig,
    error::EngineError,
    gesture::GestureRecognizer,
    scoring::{FusionInput, FusionOutput, ScoreFusion},
    session::{FrameHit, SessionStats, SessionTracker},
    timeline::ReferenceTimeline,
    types::{AspectRatios, GestureOutput, Pose},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub time_secs: f32,
    pub paused: bool,
    pub aspects: AspectRatios,
}

#[derive(Clone, Debug)]
pub struct TickInput {
    pub live: Option<Pose>,
    pub playback: PlaybackState,
    pub now: Instant,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickOutput {
    pub gesture: GestureOutput,
    /// `None` while paused or when no usable pose was detected.
    pub fusion: Option<FusionOutput>,
    pub hit: Option<FrameHit>,
}

#[derive(Clone, Copy, Debug)]
struct Anchor {
    score: f32,
    received: Instant,
}

/// One user's coaching session against one reference timeline.
pub struct CoachSession {
    config: EngineConfig,
    timeline: Arc<ReferenceTimeline>,
    gestures: GestureRecognizer,
    fusion: ScoreFusion,
    tracker: SessionTracker,
    anchor: Option<Anchor>,
    anchor_max_age: Option<Duration>,
}

impl CoachSession {
    pub fn new(
        config: EngineConfig,
        timeline: Arc<ReferenceTimeline>,
    ) -> Result<Self, EngineError> {
        if let Err(err) = config.validate() {
            log::warn!("rejecting session config: {err}");
            return Err(err);
        }
        let anchor_max_age = config.fusion.anchor_max_age()?;

        log::info!(
            "starting {} session over {} reference frames ({:.1}s)",
            config.mode,
            timeline.len(),
            timeline.duration()
        );

        Ok(Self {
            gestures: GestureRecognizer::new(config.gesture.clone()),
            fusion: ScoreFusion::new(
                config.mode,
                config.comparison.clone(),
                config.fusion.clone(),
            ),
            tracker: SessionTracker::new(config.session.clone()),
            anchor: None,
            anchor_max_age,
            timeline,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeline(&self) -> &ReferenceTimeline {
        &self.timeline
    }

    pub fn displayed_score(&self) -> Option<u8> {
        self.fusion.displayed()
    }

    /// Replaces the slow external score blended into every following frame.
    /// A non-finite score clears the anchor.
    pub fn set_anchor(&mut self, score: f32, now: Instant) {
        if !score.is_finite() {
            log::warn!("ignoring non-finite anchor score {score}");
            self.anchor = None;
            return;
        }
        self.anchor = Some(Anchor {
            score,
            received: now,
        });
    }

    fn current_anchor(&self, now: Instant) -> Option<f32> {
        let anchor = self.anchor?;
        match self.anchor_max_age {
            Some(max_age) if now.saturating_duration_since(anchor.received) > max_age => None,
            _ => Some(anchor.score),
        }
    }

    pub fn tick(&mut self, input: TickInput) -> TickOutput {
        let TickInput {
            live,
            playback,
            now,
        } = input;

        let gesture = self.gestures.process(live.as_ref(), now);

        let fusion = if playback.paused {
            None
        } else {
            let anchor = self.current_anchor(now);
            self.fusion.update(FusionInput {
                live: live.as_ref(),
                timeline: &self.timeline,
                playback_time: playback.time_secs,
                aspects: playback.aspects,
                anchor,
            })
        };

        let hit = self.tracker.tick(
            &self.timeline,
            playback.time_secs,
            self.fusion.smoothed(),
            self.fusion.last_comparison(),
            now,
        );

        TickOutput {
            gesture,
            fusion,
            hit,
        }
    }

    /// Ends the session: returns its stats and leaves every component fresh.
    pub fn finish(&mut self, now: Instant) -> SessionStats {
        let stats = self.tracker.finish(&self.timeline, now);
        log::info!(
            "session finished: {} points, peak {}, {}/{} frames hit",
            stats.total_points,
            stats.peak_score,
            stats.frame_hits.total(),
            stats.total_frames
        );
        self.reset();
        stats
    }

    pub fn reset(&mut self) {
        self.gestures.reset();
        self.fusion.reset();
        self.tracker.reset();
        self.anchor = None;
    }
}

#[derive(Debug)]
pub enum SessionEvent {
    Tick(TickInput),
    Anchor { score: f32, at: Instant },
    Finish { at: Instant },
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    Tick(TickOutput),
    Finished(SessionStats),
}

/// Runs `session` on its own thread until `event_rx` closes.
///
/// Every event is processed in order: rewind detection needs each playback
/// timestamp, so ticks are never coalesced.
pub fn start_session_worker(
    session: CoachSession,
    event_rx: Receiver<SessionEvent>,
    update_tx: Sender<SessionUpdate>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || run_worker_loop(session, event_rx, update_tx))
}

fn run_worker_loop(
    mut session: CoachSession,
    event_rx: Receiver<SessionEvent>,
    update_tx: Sender<SessionUpdate>,
) {
    while let Ok(event) = event_rx.recv() {
        let update = match event {
            SessionEvent::Tick(input) => SessionUpdate::Tick(session.tick(input)),
            SessionEvent::Anchor { score, at } => {
                session.set_anchor(score, at);
                continue;
            }
            SessionEvent::Finish { at } => SessionUpdate::Finished(session.finish(at)),
            SessionEvent::Reset => {
                session.reset();
                continue;
            }
        };

        if update_tx.send(update).is_err() {
            log::debug!("session update receiver closed, stopping worker");
            break;
        }
    }
}
