use std::{collections::VecDeque, time::Instant};

use crate::{
    config::GestureSettings,
    types::{
        GestureAction, GestureOutput, LEFT_SHOULDER, LEFT_WRIST, Pose, RIGHT_INDEX,
        RIGHT_SHOULDER, RIGHT_WRIST,
    },
};

/// One guard/action pair. Returns `Some` to claim the frame, `None` to let
/// the next stage look at it.
type Stage = fn(&mut GestureRecognizer, &BodySample, Instant) -> Option<GestureOutput>;

#[derive(Clone, Copy, Debug)]
struct BodySample {
    left_wrist: (f32, f32),
    right_wrist: (f32, f32),
    left_shoulder_y: f32,
    right_shoulder_y: f32,
    right_index_x: f32,
    wrists_still: bool,
}

#[derive(Clone, Debug, Default)]
struct GestureState {
    previous_wrists: Option<[(f32, f32); 2]>,
    dwell_start: Option<Instant>,
    wave_offset: Option<f32>,
    wave_direction: i8,
    reversals: VecDeque<Instant>,
    swipe_anchor: Option<(f32, Instant)>,
    last_trigger: Option<Instant>,
}

impl GestureState {
    fn clear_progress(&mut self) {
        self.previous_wrists = None;
        self.dwell_start = None;
        self.clear_wave();
        self.swipe_anchor = None;
    }

    fn clear_wave(&mut self) {
        self.wave_offset = None;
        self.wave_direction = 0;
        self.reversals.clear();
    }
}

/// Turns the live landmark stream into playback commands.
///
/// Guards run in a fixed order (restart, play/pause, skip) and the first one
/// that claims a frame ends evaluation, so overlapping poses such as both
/// hands up never fire two actions at once.
pub struct GestureRecognizer {
    settings: GestureSettings,
    state: GestureState,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureSettings::default())
    }
}

impl GestureRecognizer {
    const STAGES: [Stage; 3] = [
        GestureRecognizer::restart_dwell,
        GestureRecognizer::wave_play_pause,
        GestureRecognizer::swipe_skip,
    ];

    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            state: GestureState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }

    pub fn process(&mut self, landmarks: Option<&Pose>, now: Instant) -> GestureOutput {
        if let Some(last) = self.state.last_trigger {
            if now.saturating_duration_since(last) < self.settings.cooldown() {
                self.state.clear_progress();
                return GestureOutput::idle();
            }
        }

        let Some(pose) = landmarks.filter(|pose| pose.is_complete()) else {
            return GestureOutput::idle();
        };

        let sample = self.sample(pose);
        for stage in Self::STAGES {
            if let Some(output) = stage(self, &sample, now) {
                return output;
            }
        }
        GestureOutput::idle()
    }

    fn sample(&mut self, pose: &Pose) -> BodySample {
        let lm = pose.landmarks();
        let left_wrist = (lm[LEFT_WRIST].x, lm[LEFT_WRIST].y);
        let right_wrist = (lm[RIGHT_WRIST].x, lm[RIGHT_WRIST].y);

        let wrists_still = match self.state.previous_wrists {
            Some([prev_left, prev_right]) => {
                distance(prev_left, left_wrist) < self.settings.stillness
                    && distance(prev_right, right_wrist) < self.settings.stillness
            }
            None => false,
        };
        self.state.previous_wrists = Some([left_wrist, right_wrist]);

        BodySample {
            left_wrist,
            right_wrist,
            left_shoulder_y: lm[LEFT_SHOULDER].y,
            right_shoulder_y: lm[RIGHT_SHOULDER].y,
            right_index_x: lm[RIGHT_INDEX].x,
            wrists_still,
        }
    }

    fn restart_dwell(&mut self, body: &BodySample, now: Instant) -> Option<GestureOutput> {
        let line = body.left_shoulder_y.min(body.right_shoulder_y) - self.settings.raise_margin;
        let raised = body.left_wrist.1 < line && body.right_wrist.1 < line;
        if !(raised && body.wrists_still) {
            self.state.dwell_start = None;
            return None;
        }

        let start = *self.state.dwell_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        let dwell = self.settings.restart_dwell();
        if elapsed >= dwell {
            return Some(self.trigger(GestureAction::Restart, now));
        }
        Some(GestureOutput::pending(
            GestureAction::Restart,
            elapsed.as_secs_f32() / dwell.as_secs_f32(),
        ))
    }

    fn wave_play_pause(&mut self, body: &BodySample, now: Instant) -> Option<GestureOutput> {
        if body.right_wrist.1 >= body.right_shoulder_y {
            self.state.clear_wave();
            return None;
        }

        let window = self.settings.wave_window();
        while let Some(front) = self.state.reversals.front() {
            if now.saturating_duration_since(*front) > window {
                self.state.reversals.pop_front();
            } else {
                break;
            }
        }

        let offset = body.right_index_x - body.right_wrist.0;
        match self.state.wave_offset {
            None => self.state.wave_offset = Some(offset),
            Some(previous) => {
                let delta = offset - previous;
                if delta.abs() > self.settings.wave_min_delta {
                    let direction = if delta > 0.0 { 1 } else { -1 };
                    if self.state.wave_direction != 0 && direction != self.state.wave_direction {
                        self.state.reversals.push_back(now);
                    }
                    self.state.wave_direction = direction;
                    self.state.wave_offset = Some(offset);
                }
            }
        }

        let needed = self.settings.wave_reversals;
        let count = self.state.reversals.len();
        if count >= needed {
            return Some(self.trigger(GestureAction::PlayPause, now));
        }
        Some(GestureOutput::pending(
            GestureAction::PlayPause,
            count as f32 / needed as f32,
        ))
    }

    fn swipe_skip(&mut self, body: &BodySample, now: Instant) -> Option<GestureOutput> {
        if body.left_wrist.1 >= body.left_shoulder_y {
            self.state.swipe_anchor = None;
            return None;
        }

        let x = body.left_wrist.0;
        let Some((anchor_x, started)) = self.state.swipe_anchor else {
            self.state.swipe_anchor = Some((x, now));
            return None;
        };

        if now.saturating_duration_since(started) > self.settings.swipe_max() {
            // too slow, start a fresh attempt from here
            self.state.swipe_anchor = Some((x, now));
            return None;
        }

        let dx = x - anchor_x;
        let direction = if dx > 0.0 {
            GestureAction::SkipBackward
        } else {
            GestureAction::SkipForward
        };
        if dx.abs() >= self.settings.swipe_min_delta {
            return Some(self.trigger(direction, now));
        }
        if dx == 0.0 {
            return None;
        }
        Some(GestureOutput::pending(
            direction,
            dx.abs() / self.settings.swipe_min_delta,
        ))
    }

    fn trigger(&mut self, action: GestureAction, now: Instant) -> GestureOutput {
        log::debug!("gesture fired: {}", action.label());
        self.state.last_trigger = Some(now);
        self.state.clear_progress();
        GestureOutput::fired(action)
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::tests::standing_pose;
    use crate::types::{LEFT_INDEX, Landmark};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::time::Duration;

    fn pose_with(edits: &[(usize, f32, f32)]) -> Pose {
        let mut points = standing_pose().landmarks().to_vec();
        for &(idx, x, y) in edits {
            points[idx].x = x;
            points[idx].y = y;
        }
        Pose::new(points)
    }

    fn hands_up() -> Pose {
        pose_with(&[(LEFT_WRIST, 0.60, 0.10), (RIGHT_WRIST, 0.40, 0.10)])
    }

    fn right_hand_up(index_x: f32) -> Pose {
        pose_with(&[(RIGHT_WRIST, 0.40, 0.20), (RIGHT_INDEX, index_x, 0.17)])
    }

    fn left_hand_up(x: f32) -> Pose {
        pose_with(&[(LEFT_WRIST, x, 0.22), (LEFT_INDEX, x, 0.19)])
    }

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn restart_fires_once_after_dwell() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        let pose = hands_up();

        // first frame only establishes the wrist baseline
        let first = recognizer.process(Some(&pose), base);
        assert!(first.fired.is_none());
        assert_ne!(first.pending, Some(GestureAction::Restart));

        let mut fired = Vec::new();
        for ms in (100..=2_100).step_by(100) {
            let out = recognizer.process(Some(&pose), at(base, ms));
            if ms == 1_100 {
                assert_eq!(out.pending, Some(GestureAction::Restart));
                assert!((out.progress - 0.5).abs() < 1e-3);
            }
            fired.extend(out.fired);
        }
        assert_eq!(fired, vec![GestureAction::Restart]);

        let after = recognizer.process(Some(&pose), at(base, 2_101));
        assert_eq!(after, GestureOutput::idle());
    }

    #[test]
    fn held_hands_need_a_fresh_dwell_after_cooldown() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        let pose = hands_up();

        let mut fired_at = Vec::new();
        for ms in (0..=6_300).step_by(100) {
            let out = recognizer.process(Some(&pose), at(base, ms));
            if out.fired.is_some() {
                fired_at.push(ms);
            }
            match ms {
                2_200..=4_000 => assert_eq!(out, GestureOutput::idle()),
                // cooldown over: this frame only re-establishes the wrist baseline
                4_100 => assert_ne!(out.pending, Some(GestureAction::Restart)),
                4_200 => {
                    assert_eq!(out.pending, Some(GestureAction::Restart));
                    assert_eq!(out.progress, 0.0);
                }
                _ => {}
            }
        }
        assert_eq!(fired_at, vec![2_100, 6_200]);
    }

    #[test]
    fn reversals_during_cooldown_are_forgotten() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        for (i, x) in [0.40, 0.45, 0.40, 0.45, 0.40].iter().enumerate() {
            recognizer.process(Some(&right_hand_up(*x)), at(base, i as u64 * 100));
        }

        // keep waving through the 2s cooldown
        for step in 5..24u64 {
            let x = if step % 2 == 0 { 0.40 } else { 0.45 };
            let out = recognizer.process(Some(&right_hand_up(x)), at(base, step * 100));
            assert_eq!(out, GestureOutput::idle());
        }

        let out = recognizer.process(Some(&right_hand_up(0.40)), at(base, 2_400));
        assert_eq!(out.pending, Some(GestureAction::PlayPause));
        assert_eq!(out.progress, 0.0);
        let out = recognizer.process(Some(&right_hand_up(0.45)), at(base, 2_500));
        assert_eq!(out.progress, 0.0);
        let out = recognizer.process(Some(&right_hand_up(0.40)), at(base, 2_600));
        assert!(out.fired.is_none());
        assert!((out.progress - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn moving_hands_never_restart() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        for step in 0..40u64 {
            let x = if step % 2 == 0 { 0.60 } else { 0.66 };
            let pose = pose_with(&[(LEFT_WRIST, x, 0.10), (RIGHT_WRIST, 0.40, 0.10)]);
            let out = recognizer.process(Some(&pose), at(base, step * 100));
            assert_ne!(out.fired, Some(GestureAction::Restart));
            assert_ne!(out.pending, Some(GestureAction::Restart));
        }
    }

    #[test]
    fn three_reversals_toggle_playback() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        let offsets = [0.40, 0.45, 0.40, 0.45];
        for (i, x) in offsets.iter().enumerate() {
            let out = recognizer.process(Some(&right_hand_up(*x)), at(base, i as u64 * 100));
            assert_eq!(out.pending, Some(GestureAction::PlayPause));
            assert!(out.fired.is_none());
        }
        let out = recognizer.process(Some(&right_hand_up(0.40)), at(base, 400));
        assert_eq!(out.fired, Some(GestureAction::PlayPause));
    }

    #[test]
    fn slow_wave_reversals_expire() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        let offsets = [0.40, 0.45, 0.40, 0.45, 0.40];
        for (i, x) in offsets.iter().enumerate() {
            let out = recognizer.process(Some(&right_hand_up(*x)), at(base, i as u64 * 700));
            assert!(out.fired.is_none());
        }
    }

    #[test]
    fn lowering_the_hand_clears_the_wave() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        for (i, x) in [0.40, 0.45, 0.40, 0.45].iter().enumerate() {
            recognizer.process(Some(&right_hand_up(*x)), at(base, i as u64 * 100));
        }
        recognizer.process(Some(&standing_pose()), at(base, 400));
        let out = recognizer.process(Some(&right_hand_up(0.40)), at(base, 500));
        assert_eq!(out.pending, Some(GestureAction::PlayPause));
        assert_eq!(out.progress, 0.0);
    }

    #[test]
    fn fast_swipes_skip_in_both_directions() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        recognizer.process(Some(&left_hand_up(0.60)), base);
        let out = recognizer.process(Some(&left_hand_up(0.70)), at(base, 100));
        assert_eq!(out.pending, Some(GestureAction::SkipBackward));
        let out = recognizer.process(Some(&left_hand_up(0.80)), at(base, 200));
        assert_eq!(out.fired, Some(GestureAction::SkipBackward));

        let later = at(base, 3_000);
        recognizer.process(Some(&left_hand_up(0.80)), later);
        let out = recognizer.process(Some(&left_hand_up(0.60)), later + Duration::from_millis(150));
        assert_eq!(out.fired, Some(GestureAction::SkipForward));
    }

    #[test]
    fn slow_swipe_reanchors() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        recognizer.process(Some(&left_hand_up(0.60)), base);
        // 500ms later the attempt has expired; this frame becomes the new anchor
        let out = recognizer.process(Some(&left_hand_up(0.70)), at(base, 500));
        assert!(out.fired.is_none());
        let out = recognizer.process(Some(&left_hand_up(0.80)), at(base, 600));
        assert_eq!(out.pending, Some(GestureAction::SkipBackward));
        let out = recognizer.process(Some(&left_hand_up(0.86)), at(base, 700));
        assert_eq!(out.fired, Some(GestureAction::SkipBackward));
    }

    #[test]
    fn missing_or_short_frames_are_idle_and_keep_state() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        recognizer.process(Some(&left_hand_up(0.60)), base);
        assert_eq!(recognizer.process(None, at(base, 50)), GestureOutput::idle());
        let short = Pose::new(vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 20]);
        assert_eq!(
            recognizer.process(Some(&short), at(base, 100)),
            GestureOutput::idle()
        );
        // the anchor from the first frame survived the gaps
        let out = recognizer.process(Some(&left_hand_up(0.80)), at(base, 200));
        assert_eq!(out.fired, Some(GestureAction::SkipBackward));
    }

    #[test]
    fn restart_outranks_wave() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        let pose = hands_up();
        recognizer.process(Some(&pose), base);
        let out = recognizer.process(Some(&pose), at(base, 100));
        assert_eq!(out.pending, Some(GestureAction::Restart));
    }

    #[test]
    fn reset_forgets_cooldown() {
        let mut recognizer = GestureRecognizer::default();
        let base = Instant::now();
        recognizer.process(Some(&left_hand_up(0.60)), base);
        let out = recognizer.process(Some(&left_hand_up(0.80)), at(base, 100));
        assert!(out.fired.is_some());

        recognizer.reset();
        recognizer.process(Some(&left_hand_up(0.60)), at(base, 200));
        let out = recognizer.process(Some(&left_hand_up(0.80)), at(base, 300));
        assert_eq!(out.fired, Some(GestureAction::SkipBackward));
    }

    #[test]
    fn no_two_actions_inside_cooldown() {
        let settings = GestureSettings::default();
        let mut rng = StdRng::seed_from_u64(11);
        let candidates = [
            hands_up(),
            right_hand_up(0.40),
            right_hand_up(0.46),
            left_hand_up(0.55),
            left_hand_up(0.75),
            standing_pose(),
        ];

        for _ in 0..20 {
            let mut recognizer = GestureRecognizer::new(settings.clone());
            let mut now = Instant::now();
            let mut last_fire: Option<Instant> = None;
            for _ in 0..600 {
                now += Duration::from_millis(rng.gen_range(10..120));
                let pose = if rng.gen_bool(0.05) {
                    None
                } else {
                    Some(&candidates[rng.gen_range(0..candidates.len())])
                };
                if recognizer.process(pose, now).fired.is_some() {
                    if let Some(previous) = last_fire {
                        assert!(now.duration_since(previous) >= settings.cooldown());
                    }
                    last_fire = Some(now);
                }
            }
        }
    }
}
