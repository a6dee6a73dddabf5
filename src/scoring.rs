use std::{collections::VecDeque, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    compare::compare_detailed_with,
    config::{ComparisonSettings, FusionSettings},
    timeline::ReferenceTimeline,
    types::{
        AspectRatios, ComparisonResult, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER,
        LEFT_WRIST, Landmark, Pose, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
        RIGHT_WRIST,
    },
};

const BASELINE: f32 = 70.0;
const LOW_VISIBILITY: f32 = 0.5;
const LOW_VISIBILITY_PENALTY: f32 = -15.0;
const ASYMMETRY: Rule = Rule {
    threshold: 0.18,
    delta: -8.0,
};
const STILL_ENERGY: f32 = 0.008;
const FRANTIC_ENERGY: f32 = 0.12;
const SWEET_SPOT: (f32, f32) = (0.02, 0.06);
const SWEET_SPOT_BONUS: f32 = 10.0;
const MODERATE_BONUS: f32 = 5.0;
/// Worst-limb score below which the limb is called out by name.
const LIMB_ISSUE_SCORE: u8 = 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Dance,
    Gym,
}

impl ScoringMode {
    pub fn profile(&self) -> &'static ModeProfile {
        match self {
            ScoringMode::Dance => &DANCE,
            ScoringMode::Gym => &GYM,
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Dance => f.write_str("dance"),
            ScoringMode::Gym => f.write_str("gym"),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dance" => Ok(ScoringMode::Dance),
            "gym" => Ok(ScoringMode::Gym),
            other => Err(format!("unknown mode `{other}`, expected dance or gym")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    pub threshold: f32,
    pub delta: f32,
}

/// Mode-specific constants for the single-pose heuristic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeProfile {
    /// Wrists this far below the shoulders cost points.
    pub arm_drop: Option<Rule>,
    pub still_delta: f32,
    pub still_issue: Option<&'static str>,
    pub frantic_delta: f32,
    pub frantic_issue: &'static str,
    /// Horizontal hip/shoulder offset that counts as leaning.
    pub torso_lean: Option<Rule>,
    pub knee_bend: Option<Rule>,
}

pub const DANCE: ModeProfile = ModeProfile {
    arm_drop: Some(Rule {
        threshold: 0.15,
        delta: -10.0,
    }),
    still_delta: -12.0,
    still_issue: Some("Move with the music"),
    frantic_delta: -8.0,
    frantic_issue: "Slow down and control the movement",
    torso_lean: None,
    knee_bend: None,
};

pub const GYM: ModeProfile = ModeProfile {
    arm_drop: None,
    still_delta: 3.0,
    still_issue: None,
    frantic_delta: -15.0,
    frantic_issue: "Form is breaking down, slow the reps",
    torso_lean: Some(Rule {
        threshold: 0.05,
        delta: -12.0,
    }),
    knee_bend: Some(Rule {
        threshold: 0.15,
        delta: 5.0,
    }),
};

#[derive(Clone, Debug, PartialEq)]
pub struct HeuristicScore {
    pub score: u8,
    pub issues: Vec<String>,
}

/// Scores a live pose on its own, without looking at the reference.
///
/// `motion_energy` is the mean per-landmark displacement over recent frames;
/// `None` skips the motion term. Returns `None` for an incomplete pose.
pub fn heuristic_score(
    pose: &Pose,
    mode: ScoringMode,
    motion_energy: Option<f32>,
) -> Option<HeuristicScore> {
    if !pose.is_complete() {
        return None;
    }
    let profile = mode.profile();
    let lm = pose.landmarks();
    let mut score = BASELINE;
    let mut issues = Vec::new();

    if pose.mean_visibility() < LOW_VISIBILITY {
        score += LOW_VISIBILITY_PENALTY;
        issues.push("Step fully into the frame".to_string());
    }

    let wrist_y = (lm[LEFT_WRIST].y + lm[RIGHT_WRIST].y) / 2.0;
    let shoulder_y = (lm[LEFT_SHOULDER].y + lm[RIGHT_SHOULDER].y) / 2.0;
    if let Some(rule) = profile.arm_drop {
        if wrist_y > shoulder_y + rule.threshold {
            score += rule.delta;
            issues.push("Lift your arms higher".to_string());
        }
    }

    if (lm[LEFT_WRIST].y - lm[RIGHT_WRIST].y).abs() > ASYMMETRY.threshold {
        score += ASYMMETRY.delta;
        issues.push("Keep your arms level".to_string());
    }

    if let Some(energy) = motion_energy {
        if energy < STILL_ENERGY {
            score += profile.still_delta;
            if let Some(issue) = profile.still_issue {
                issues.push(issue.to_string());
            }
        } else if energy > FRANTIC_ENERGY {
            score += profile.frantic_delta;
            issues.push(profile.frantic_issue.to_string());
        } else if energy >= SWEET_SPOT.0 && energy <= SWEET_SPOT.1 {
            score += SWEET_SPOT_BONUS;
        } else {
            score += MODERATE_BONUS;
        }
    }

    if let Some(rule) = profile.torso_lean {
        let hip_x = (lm[LEFT_HIP].x + lm[RIGHT_HIP].x) / 2.0;
        let shoulder_x = (lm[LEFT_SHOULDER].x + lm[RIGHT_SHOULDER].x) / 2.0;
        if (hip_x - shoulder_x).abs() > rule.threshold {
            score += rule.delta;
            issues.push("Keep your torso upright".to_string());
        }
    }

    if let Some(rule) = profile.knee_bend {
        let bend = (leg_bend(&lm[LEFT_HIP], &lm[LEFT_KNEE], &lm[LEFT_ANKLE])
            + leg_bend(&lm[RIGHT_HIP], &lm[RIGHT_KNEE], &lm[RIGHT_ANKLE]))
            / 2.0;
        if bend > rule.threshold {
            score += rule.delta;
        }
    }

    Some(HeuristicScore {
        score: score.clamp(0.0, 100.0).round() as u8,
        issues,
    })
}

/// How much longer the hip-knee-ankle path is than the straight hip-ankle
/// line. Zero for a straight leg.
fn leg_bend(hip: &Landmark, knee: &Landmark, ankle: &Landmark) -> f32 {
    hip.distance_xy(knee) + knee.distance_xy(ankle) - hip.distance_xy(ankle)
}

struct MotionHistory {
    frames: VecDeque<Vec<(f32, f32)>>,
    capacity: usize,
}

impl MotionHistory {
    fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, pose: &Pose) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames
            .push_back(pose.landmarks().iter().map(|lm| (lm.x, lm.y)).collect());
    }

    /// Mean per-landmark displacement between frames two apart.
    fn energy(&self) -> Option<f32> {
        if self.frames.len() < 3 {
            return None;
        }
        let mut total = 0.0;
        let mut pairs = 0;
        for i in 2..self.frames.len() {
            let (older, newer) = (&self.frames[i - 2], &self.frames[i]);
            let count = older.len().min(newer.len());
            if count == 0 {
                continue;
            }
            let sum: f32 = older
                .iter()
                .zip(newer.iter())
                .map(|(a, b)| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt())
                .sum();
            total += sum / count as f32;
            pairs += 1;
        }
        (pairs > 0).then(|| total / pairs as f32)
    }

    fn clear(&mut self) {
        self.frames.clear();
    }
}

pub struct FusionInput<'a> {
    pub live: Option<&'a Pose>,
    pub timeline: &'a ReferenceTimeline,
    pub playback_time: f32,
    pub aspects: AspectRatios,
    pub anchor: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FusionOutput {
    /// Score to display. Only moves when it clears the dead zone.
    pub score: u8,
    pub changed: bool,
    /// Unsmoothed blend for this frame.
    pub final_score: u8,
    pub heuristic: u8,
    pub comparison: Option<ComparisonResult>,
    pub issues: Vec<String>,
}

/// Blends heuristic, reference comparison and the external anchor into one
/// smoothed score.
pub struct ScoreFusion {
    mode: ScoringMode,
    comparison_settings: ComparisonSettings,
    settings: FusionSettings,
    motion: MotionHistory,
    smoothed: Option<f32>,
    displayed: Option<u8>,
    last_comparison: Option<ComparisonResult>,
}

impl ScoreFusion {
    pub fn new(
        mode: ScoringMode,
        comparison_settings: ComparisonSettings,
        settings: FusionSettings,
    ) -> Self {
        let motion = MotionHistory::new(settings.motion_history.max(3));
        Self {
            mode,
            comparison_settings,
            settings,
            motion,
            smoothed: None,
            displayed: None,
            last_comparison: None,
        }
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    /// Full-precision EMA value, `None` until the first scored frame.
    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed
    }

    pub fn displayed(&self) -> Option<u8> {
        self.displayed
    }

    pub fn last_comparison(&self) -> Option<&ComparisonResult> {
        self.last_comparison.as_ref()
    }

    /// Scores one live frame. Returns `None` when there is no usable live
    /// pose; the smoothed state is left as it was.
    pub fn update(&mut self, input: FusionInput<'_>) -> Option<FusionOutput> {
        let live = input.live.filter(|pose| pose.is_complete())?;

        self.motion.push(live);
        let heuristic = heuristic_score(live, self.mode, self.motion.energy())?;
        let mut issues = heuristic.issues;

        let comparison = input
            .timeline
            .nearest(input.playback_time, self.settings.max_reference_distance_secs)
            .and_then(|(_, entry)| {
                compare_detailed_with(
                    &self.comparison_settings,
                    &entry.pose,
                    live,
                    input.aspects.reference,
                    input.aspects.live,
                )
            });

        let final_score = match &comparison {
            Some(result) => {
                let matched = result.match_score as f32;
                let own = heuristic.score as f32;
                let blended = match input.anchor.filter(|a| a.is_finite()) {
                    Some(anchor) => 0.5 * matched + 0.4 * anchor.clamp(0.0, 100.0) + 0.1 * own,
                    None => 0.8 * matched + 0.2 * own,
                };
                if result.limb_scores.get(result.worst_limb) < LIMB_ISSUE_SCORE {
                    issues.insert(0, format!("{} off from reference", result.worst_limb));
                }
                blended.round().clamp(0.0, 100.0)
            }
            None => heuristic.score as f32,
        };

        if !final_score.is_finite() {
            return None;
        }

        let alpha = self.settings.smoothing_alpha;
        let smoothed = match self.smoothed {
            Some(previous) => previous * (1.0 - alpha) + final_score * alpha,
            None => final_score,
        };
        self.smoothed = Some(smoothed);

        let rounded = smoothed.round().clamp(0.0, 100.0) as u8;
        let changed = match self.displayed {
            Some(shown) => rounded.abs_diff(shown) >= self.settings.dead_zone,
            None => true,
        };
        if changed {
            self.displayed = Some(rounded);
        }

        if comparison.is_some() {
            self.last_comparison = comparison.clone();
        }

        Some(FusionOutput {
            score: self.displayed.unwrap_or(rounded),
            changed,
            final_score: final_score as u8,
            heuristic: heuristic.score,
            comparison,
            issues,
        })
    }

    pub fn reset(&mut self) {
        self.motion.clear();
        self.smoothed = None;
        self.displayed = None;
        self.last_comparison = None;
    }
}
