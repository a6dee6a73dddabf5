use std::fmt;

use serde::{Deserialize, Serialize};

pub const NUM_LANDMARKS: usize = 33;

/// Landmarks below this confidence are treated as not detected.
pub const VISIBILITY_THRESHOLD: f32 = 0.3;

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// Hand-authored frames often omit this; they are treated as fully seen.
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility >= VISIBILITY_THRESHOLD
    }

    pub fn distance_xy(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detector frame of body landmarks in source-image coordinates.
///
/// A well-formed pose holds [`NUM_LANDMARKS`] entries. Shorter poses are
/// accepted everywhere and degrade to neutral behaviour.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    landmarks: Vec<Landmark>,
}

impl Pose {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Landmark at `index` if it exists and clears the visibility threshold.
    pub fn visible(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index).filter(|lm| lm.is_visible())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= NUM_LANDMARKS
    }

    pub fn mean_visibility(&self) -> f32 {
        if self.landmarks.is_empty() {
            return 0.0;
        }
        self.landmarks.iter().map(|lm| lm.visibility).sum::<f32>() / self.landmarks.len() as f32
    }
}

impl From<Vec<Landmark>> for Pose {
    fn from(landmarks: Vec<Landmark>) -> Self {
        Self::new(landmarks)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimbName {
    RightArm,
    LeftArm,
    RightLeg,
    LeftLeg,
    Torso,
}

impl LimbName {
    pub const ALL: [LimbName; 5] = [
        LimbName::RightArm,
        LimbName::LeftArm,
        LimbName::RightLeg,
        LimbName::LeftLeg,
        LimbName::Torso,
    ];

    pub fn index(&self) -> usize {
        match self {
            LimbName::RightArm => 0,
            LimbName::LeftArm => 1,
            LimbName::RightLeg => 2,
            LimbName::LeftLeg => 3,
            LimbName::Torso => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LimbName::RightArm => "Right arm",
            LimbName::LeftArm => "Left arm",
            LimbName::RightLeg => "Right leg",
            LimbName::LeftLeg => "Left leg",
            LimbName::Torso => "Torso",
        }
    }
}

impl fmt::Display for LimbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-limb scores in [`LimbName::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbScores([u8; 5]);

impl LimbScores {
    pub fn new(scores: [u8; 5]) -> Self {
        Self(scores)
    }

    pub fn get(&self, limb: LimbName) -> u8 {
        self.0[limb.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LimbName, u8)> + '_ {
        LimbName::ALL.iter().map(|limb| (*limb, self.0[limb.index()]))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseLabel {
    StarJump,
    ArmsUp,
    TPose,
    ArmsWide,
    LeftReach,
    RightReach,
    LowSquat,
    Crouch,
    WideStance,
    Neutral,
}

impl PoseLabel {
    pub fn label(&self) -> &'static str {
        match self {
            PoseLabel::StarJump => "Star jump",
            PoseLabel::ArmsUp => "Arms up",
            PoseLabel::TPose => "T-pose",
            PoseLabel::ArmsWide => "Arms wide",
            PoseLabel::LeftReach => "Left reach",
            PoseLabel::RightReach => "Right reach",
            PoseLabel::LowSquat => "Low squat",
            PoseLabel::Crouch => "Crouch",
            PoseLabel::WideStance => "Wide stance",
            PoseLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub match_score: u8,
    pub limb_scores: LimbScores,
    pub worst_limb: LimbName,
    pub pose_label: PoseLabel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureAction {
    PlayPause,
    SkipForward,
    SkipBackward,
    Restart,
}

impl GestureAction {
    pub fn label(&self) -> &'static str {
        match self {
            GestureAction::PlayPause => "play_pause",
            GestureAction::SkipForward => "skip_forward",
            GestureAction::SkipBackward => "skip_backward",
            GestureAction::Restart => "restart",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GestureOutput {
    pub fired: Option<GestureAction>,
    pub pending: Option<GestureAction>,
    pub progress: f32,
}

impl GestureOutput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn fired(action: GestureAction) -> Self {
        Self {
            fired: Some(action),
            pending: None,
            progress: 1.0,
        }
    }

    pub fn pending(action: GestureAction, progress: f32) -> Self {
        Self {
            fired: None,
            pending: Some(action),
            progress: progress.clamp(0.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitTier {
    Perfect,
    Great,
    Ok,
    Almost,
    Miss,
}

impl HitTier {
    pub const ALL: [HitTier; 5] = [
        HitTier::Perfect,
        HitTier::Great,
        HitTier::Ok,
        HitTier::Almost,
        HitTier::Miss,
    ];

    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => HitTier::Perfect,
            80..=89 => HitTier::Great,
            60..=79 => HitTier::Ok,
            40..=59 => HitTier::Almost,
            _ => HitTier::Miss,
        }
    }

    pub fn points(&self) -> u32 {
        match self {
            HitTier::Perfect => 25,
            HitTier::Great => 20,
            HitTier::Ok => 15,
            HitTier::Almost => 10,
            HitTier::Miss => 0,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            HitTier::Perfect => 0,
            HitTier::Great => 1,
            HitTier::Ok => 2,
            HitTier::Almost => 3,
            HitTier::Miss => 4,
        }
    }
}

/// Aspect ratios (width / height) of the two sources being compared.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AspectRatios {
    pub reference: f32,
    pub live: f32,
}

impl AspectRatios {
    pub fn new(reference: f32, live: f32) -> Self {
        Self { reference, live }
    }
}
