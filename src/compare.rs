use serde::Serialize;

use crate::{
    config::ComparisonSettings,
    normalize::{NormalizedPose, normalize},
    skeleton::{CONNECTIONS, LIMB_GROUPS, MatchTier},
    types::{
        ComparisonResult, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, LimbName,
        LimbScores, NOSE, Pose, PoseLabel, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
        RIGHT_WRIST,
    },
};

pub const THRESH_GOOD: f32 = 0.06;
pub const THRESH_OK: f32 = 0.12;
/// Score for a limb the reference gives us nothing to compare against.
pub const NEUTRAL_LIMB_SCORE: u8 = 50;

const WIDE_STANCE: f32 = 0.2;
const WIDE_ARMS: f32 = 0.4;
const SHOULDER_BAND: f32 = 0.1;
const REACH_MARGIN: f32 = 0.1;
const LOW_HIPS: f32 = 0.12;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionMatch {
    pub from: usize,
    pub to: usize,
    pub tier: MatchTier,
    pub color: [u8; 4],
}

/// Per-connection view of a comparison, for drawing a coloured skeleton.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkeletonComparison {
    pub overall_score: u8,
    pub connections: Vec<ConnectionMatch>,
}

pub fn compare_detailed(
    reference: &Pose,
    live: &Pose,
    reference_aspect: f32,
    live_aspect: f32,
) -> Option<ComparisonResult> {
    compare_detailed_with(
        &ComparisonSettings::default(),
        reference,
        live,
        reference_aspect,
        live_aspect,
    )
}

/// Scores `live` against `reference` limb by limb.
///
/// Returns `None` when no limb of the reference had a single visible joint.
pub fn compare_detailed_with(
    settings: &ComparisonSettings,
    reference: &Pose,
    live: &Pose,
    reference_aspect: f32,
    live_aspect: f32,
) -> Option<ComparisonResult> {
    let reference = normalize(reference, reference_aspect);
    let live = normalize(live, live_aspect);

    let mut scores = [NEUTRAL_LIMB_SCORE; 5];
    let mut scored_any = false;
    for group in LIMB_GROUPS.iter() {
        let distances: Vec<f32> = group
            .indices
            .iter()
            .filter_map(|&idx| joint_distance(settings, &reference, &live, idx))
            .collect();
        if let Some(score) = distance_score(settings, &distances) {
            scores[group.name.index()] = score;
            scored_any = true;
        }
    }

    if !scored_any {
        return None;
    }

    let total: u32 = scores.iter().map(|s| *s as u32).sum();
    let match_score = (total as f32 / scores.len() as f32).round() as u8;

    let mut worst_limb = LimbName::ALL[0];
    for limb in LimbName::ALL {
        if scores[limb.index()] < scores[worst_limb.index()] {
            worst_limb = limb;
        }
    }

    Some(ComparisonResult {
        match_score,
        limb_scores: LimbScores::new(scores),
        worst_limb,
        pose_label: pose_label(&reference),
    })
}

pub fn compare(
    reference: &Pose,
    live: &Pose,
    reference_aspect: f32,
    live_aspect: f32,
) -> SkeletonComparison {
    compare_with(
        &ComparisonSettings::default(),
        reference,
        live,
        reference_aspect,
        live_aspect,
    )
}

pub fn compare_with(
    settings: &ComparisonSettings,
    reference: &Pose,
    live: &Pose,
    reference_aspect: f32,
    live_aspect: f32,
) -> SkeletonComparison {
    let reference = normalize(reference, reference_aspect);
    let live = normalize(live, live_aspect);

    let mut connections = Vec::with_capacity(CONNECTIONS.len());
    let mut scores = Vec::with_capacity(CONNECTIONS.len());
    for &(from, to) in CONNECTIONS {
        let distances: Vec<f32> = [from, to]
            .iter()
            .filter_map(|&idx| joint_distance(settings, &reference, &live, idx))
            .collect();
        if distances.is_empty() {
            continue;
        }
        let avg = distances.iter().sum::<f32>() / distances.len() as f32;
        let tier = if avg < settings.thresh_good {
            MatchTier::Good
        } else if avg < settings.thresh_ok {
            MatchTier::Ok
        } else {
            MatchTier::Bad
        };
        if let Some(score) = distance_score(settings, &distances) {
            scores.push(score as u32);
        }
        connections.push(ConnectionMatch {
            from,
            to,
            tier,
            color: tier.color(),
        });
    }

    let overall_score = if scores.is_empty() {
        NEUTRAL_LIMB_SCORE
    } else {
        (scores.iter().sum::<u32>() as f32 / scores.len() as f32).round() as u8
    };

    SkeletonComparison {
        overall_score,
        connections,
    }
}

/// Distance for one joint, reference-centric: joints the reference does not
/// show are skipped, a shown joint the live pose lacks costs the full penalty.
fn joint_distance(
    settings: &ComparisonSettings,
    reference: &NormalizedPose,
    live: &NormalizedPose,
    idx: usize,
) -> Option<f32> {
    let reference_joint = reference.visible(idx)?;
    match live.visible(idx) {
        Some(live_joint) => Some(reference_joint.distance_xy(live_joint)),
        None => Some(settings.missing_penalty),
    }
}

fn distance_score(settings: &ComparisonSettings, distances: &[f32]) -> Option<u8> {
    if distances.is_empty() {
        return None;
    }
    let avg = distances.iter().sum::<f32>() / distances.len() as f32;
    let score = 100.0 * (1.0 - avg / (2.0 * settings.thresh_ok));
    Some(score.clamp(0.0, 100.0).round() as u8)
}

/// Coarse name for what the reference is doing. Rules overlap, so the first
/// match wins.
pub fn pose_label(pose: &NormalizedPose) -> PoseLabel {
    let lm = pose.landmarks();
    if lm.len() <= RIGHT_ANKLE {
        return PoseLabel::Neutral;
    }
    let (nose, ls, rs) = (&lm[NOSE], &lm[LEFT_SHOULDER], &lm[RIGHT_SHOULDER]);
    let (lw, rw) = (&lm[LEFT_WRIST], &lm[RIGHT_WRIST]);
    let (lh, rh) = (&lm[LEFT_HIP], &lm[RIGHT_HIP]);
    let (lk, rk) = (&lm[LEFT_KNEE], &lm[RIGHT_KNEE]);
    let (la, ra) = (&lm[LEFT_ANKLE], &lm[RIGHT_ANKLE]);

    let shoulder_y = (ls.y + rs.y) / 2.0;
    let hip_y = (lh.y + rh.y) / 2.0;
    let knee_y = (lk.y + rk.y) / 2.0;

    let both_up = lw.y < nose.y && rw.y < nose.y;
    let wide_stance = (la.x - ra.x).abs() > WIDE_STANCE;
    let arms_wide = (lw.x - rw.x).abs() > WIDE_ARMS;
    let at_shoulder_height =
        (lw.y - shoulder_y).abs() < SHOULDER_BAND && (rw.y - shoulder_y).abs() < SHOULDER_BAND;
    let left_up = lw.y < shoulder_y - REACH_MARGIN;
    let right_up = rw.y < shoulder_y - REACH_MARGIN;
    let hips_low = knee_y - hip_y < LOW_HIPS;

    if both_up && wide_stance {
        PoseLabel::StarJump
    } else if both_up {
        PoseLabel::ArmsUp
    } else if arms_wide && at_shoulder_height && wide_stance {
        PoseLabel::TPose
    } else if arms_wide {
        PoseLabel::ArmsWide
    } else if left_up {
        PoseLabel::LeftReach
    } else if right_up {
        PoseLabel::RightReach
    } else if hips_low && wide_stance {
        PoseLabel::LowSquat
    } else if hips_low {
        PoseLabel::Crouch
    } else if wide_stance {
        PoseLabel::WideStance
    } else {
        PoseLabel::Neutral
    }
}
