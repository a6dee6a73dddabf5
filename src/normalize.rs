use crate::types::{LEFT_HIP, LEFT_SHOULDER, Landmark, Pose, RIGHT_HIP, RIGHT_SHOULDER};

/// Shoulder-midpoint to hip-midpoint distance after normalization.
pub const TARGET_TORSO_LENGTH: f32 = 0.25;
/// Below this torso length the pose is left unscaled.
pub const MIN_TORSO_LENGTH: f32 = 0.01;
/// Where the hip midpoint lands. Sits below centre so the legs keep headroom.
pub const ANCHOR_X: f32 = 0.5;
pub const ANCHOR_Y: f32 = 0.6;

/// A pose recentred on the hips and scaled to a fixed torso length.
///
/// Only [`normalize`] builds one, so a value of this type is always in the
/// canonical coordinate space (or is an untouched pass-through of a pose that
/// lacked shoulders or hips).
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedPose {
    landmarks: Vec<Landmark>,
}

impl NormalizedPose {
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn visible(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index).filter(|lm| lm.is_visible())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn torso_length(&self) -> Option<f32> {
        let (hip, shoulder) = midpoints(&self.landmarks)?;
        Some(distance(hip, shoulder))
    }
}

/// Maps `pose` into the canonical torso-relative space.
///
/// `aspect_ratio` is the source's width / height. x is stretched by it first
/// so sources with different frame shapes share one square space.
pub fn normalize(pose: &Pose, aspect_ratio: f32) -> NormalizedPose {
    let raw = pose.landmarks();
    if midpoints(raw).is_none() {
        return NormalizedPose {
            landmarks: raw.to_vec(),
        };
    }

    let corrected: Vec<Landmark> = raw
        .iter()
        .map(|lm| Landmark {
            x: lm.x * aspect_ratio,
            ..*lm
        })
        .collect();

    let Some((hip, shoulder)) = midpoints(&corrected) else {
        return NormalizedPose {
            landmarks: raw.to_vec(),
        };
    };

    let torso = distance(hip, shoulder);
    let scale = if torso > MIN_TORSO_LENGTH {
        TARGET_TORSO_LENGTH / torso
    } else {
        1.0
    };

    let landmarks = corrected
        .iter()
        .map(|lm| Landmark {
            x: ANCHOR_X + (lm.x - hip.0) * scale,
            y: ANCHOR_Y + (lm.y - hip.1) * scale,
            z: lm.z,
            visibility: lm.visibility,
        })
        .collect();

    NormalizedPose { landmarks }
}

fn midpoints(points: &[Landmark]) -> Option<((f32, f32), (f32, f32))> {
    let ls = points.get(LEFT_SHOULDER)?;
    let rs = points.get(RIGHT_SHOULDER)?;
    let lh = points.get(LEFT_HIP)?;
    let rh = points.get(RIGHT_HIP)?;

    let hip = ((lh.x + rh.x) / 2.0, (lh.y + rh.y) / 2.0);
    let shoulder = ((ls.x + rs.x) / 2.0, (ls.y + rs.y) / 2.0);
    Some((hip, shoulder))
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::NUM_LANDMARKS;

    /// A standing figure in image coordinates, every landmark fully visible.
    pub(crate) fn standing_pose() -> Pose {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0, 0.95); NUM_LANDMARKS];
        let mut set = |idx: usize, x: f32, y: f32| points[idx] = Landmark::new(x, y, 0.0, 0.95);
        set(0, 0.50, 0.15);
        set(11, 0.56, 0.30);
        set(12, 0.44, 0.30);
        set(13, 0.60, 0.42);
        set(14, 0.40, 0.42);
        set(15, 0.61, 0.54);
        set(16, 0.39, 0.54);
        set(19, 0.62, 0.57);
        set(20, 0.38, 0.57);
        set(23, 0.54, 0.58);
        set(24, 0.46, 0.58);
        set(25, 0.55, 0.74);
        set(26, 0.45, 0.74);
        set(27, 0.55, 0.90);
        set(28, 0.45, 0.90);
        Pose::new(points)
    }

    fn transform(pose: &Pose, scale: f32, dx: f32, dy: f32) -> Pose {
        Pose::new(
            pose.landmarks()
                .iter()
                .map(|lm| Landmark::new(lm.x * scale + dx, lm.y * scale + dy, lm.z, lm.visibility))
                .collect(),
        )
    }

    #[test]
    fn torso_is_rescaled_to_target() {
        let normalized = normalize(&standing_pose(), 1.0);
        let torso = normalized.torso_length().unwrap();
        assert!((torso - TARGET_TORSO_LENGTH).abs() < 1e-5);
    }

    #[test]
    fn hip_midpoint_lands_on_anchor() {
        let normalized = normalize(&standing_pose(), 16.0 / 9.0);
        let lh = normalized.get(LEFT_HIP).unwrap();
        let rh = normalized.get(RIGHT_HIP).unwrap();
        assert!(((lh.x + rh.x) / 2.0 - ANCHOR_X).abs() < 1e-5);
        assert!(((lh.y + rh.y) / 2.0 - ANCHOR_Y).abs() < 1e-5);
    }

    #[test]
    fn invariant_under_translation_and_uniform_scale() {
        let base = standing_pose();
        let expected = normalize(&base, 1.0);
        for (scale, dx, dy) in [(0.5, 0.1, -0.05), (1.7, -0.3, 0.2), (0.9, 0.0, 0.0)] {
            let moved = normalize(&transform(&base, scale, dx, dy), 1.0);
            for (a, b) in expected.landmarks().iter().zip(moved.landmarks()) {
                assert!((a.x - b.x).abs() < 1e-4, "x drift {} vs {}", a.x, b.x);
                assert!((a.y - b.y).abs() < 1e-4, "y drift {} vs {}", a.y, b.y);
            }
        }
    }

    #[test]
    fn aspect_ratio_reconciles_stretched_sources() {
        // Same figure seen by a 2:1 camera: x coordinates are halved.
        let square = standing_pose();
        let wide = Pose::new(
            square
                .landmarks()
                .iter()
                .map(|lm| Landmark::new(lm.x / 2.0, lm.y, lm.z, lm.visibility))
                .collect(),
        );
        let a = normalize(&square, 1.0);
        let b = normalize(&wide, 2.0);
        for (p, q) in a.landmarks().iter().zip(b.landmarks()) {
            assert!((p.x - q.x).abs() < 1e-4);
            assert!((p.y - q.y).abs() < 1e-4);
        }
    }

    #[test]
    fn degenerate_torso_keeps_unit_scale() {
        let mut points = standing_pose().landmarks().to_vec();
        for idx in [LEFT_SHOULDER, RIGHT_SHOULDER] {
            points[idx].y = points[LEFT_HIP].y;
            points[idx].x = points[idx + 12].x;
        }
        let pose = Pose::new(points);
        let normalized = normalize(&pose, 1.0);
        let knee = normalized.get(25).unwrap();
        // unit scale: knee keeps its offset from the hip midpoint
        assert!((knee.y - (ANCHOR_Y + 0.16)).abs() < 1e-5);
        assert!(normalized.landmarks().iter().all(|lm| lm.x.is_finite()));
    }

    #[test]
    fn short_pose_passes_through() {
        let pose = Pose::new(vec![Landmark::new(0.3, 0.4, 0.1, 0.8); 12]);
        let normalized = normalize(&pose, 1.5);
        assert_eq!(normalized.landmarks(), pose.landmarks());
    }

    #[test]
    fn z_and_visibility_pass_through() {
        let mut points = standing_pose().landmarks().to_vec();
        points[5] = Landmark::new(0.5, 0.2, -0.7, 0.12);
        let normalized = normalize(&Pose::new(points), 1.0);
        assert_eq!(normalized.get(5).unwrap().z, -0.7);
        assert_eq!(normalized.get(5).unwrap().visibility, 0.12);
    }
}
