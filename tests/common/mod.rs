#![allow(dead_code)]

use std::time::{Duration, Instant};

use pose_coach::{
    Landmark, Pose,
    types::{LEFT_WRIST, NUM_LANDMARKS, RIGHT_WRIST},
};

/// Upright figure facing the camera, arms relaxed at the sides.
pub fn standing_pose() -> Pose {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.0, 0.95); NUM_LANDMARKS];
    let joints: [(usize, f32, f32); 15] = [
        (0, 0.50, 0.15),
        (11, 0.56, 0.30),
        (12, 0.44, 0.30),
        (13, 0.60, 0.42),
        (14, 0.40, 0.42),
        (15, 0.61, 0.54),
        (16, 0.39, 0.54),
        (19, 0.62, 0.57),
        (20, 0.38, 0.57),
        (23, 0.54, 0.58),
        (24, 0.46, 0.58),
        (25, 0.55, 0.74),
        (26, 0.45, 0.74),
        (27, 0.55, 0.90),
        (28, 0.45, 0.90),
    ];
    for (idx, x, y) in joints {
        points[idx].x = x;
        points[idx].y = y;
    }
    Pose::new(points)
}

pub fn with_visibility(pose: &Pose, indices: &[usize], visibility: f32) -> Pose {
    let mut points = pose.landmarks().to_vec();
    for &idx in indices {
        points[idx].visibility = visibility;
    }
    Pose::new(points)
}

pub fn hands_up() -> Pose {
    let mut points = standing_pose().landmarks().to_vec();
    points[LEFT_WRIST].y = 0.10;
    points[RIGHT_WRIST].y = 0.10;
    Pose::new(points)
}

pub fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}
