use crate::types::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, LimbName, RIGHT_ANKLE,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};

#[derive(Clone, Copy, Debug)]
pub struct LimbGroup {
    pub name: LimbName,
    pub indices: &'static [usize],
}

/// Order matters: worst-limb ties resolve to the first entry.
pub const LIMB_GROUPS: [LimbGroup; 5] = [
    LimbGroup {
        name: LimbName::RightArm,
        indices: &[RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST],
    },
    LimbGroup {
        name: LimbName::LeftArm,
        indices: &[LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST],
    },
    LimbGroup {
        name: LimbName::RightLeg,
        indices: &[RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE],
    },
    LimbGroup {
        name: LimbName::LeftLeg,
        indices: &[LEFT_HIP, LEFT_KNEE, LEFT_ANKLE],
    },
    LimbGroup {
        name: LimbName::Torso,
        indices: &[LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_HIP, RIGHT_HIP],
    },
];

pub const CONNECTIONS: &[(usize, usize)] = &[
    (LEFT_SHOULDER, RIGHT_SHOULDER),
    (LEFT_SHOULDER, LEFT_ELBOW),
    (LEFT_ELBOW, LEFT_WRIST),
    (RIGHT_SHOULDER, RIGHT_ELBOW),
    (RIGHT_ELBOW, RIGHT_WRIST),
    (LEFT_SHOULDER, LEFT_HIP),
    (RIGHT_SHOULDER, RIGHT_HIP),
    (LEFT_HIP, RIGHT_HIP),
    (LEFT_HIP, LEFT_KNEE),
    (LEFT_KNEE, LEFT_ANKLE),
    (RIGHT_HIP, RIGHT_KNEE),
    (RIGHT_KNEE, RIGHT_ANKLE),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Good,
    Ok,
    Bad,
}

impl MatchTier {
    /// RGBA colour a renderer should use for a connection in this tier.
    pub fn color(&self) -> [u8; 4] {
        match self {
            MatchTier::Good => [16u8, 185u8, 129u8, 255u8],
            MatchTier::Ok => [250u8, 204u8, 21u8, 255u8],
            MatchTier::Bad => [248u8, 113u8, 113u8, 255u8],
        }
    }
}

pub fn limb_group(name: LimbName) -> &'static LimbGroup {
    &LIMB_GROUPS[name.index()]
}
