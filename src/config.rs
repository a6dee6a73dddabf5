use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    compare::{THRESH_GOOD, THRESH_OK},
    error::EngineError,
    scoring::ScoringMode,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: ScoringMode,
    pub comparison: ComparisonSettings,
    pub gesture: GestureSettings,
    pub fusion: FusionSettings,
    pub session: SessionSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    pub thresh_good: f32,
    pub thresh_ok: f32,
    /// Distance charged when the reference shows a joint the live pose lacks.
    pub missing_penalty: f32,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            thresh_good: THRESH_GOOD,
            thresh_ok: THRESH_OK,
            missing_penalty: 2.0 * THRESH_OK,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub cooldown_ms: u64,
    pub restart_dwell_ms: u64,
    /// How far above the higher shoulder both wrists must be for a restart.
    pub raise_margin: f32,
    /// Max frame-to-frame wrist travel that still counts as holding still.
    pub stillness: f32,
    pub wave_window_ms: u64,
    pub wave_reversals: usize,
    pub wave_min_delta: f32,
    pub swipe_max_ms: u64,
    pub swipe_min_delta: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            cooldown_ms: 2_000,
            restart_dwell_ms: 2_000,
            raise_margin: 0.1,
            stillness: 0.03,
            wave_window_ms: 1_200,
            wave_reversals: 3,
            wave_min_delta: 0.015,
            swipe_max_ms: 400,
            swipe_min_delta: 0.15,
        }
    }
}

impl GestureSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn restart_dwell(&self) -> Duration {
        Duration::from_millis(self.restart_dwell_ms)
    }

    pub fn wave_window(&self) -> Duration {
        Duration::from_millis(self.wave_window_ms)
    }

    pub fn swipe_max(&self) -> Duration {
        Duration::from_millis(self.swipe_max_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub smoothing_alpha: f32,
    pub dead_zone: u8,
    pub max_reference_distance_secs: f32,
    pub motion_history: usize,
    /// Anchors older than this are ignored. `None` keeps the last anchor
    /// until a new one arrives.
    pub anchor_max_age_secs: Option<f32>,
}

impl FusionSettings {
    pub fn anchor_max_age(&self) -> Result<Option<Duration>, EngineError> {
        self.anchor_max_age_secs
            .map(|secs| {
                Duration::try_from_secs_f32(secs).map_err(|err| {
                    invalid("fusion.anchor_max_age_secs", format!("{secs}s: {err}"))
                })
            })
            .transpose()
    }
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.15,
            dead_zone: 2,
            max_reference_distance_secs: 3.0,
            motion_history: 15,
            anchor_max_age_secs: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub rewind_threshold_secs: f32,
    pub hit_window_secs: f32,
    pub sample_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rewind_threshold_secs: 0.5,
            hit_window_secs: 0.2,
            sample_interval_ms: 500,
        }
    }
}

impl SessionSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("rejected config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let c = &self.comparison;
        positive("comparison.thresh_good", c.thresh_good)?;
        positive("comparison.thresh_ok", c.thresh_ok)?;
        if c.thresh_good >= c.thresh_ok {
            return Err(invalid(
                "comparison.thresh_good",
                format!("must be below thresh_ok ({})", c.thresh_ok),
            ));
        }
        if !c.missing_penalty.is_finite() || c.missing_penalty < 0.0 {
            return Err(invalid(
                "comparison.missing_penalty",
                "must be a non-negative number".to_string(),
            ));
        }

        let g = &self.gesture;
        positive("gesture.stillness", g.stillness)?;
        positive("gesture.wave_min_delta", g.wave_min_delta)?;
        positive("gesture.swipe_min_delta", g.swipe_min_delta)?;
        if g.wave_reversals == 0 {
            return Err(invalid("gesture.wave_reversals", "must be at least 1".to_string()));
        }
        if g.restart_dwell_ms == 0 {
            return Err(invalid("gesture.restart_dwell_ms", "must be non-zero".to_string()));
        }

        let f = &self.fusion;
        if !(f.smoothing_alpha > 0.0 && f.smoothing_alpha <= 1.0) {
            return Err(invalid(
                "fusion.smoothing_alpha",
                format!("must be in (0, 1], got {}", f.smoothing_alpha),
            ));
        }
        positive("fusion.max_reference_distance_secs", f.max_reference_distance_secs)?;
        if f.motion_history < 3 {
            return Err(invalid(
                "fusion.motion_history",
                "needs at least 3 frames".to_string(),
            ));
        }
        if let Some(age) = f.anchor_max_age_secs {
            positive("fusion.anchor_max_age_secs", age)?;
        }
        f.anchor_max_age()?;

        let s = &self.session;
        positive("session.rewind_threshold_secs", s.rewind_threshold_secs)?;
        positive("session.hit_window_secs", s.hit_window_secs)?;
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("must be a positive number, got {value}")))
    }
}

fn invalid(name: &'static str, reason: String) -> EngineError {
    EngineError::InvalidSetting { name, reason }
}
