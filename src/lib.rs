pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod normalize;
pub mod replay;
pub mod scoring;
pub mod session;
pub mod skeleton;
pub mod timeline;
pub mod types;

pub use config::EngineConfig;
pub use engine::{CoachSession, PlaybackState, TickInput, TickOutput};
pub use error::EngineError;
pub use scoring::ScoringMode;
pub use timeline::{ReferenceTimeline, TimelineEntry};
pub use types::{ComparisonResult, GestureAction, GestureOutput, Landmark, Pose};
