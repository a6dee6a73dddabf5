use thiserror::Error;

/// Problems a host must fix before a session can start.
///
/// Per-frame input never produces one of these; bad frames degrade to
/// neutral values instead.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("reference timeline has no frames")]
    EmptyTimeline,
    #[error("reference timeline is out of order at index {index} ({time}s after {previous}s)")]
    UnorderedTimeline {
        index: usize,
        time: f32,
        previous: f32,
    },
    #[error("reference timeline has a non-finite timestamp at index {index}")]
    NonFiniteTime { index: usize },
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}
