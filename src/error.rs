//! Error taxonomy for build-time planning and runtime backend failures.

use std::fmt;

/// Fatal build-time planning errors.
///
/// These are raised by [`crate::packer::pack`], [`crate::grouper::group`],
/// [`crate::sampler::plan_samples`] and [`crate::plan::Plan::build`]. None of
/// them are ever silently corrected; the caller gets enough context to find
/// the offending input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A value's channel count fell outside `[1, channels_max]`.
    InvalidValue {
        value_index: usize,
        channels: u8,
        channels_max: u8,
    },
    /// A derive source pointed at a missing value or an out-of-range
    /// `step_ago`.
    InvalidDerive {
        pass_index: usize,
        value_index: usize,
        source_index: usize,
        reason: InvalidDeriveReason,
    },
    /// `buffers_max` was a non-positive integer while outputs were
    /// demanded, or `channels_max` was zero.
    CapabilityMismatch { reason: String },
}

/// Why a derive source was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidDeriveReason {
    /// The referenced value index does not exist.
    UnknownValue { referenced: usize, value_count: usize },
    /// `step_ago` was outside `[0, steps - bound - 1]`.
    StepAgoOutOfRange { step_ago: u32, max_step_ago: u32 },
    /// `step_ago` would read a step still held for output.
    ReadsBoundStep { step_ago: u32, bound: u32 },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::InvalidValue {
                value_index,
                channels,
                channels_max,
            } => write!(
                f,
                "value {value_index} has {channels} channels, outside [1, {channels_max}]"
            ),
            PlanError::InvalidDerive {
                pass_index,
                value_index,
                source_index,
                reason,
            } => write!(
                f,
                "pass {pass_index}, value {value_index}, source {source_index}: {reason}"
            ),
            PlanError::CapabilityMismatch { reason } => {
                write!(f, "capability mismatch: {reason}")
            }
        }
    }
}

impl fmt::Display for InvalidDeriveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidDeriveReason::UnknownValue {
                referenced,
                value_count,
            } => write!(
                f,
                "references value {referenced}, but only {value_count} values exist"
            ),
            InvalidDeriveReason::StepAgoOutOfRange {
                step_ago,
                max_step_ago,
            } => write!(
                f,
                "step_ago {step_ago} exceeds the oldest readable step {max_step_ago}"
            ),
            InvalidDeriveReason::ReadsBoundStep { step_ago, bound } => write!(
                f,
                "step_ago {step_ago} would read a step still held for output (bound={bound})"
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// Runtime failures raised by the backend, propagated unchanged.
#[derive(Debug)]
pub enum BackendError {
    /// The backend's shader compiler rejected the generated macros plus
    /// user shader text.
    ShaderCompileFailure(Box<dyn std::error::Error + Send + Sync>),
    /// A `texture`/`framebuffer` factory call failed.
    BackendResourceFailure(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ShaderCompileFailure(e) => write!(f, "shader compile failure: {e}"),
            BackendError::BackendResourceFailure(e) => {
                write!(f, "backend resource failure: {e}")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::ShaderCompileFailure(e) | BackendError::BackendResourceFailure(e) => {
                Some(e.as_ref())
            }
        }
    }
}
