use rcio_hal::IoError;
use std::num::ParseIntError;
use thiserror::Error;

/// A value rejected at the mutation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("frequency {0} outside 0..=1000")]
    FrequencyOutOfRange(i32),
    #[error("channel index {0} outside 0..8")]
    ChannelOutOfRange(usize),
}

/// Failure reported by the registration layer that hosts the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("registration refused: {0}")]
    Refused(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChipError {
    #[error("no such pwm channel: {0}")]
    InvalidChannel(usize),
}

/// Fatal bring-up failure. The driver refuses to attach.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("pwm attributes not published: {0}")]
    AttributesNotPublished(#[source] HostError),
    #[error("not connected: safety still on ({0})")]
    SafetyOn(#[source] IoError),
    #[error("not connected: arming permissions not set ({0})")]
    ArmingOff(#[source] IoError),
    #[error("not connected: default frequency not set ({0})")]
    FrequencyNotSet(#[source] IoError),
}

/// Failure of a periodic synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The output block write failed. `warnings` holds whatever else the
    /// pass reported before it, such as a failed frequency push.
    #[error("output write failed: {source}")]
    Output {
        source: IoError,
        warnings: Vec<SyncWarning>,
    },
    #[error("driver not attached")]
    NotAttached,
}

/// Non-fatal condition, logged and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncWarning {
    #[error("frequency {value} not set: {source}")]
    FrequencyNotSet { value: u16, source: IoError },
    #[error("generic pwm interface not created: {0}")]
    ChipNotRegistered(#[source] HostError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("attribute {0} is write-only")]
    WriteOnly(String),
    #[error("{name}: cannot parse {input:?}: {source}")]
    Parse {
        name: String,
        input: String,
        source: ParseIntError,
    },
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
}
