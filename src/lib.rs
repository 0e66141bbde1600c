//! Host-side control core of the RCIO PWM driver.
//!
//! Channel values, output frequency, and the arm flag are cached on the
//! host and reconciled into coprocessor register writes by a periodic
//! [`RcioPwm::tick`], after a one-time [`RcioPwm::attach`] handshake.

pub mod attribute;
pub mod bringup;
pub mod chip;
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod protocol;
pub mod state;
pub mod sync;

pub use attribute::{Attribute, AttributeGroup, AttributeSurface};
pub use bringup::BringUpReport;
pub use chip::RcioPwmChip;
pub use config::DriverConfig;
pub use driver::RcioPwm;
pub use error::{
    AttachError, AttributeError, ChipError, HostError, InvalidArgument, SyncError, SyncWarning,
};
pub use host::{AttachHost, LocalHost};
pub use state::{ChannelIndex, PwmState, CHANNEL_COUNT};
pub use sync::{FrequencyOutcome, SyncReport};

pub use rcio_hal::{IoError, RegisterPort};
