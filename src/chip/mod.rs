//! Generic pulse-output binding for the RCIO channels.
//!
//! Consumers of a generic PWM API may bind to this chip, but output is
//! driven through the direct register block, so every operation is
//! accepted without touching the coprocessor.

use crate::error::ChipError;
use crate::state::CHANNEL_COUNT;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RcioPwmChip;

impl RcioPwmChip {
    pub const fn new() -> Self {
        Self
    }

    pub const fn npwm(&self) -> usize {
        CHANNEL_COUNT
    }

    pub const fn can_sleep(&self) -> bool {
        false
    }

    fn check(&self, channel: usize) -> Result<(), ChipError> {
        if channel < self.npwm() {
            Ok(())
        } else {
            Err(ChipError::InvalidChannel(channel))
        }
    }

    pub fn request(&self, channel: usize) -> Result<(), ChipError> {
        self.check(channel)
    }

    pub fn free(&self, channel: usize) -> Result<(), ChipError> {
        self.check(channel)
    }

    pub fn enable(&self, channel: usize) -> Result<(), ChipError> {
        self.check(channel)
    }

    pub fn disable(&self, channel: usize) -> Result<(), ChipError> {
        self.check(channel)
    }

    pub fn configure(&self, channel: usize, duty_ns: u32, period_ns: u32) -> Result<(), ChipError> {
        log::trace!("pwm{channel}: ignoring config duty={duty_ns}ns period={period_ns}ns");
        self.check(channel)
    }
}
