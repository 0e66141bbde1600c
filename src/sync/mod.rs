//! Periodic reconciliation of the host-side cache against the coprocessor.
//!
//! Each pass does at most one default-rate write and at most one output
//! block write. The two are independent: a failed frequency push is a
//! warning, a failed output write fails the pass.

use crate::config::DriverConfig;
use crate::error::{SyncError, SyncWarning};
use crate::protocol::{DIRECT_PWM_OUTPUTS, SETUP_PWM_DEFAULTRATE};
use crate::state::{PwmState, CHANNEL_COUNT};
use rcio_hal::RegisterPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyOutcome {
    /// Nothing was pending.
    #[default]
    Idle,
    Pushed(u16),
    /// The push failed; `requeued` tells whether the next pass tries again.
    Failed { value: u16, requeued: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub frequency: FrequencyOutcome,
    /// The frame written to the output block, `None` while disarmed.
    pub outputs: Option<[u16; CHANNEL_COUNT]>,
    pub warnings: Vec<SyncWarning>,
}

pub fn synchronize<P>(
    port: &mut P,
    state: &PwmState,
    config: &DriverConfig,
) -> Result<SyncReport, SyncError>
where
    P: RegisterPort + ?Sized,
{
    let snapshot = state.snapshot();
    let mut report = SyncReport::default();

    if let Some(value) = snapshot.frequency {
        let reg = SETUP_PWM_DEFAULTRATE;
        match port.write_byte(reg.page, reg.offset, value) {
            Ok(()) => {
                log::debug!("default rate {reg} <- {value}");
                report.frequency = FrequencyOutcome::Pushed(value);
            }
            Err(source) => {
                log::warn!("Frequency {value} not set: {source}");
                let requeued = config.retry_frequency_push;
                if requeued {
                    state.requeue_frequency();
                }
                report.frequency = FrequencyOutcome::Failed { value, requeued };
                report
                    .warnings
                    .push(SyncWarning::FrequencyNotSet { value, source });
            }
        }
    }

    if let Some(frame) = snapshot.outputs {
        let reg = DIRECT_PWM_OUTPUTS;
        if let Err(source) = port.write_block(reg.page, reg.offset, &frame) {
            log::error!("PWM output write to {reg} failed: {source}");
            return Err(SyncError::Output {
                source,
                warnings: report.warnings,
            });
        }
        log::debug!("direct pwm {reg} <- {frame:?}");
        report.outputs = Some(frame);
    }

    Ok(report)
}
