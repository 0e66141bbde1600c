//! One-time attach handshake with the coprocessor.
//!
//! Order matters: the safety interlock is lifted before arming permissions
//! are granted, and both precede the first frequency push. Any failure in
//! the first four steps aborts the attach; the generic chip binding is
//! optional.

use crate::attribute::pwm_attribute_group;
use crate::chip::RcioPwmChip;
use crate::error::{AttachError, SyncWarning};
use crate::host::AttachHost;
use crate::protocol::{
    ARMING_FLAGS, ARMING_SAFE, DIRECT_PWM_OUTPUTS, FORCE_SAFETY_MAGIC, SETUP_ARMING,
    SETUP_FORCE_SAFETY_OFF, SETUP_PWM_DEFAULTRATE,
};
use crate::state::{PwmState, CHANNEL_COUNT};
use rcio_hal::{IoError, RegisterPort};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BringUpReport {
    pub warnings: Vec<SyncWarning>,
}

pub fn bring_up<P, H>(
    port: &mut P,
    host: &mut H,
    state: &PwmState,
    chip: &RcioPwmChip,
) -> Result<BringUpReport, AttachError>
where
    P: RegisterPort + ?Sized,
    H: AttachHost + ?Sized,
{
    host.publish_attributes(&pwm_attribute_group()).map_err(|e| {
        log::error!("PWM node not created: {e}");
        AttachError::AttributesNotPublished(e)
    })?;

    let reg = SETUP_FORCE_SAFETY_OFF;
    port.write_byte(reg.page, reg.offset, FORCE_SAFETY_MAGIC)
        .map_err(|e| {
            log::error!("SAFETY ON: {e}");
            AttachError::SafetyOn(e)
        })?;

    let reg = SETUP_ARMING;
    port.write_byte(reg.page, reg.offset, ARMING_FLAGS)
        .map_err(|e| {
            log::error!("ARMING OFF: {e}");
            AttachError::ArmingOff(e)
        })?;

    let frequency = state.frequency();
    let reg = SETUP_PWM_DEFAULTRATE;
    port.write_byte(reg.page, reg.offset, frequency)
        .map_err(|e| {
            log::error!("Frequency {frequency} not set: {e}");
            AttachError::FrequencyNotSet(e)
        })?;

    let mut report = BringUpReport::default();
    if let Err(e) = host.register_chip(chip) {
        log::warn!("Generic PWM interface for RCIO not created: {e}");
        report.warnings.push(SyncWarning::ChipNotRegistered(e));
    }

    log::info!("RCIO PWM attached at {frequency} Hz");
    Ok(report)
}

/// Put the outputs into a safe state: zero every channel, then revoke FMU
/// arming so the coprocessor stops driving the last frame.
///
/// Both writes are attempted. The first failure is returned.
pub fn shut_down<P>(port: &mut P) -> Result<(), IoError>
where
    P: RegisterPort + ?Sized,
{
    let reg = DIRECT_PWM_OUTPUTS;
    let outputs = port
        .write_block(reg.page, reg.offset, &[0; CHANNEL_COUNT])
        .inspect_err(|e| log::error!("PWM outputs not zeroed: {e}"));

    let reg = SETUP_ARMING;
    let arming = port
        .write_byte(reg.page, reg.offset, ARMING_SAFE)
        .inspect_err(|e| log::error!("FMU arming not revoked: {e}"));

    outputs.and(arming)?;
    log::info!("RCIO PWM outputs disarmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::host::LocalHost;
    use crate::protocol::PAGE_SETUP;
    use rcio_hal::{IoError, PortWrite, RegisterAddress, SimPort};

    fn run(port: &mut SimPort, host: &mut LocalHost) -> Result<BringUpReport, AttachError> {
        bring_up(port, host, &PwmState::default(), &RcioPwmChip::new())
    }

    #[test]
    fn writes_safety_arming_rate_in_order() {
        let mut port = SimPort::new();
        let mut host = LocalHost::new();
        let report = run(&mut port, &mut host).unwrap();
        assert!(report.warnings.is_empty());

        let expected = [(12u8, 22027u16), (1, 35), (3, 50)].map(|(offset, value)| PortWrite::Byte {
            address: RegisterAddress::new(PAGE_SETUP, offset),
            value,
        });
        let writes: Vec<PortWrite> = port.writes().into_iter().cloned().collect();
        assert_eq!(writes, expected.to_vec());
        assert_eq!(host.published().len(), 10);
        assert!(host.chip().is_some());
    }

    #[test]
    fn unpublished_attributes_abort_before_any_write() {
        let mut port = SimPort::new();
        let mut host = LocalHost::new().refusing_attributes();
        let err = run(&mut port, &mut host).unwrap_err();
        assert!(matches!(err, AttachError::AttributesNotPublished(_)));
        assert!(port.attempts().is_empty());
    }

    #[test]
    fn each_mandatory_write_failure_aborts() {
        for (offset, attempts) in [(12u8, 1usize), (1, 2), (3, 3)] {
            let mut port = SimPort::new();
            port.fail_address(PAGE_SETUP, offset);
            let mut host = LocalHost::new();
            let err = run(&mut port, &mut host).unwrap_err();
            let source = IoError::Rejected {
                page: PAGE_SETUP,
                offset,
            };
            let expected = match offset {
                12 => AttachError::SafetyOn(source),
                1 => AttachError::ArmingOff(source),
                _ => AttachError::FrequencyNotSet(source),
            };
            assert_eq!(err, expected);
            assert_eq!(port.attempts().len(), attempts, "stops at the failed step");
            assert!(host.chip().is_none());
        }
    }

    #[test]
    fn chip_registration_failure_is_only_a_warning() {
        let mut port = SimPort::new();
        let mut host = LocalHost::new().refusing_chip();
        let report = run(&mut port, &mut host).unwrap();
        assert_eq!(
            report.warnings,
            vec![SyncWarning::ChipNotRegistered(HostError::Refused(
                "pwm chip".into()
            ))]
        );
        assert_eq!(port.writes().len(), 3);
    }

    #[test]
    fn pushes_current_frequency() {
        let mut port = SimPort::new();
        let state = PwmState::new(400);
        bring_up(&mut port, &mut LocalHost::new(), &state, &RcioPwmChip::new()).unwrap();
        assert_eq!(port.register(PAGE_SETUP, 3), Some(400));
    }

    #[test]
    fn shut_down_zeroes_outputs_and_revokes_arming() {
        let mut port = SimPort::new();
        run(&mut port, &mut LocalHost::new()).unwrap();
        port.write_block(54, 0, &[1500; CHANNEL_COUNT]).unwrap();

        shut_down(&mut port).unwrap();
        for offset in 0..CHANNEL_COUNT as u8 {
            assert_eq!(port.register(54, offset), Some(0));
        }
        assert_eq!(port.register(PAGE_SETUP, 1), Some(1));
    }

    #[test]
    fn shut_down_tries_arming_after_failed_zeroing() {
        let mut port = SimPort::new();
        port.fail_address(54, 0);
        let err = shut_down(&mut port).unwrap_err();
        assert_eq!(err, IoError::Rejected { page: 54, offset: 0 });
        assert_eq!(port.attempts().len(), 2);
        assert_eq!(port.register(PAGE_SETUP, 1), Some(ARMING_SAFE));
    }
}
