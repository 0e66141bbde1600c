use crate::attribute::AttributeSurface;
use crate::bringup::{bring_up, shut_down, BringUpReport};
use crate::chip::RcioPwmChip;
use crate::config::DriverConfig;
use crate::error::{AttachError, SyncError};
use crate::host::AttachHost;
use crate::state::PwmState;
use crate::sync::{synchronize, SyncReport};
use rcio_hal::{IoError, RegisterPort};
use std::sync::Arc;

/// PWM driver bound to one coprocessor through a register port.
///
/// `attach` must succeed before `tick` transmits anything. State is shared
/// with any number of [`AttributeSurface`]s handed out by [`RcioPwm::surface`].
pub struct RcioPwm<P: RegisterPort> {
    port: P,
    state: Arc<PwmState>,
    config: DriverConfig,
    chip: RcioPwmChip,
    attached: bool,
}

impl<P: RegisterPort> RcioPwm<P> {
    pub fn new(port: P, config: DriverConfig) -> Self {
        Self {
            port,
            state: Arc::new(PwmState::new(config.default_frequency)),
            config,
            chip: RcioPwmChip::new(),
            attached: false,
        }
    }

    /// Reset state to attach-time defaults and run the bring-up handshake.
    pub fn attach(&mut self, host: &mut dyn AttachHost) -> Result<BringUpReport, AttachError> {
        self.attached = false;
        self.state.reset();
        let report = bring_up(&mut self.port, host, &self.state, &self.chip)?;
        self.attached = true;
        Ok(report)
    }

    /// One synchronization pass. The caller owns the cadence.
    pub fn tick(&mut self) -> Result<SyncReport, SyncError> {
        if !self.attached {
            return Err(SyncError::NotAttached);
        }
        synchronize(&mut self.port, &self.state, &self.config)
    }

    /// Disarm, zero the outputs on the coprocessor and detach. A later
    /// `tick` is refused until the driver is attached again.
    ///
    /// Does nothing on a driver that was never attached.
    pub fn safe_stop(&mut self) -> Result<(), IoError> {
        if !self.attached {
            return Ok(());
        }
        self.attached = false;
        self.state.set_armed(0);
        shut_down(&mut self.port)
    }

    pub fn surface(&self) -> AttributeSurface {
        AttributeSurface::new(Arc::clone(&self.state))
    }

    pub fn state(&self) -> &Arc<PwmState> {
        &self.state
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn chip(&self) -> &RcioPwmChip {
        &self.chip
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
