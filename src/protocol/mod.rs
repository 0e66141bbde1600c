//! Coprocessor register map used by the PWM driver.

use rcio_hal::RegisterAddress;

pub const PAGE_SETUP: u8 = 50;
pub const PAGE_DIRECT_PWM: u8 = 54;

pub const SETUP_ARMING: RegisterAddress = RegisterAddress::new(PAGE_SETUP, 1);
pub const SETUP_PWM_DEFAULTRATE: RegisterAddress = RegisterAddress::new(PAGE_SETUP, 3);
pub const SETUP_FORCE_SAFETY_OFF: RegisterAddress = RegisterAddress::new(PAGE_SETUP, 12);

/// First register of the direct PWM output block.
pub const DIRECT_PWM_OUTPUTS: RegisterAddress = RegisterAddress::new(PAGE_DIRECT_PWM, 0);

pub const FORCE_SAFETY_MAGIC: u16 = 22027;

pub const ARMING_IO_ARM_OK: u16 = 1 << 0;
pub const ARMING_FMU_ARMED: u16 = 1 << 1;
pub const ARMING_ALWAYS_PWM_ENABLE: u16 = 1 << 5;

/// Arming permissions granted during bring-up.
pub const ARMING_FLAGS: u16 = ARMING_IO_ARM_OK | ARMING_FMU_ARMED | ARMING_ALWAYS_PWM_ENABLE;

/// Arming word written on shutdown: FMU arming and forced PWM are revoked.
pub const ARMING_SAFE: u16 = ARMING_IO_ARM_OK;
