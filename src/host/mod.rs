//! Registration layer the driver publishes itself into at attach time.

use crate::attribute::AttributeGroup;
use crate::chip::RcioPwmChip;
use crate::error::HostError;

pub trait AttachHost {
    fn publish_attributes(&mut self, group: &AttributeGroup) -> Result<(), HostError>;
    fn register_chip(&mut self, chip: &RcioPwmChip) -> Result<(), HostError>;
}

/// In-process host that records registrations.
#[derive(Debug, Default)]
pub struct LocalHost {
    published: Vec<String>,
    chip: Option<RcioPwmChip>,
    refuse_attributes: bool,
    refuse_chip: bool,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing_attributes(mut self) -> Self {
        self.refuse_attributes = true;
        self
    }

    pub fn refusing_chip(mut self) -> Self {
        self.refuse_chip = true;
        self
    }

    /// Attribute names published so far, as `group/name`.
    pub fn published(&self) -> &[String] {
        &self.published
    }

    pub fn chip(&self) -> Option<&RcioPwmChip> {
        self.chip.as_ref()
    }
}

impl AttachHost for LocalHost {
    fn publish_attributes(&mut self, group: &AttributeGroup) -> Result<(), HostError> {
        if self.refuse_attributes {
            return Err(HostError::Refused(format!("attribute group {}", group.name)));
        }
        self.published.retain(|p| !p.starts_with(&format!("{}/", group.name)));
        self.published.extend(
            group
                .attributes
                .iter()
                .map(|attr| format!("{}/{}", group.name, attr)),
        );
        Ok(())
    }

    fn register_chip(&mut self, chip: &RcioPwmChip) -> Result<(), HostError> {
        if self.refuse_chip {
            return Err(HostError::Refused("pwm chip".into()));
        }
        self.chip = Some(*chip);
        Ok(())
    }
}
