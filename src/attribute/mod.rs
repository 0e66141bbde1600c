//! Text attribute surface over the PWM state.
//!
//! Attribute names are `ch0`..`ch7` (write-only), `frequency` and `armed`.
//! Values are decimal integers; a value that fails to parse leaves the
//! state untouched.

use crate::error::AttributeError;
use crate::state::{ChannelIndex, PwmState};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const GROUP_NAME: &str = "pwm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Channel(ChannelIndex),
    Frequency,
    Armed,
}

impl Attribute {
    pub fn all() -> impl Iterator<Item = Attribute> {
        ChannelIndex::all()
            .map(Attribute::Channel)
            .chain([Attribute::Frequency, Attribute::Armed])
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self, Attribute::Channel(_))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Channel(ch) => write!(f, "ch{}", ch.get()),
            Attribute::Frequency => f.write_str("frequency"),
            Attribute::Armed => f.write_str("armed"),
        }
    }
}

impl FromStr for Attribute {
    type Err = AttributeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "frequency" => Ok(Attribute::Frequency),
            "armed" => Ok(Attribute::Armed),
            _ => name
                .strip_prefix("ch")
                .filter(|digit| digit.len() == 1)
                .and_then(|digit| digit.parse::<usize>().ok())
                .and_then(ChannelIndex::new)
                .map(Attribute::Channel)
                .ok_or_else(|| AttributeError::UnknownAttribute(name.to_string())),
        }
    }
}

/// Named set of attributes published at attach time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    pub name: &'static str,
    pub attributes: Vec<Attribute>,
}

pub fn pwm_attribute_group() -> AttributeGroup {
    AttributeGroup {
        name: GROUP_NAME,
        attributes: Attribute::all().collect(),
    }
}

/// Reader/writer handle over shared [`PwmState`].
#[derive(Clone)]
pub struct AttributeSurface {
    state: Arc<PwmState>,
}

impl AttributeSurface {
    pub fn new(state: Arc<PwmState>) -> Self {
        Self { state }
    }

    pub fn store(&self, name: &str, input: &str) -> Result<(), AttributeError> {
        self.store_attribute(name.parse()?, input)
    }

    pub fn store_attribute(&self, attr: Attribute, input: &str) -> Result<(), AttributeError> {
        match attr {
            Attribute::Channel(ch) => {
                let value = parse::<u16>(attr, input)?;
                self.state.set_channel(ch, value);
            }
            Attribute::Frequency => {
                let value = parse::<i32>(attr, input)?;
                self.state.set_frequency(value)?;
            }
            Attribute::Armed => {
                let value = parse::<i32>(attr, input)?;
                self.state.set_armed(value);
            }
        }
        log::debug!("{GROUP_NAME}/{attr} <- {}", input.trim());
        Ok(())
    }

    pub fn show(&self, name: &str) -> Result<String, AttributeError> {
        self.show_attribute(name.parse()?)
    }

    pub fn show_attribute(&self, attr: Attribute) -> Result<String, AttributeError> {
        match attr {
            Attribute::Channel(_) => Err(AttributeError::WriteOnly(attr.to_string())),
            Attribute::Frequency => Ok(format!("{}\n", self.state.frequency())),
            Attribute::Armed => Ok(format!("{}\n", u8::from(self.state.armed()))),
        }
    }
}

fn parse<T>(attr: Attribute, input: &str) -> Result<T, AttributeError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    input
        .trim()
        .parse::<T>()
        .map_err(|source| AttributeError::Parse {
            name: attr.to_string(),
            input: input.to_string(),
            source,
        })
}
