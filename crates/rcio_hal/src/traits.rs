use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("communication error: {0}")]
    CommError(String),
    #[error("timeout")]
    Timeout,
    #[error("coprocessor not connected")]
    NotConnected,
    #[error("write rejected at {page}:{offset}")]
    Rejected { page: u8, offset: u8 },
}

/// Location of a register in the coprocessor's paged register space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddress {
    pub page: u8,
    pub offset: u8,
}

impl RegisterAddress {
    pub const fn new(page: u8, offset: u8) -> Self {
        Self { page, offset }
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.offset)
    }
}

/// Transport that performs single register writes against the coprocessor.
///
/// Every call either completes or fails on its own; implementations never
/// retry internally.
pub trait RegisterPort: Send {
    /// Write one register word.
    fn write_byte(&mut self, page: u8, offset: u8, value: u16) -> Result<(), IoError>;

    /// Write `values` to consecutive registers starting at `offset` in one transfer.
    fn write_block(&mut self, page: u8, offset: u8, values: &[u16]) -> Result<(), IoError>;
}

impl RegisterPort for Box<dyn RegisterPort> {
    fn write_byte(&mut self, page: u8, offset: u8, value: u16) -> Result<(), IoError> {
        (**self).write_byte(page, offset, value)
    }
    fn write_block(&mut self, page: u8, offset: u8, values: &[u16]) -> Result<(), IoError> {
        (**self).write_block(page, offset, values)
    }
}
