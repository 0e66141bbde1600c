//! In-memory register port.
//!
//! Keeps a register image and an ordered log of every attempted write, and
//! can be told to fail writes so callers can exercise their error paths.

use crate::traits::{IoError, RegisterAddress, RegisterPort};
use std::collections::{HashMap, HashSet};

/// One write as seen by the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortWrite {
    Byte { address: RegisterAddress, value: u16 },
    Block { address: RegisterAddress, values: Vec<u16> },
}

impl PortWrite {
    pub fn address(&self) -> RegisterAddress {
        match self {
            PortWrite::Byte { address, .. } | PortWrite::Block { address, .. } => *address,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, PortWrite::Block { .. })
    }
}

pub struct SimPort {
    registers: HashMap<RegisterAddress, u16>,
    log: Vec<(PortWrite, Result<(), IoError>)>,
    failing: HashSet<RegisterAddress>,
    fail_next: usize,
}

impl SimPort {
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            log: Vec::new(),
            failing: HashSet::new(),
            fail_next: 0,
        }
    }

    /// Last value successfully written to `(page, offset)`.
    pub fn register(&self, page: u8, offset: u8) -> Option<u16> {
        self.registers.get(&RegisterAddress::new(page, offset)).copied()
    }

    /// Every attempted write with its outcome, oldest first.
    pub fn attempts(&self) -> &[(PortWrite, Result<(), IoError>)] {
        &self.log
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> Vec<&PortWrite> {
        self.log
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(write, _)| write)
            .collect()
    }

    pub fn byte_writes(&self) -> usize {
        self.log.iter().filter(|(w, _)| !w.is_block()).count()
    }

    pub fn block_writes(&self) -> usize {
        self.log.iter().filter(|(w, _)| w.is_block()).count()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Make every write touching `(page, offset)` fail until healed.
    pub fn fail_address(&mut self, page: u8, offset: u8) {
        self.failing.insert(RegisterAddress::new(page, offset));
    }

    pub fn heal_address(&mut self, page: u8, offset: u8) {
        self.failing.remove(&RegisterAddress::new(page, offset));
    }

    /// Make the next `count` writes fail regardless of address.
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next = count;
    }

    fn check(&mut self, page: u8, offset: u8, len: usize) -> Result<(), IoError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(IoError::CommError("injected failure".into()));
        }
        let hit = (0..len).any(|i| {
            let off = offset as usize + i;
            off <= u8::MAX as usize && self.failing.contains(&RegisterAddress::new(page, off as u8))
        });
        if hit {
            return Err(IoError::Rejected { page, offset });
        }
        Ok(())
    }
}

impl Default for SimPort {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPort for SimPort {
    fn write_byte(&mut self, page: u8, offset: u8, value: u16) -> Result<(), IoError> {
        let address = RegisterAddress::new(page, offset);
        let outcome = self.check(page, offset, 1);
        if outcome.is_ok() {
            self.registers.insert(address, value);
        }
        self.log.push((PortWrite::Byte { address, value }, outcome.clone()));
        outcome
    }

    fn write_block(&mut self, page: u8, offset: u8, values: &[u16]) -> Result<(), IoError> {
        let address = RegisterAddress::new(page, offset);
        let outcome = self.check(page, offset, values.len());
        if outcome.is_ok() {
            for (i, &value) in values.iter().enumerate() {
                let off = offset as usize + i;
                if off > u8::MAX as usize {
                    break;
                }
                self.registers.insert(RegisterAddress::new(page, off as u8), value);
            }
        }
        let values = values.to_vec();
        self.log.push((PortWrite::Block { address, values }, outcome.clone()));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_write_updates_image_and_log() {
        let mut port = SimPort::new();
        port.write_byte(50, 3, 400).unwrap();
        assert_eq!(port.register(50, 3), Some(400));
        assert_eq!(port.byte_writes(), 1);
        assert_eq!(port.block_writes(), 0);
    }

    #[test]
    fn block_write_fills_consecutive_registers() {
        let mut port = SimPort::new();
        port.write_block(54, 0, &[1, 2, 3]).unwrap();
        assert_eq!(port.register(54, 0), Some(1));
        assert_eq!(port.register(54, 2), Some(3));
        assert_eq!(port.register(54, 3), None);
    }

    #[test]
    fn failing_address_rejects_until_healed() {
        let mut port = SimPort::new();
        port.fail_address(50, 12);
        assert_eq!(
            port.write_byte(50, 12, 22027),
            Err(IoError::Rejected { page: 50, offset: 12 })
        );
        assert_eq!(port.register(50, 12), None);
        assert!(port.writes().is_empty());
        assert_eq!(port.attempts().len(), 1);

        port.heal_address(50, 12);
        port.write_byte(50, 12, 22027).unwrap();
        assert_eq!(port.register(50, 12), Some(22027));
    }

    #[test]
    fn failing_address_inside_block_rejects_whole_block() {
        let mut port = SimPort::new();
        port.fail_address(54, 5);
        assert!(port.write_block(54, 0, &[0; 8]).is_err());
        assert_eq!(port.register(54, 0), None);
    }

    #[test]
    fn fail_next_is_one_shot() {
        let mut port = SimPort::new();
        port.fail_next(1);
        assert!(port.write_byte(1, 1, 1).is_err());
        assert!(port.write_byte(1, 1, 1).is_ok());
    }
}
