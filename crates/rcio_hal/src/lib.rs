//! Register port abstraction for the RCIO coprocessor.
//!
//! The coprocessor exposes a paged register space: every write targets a
//! `(page, offset)` pair and carries one or more 16-bit words.

pub mod sim;
pub mod traits;

pub use sim::{PortWrite, SimPort};
pub use traits::{IoError, RegisterAddress, RegisterPort};
