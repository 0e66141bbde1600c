//! Modbus RTU/TCP register port for the RCIO coprocessor.
//!
//! Bench and HIL setups bridge the coprocessor's paged register space onto
//! Modbus holding registers: register `(page, offset)` lives at holding
//! register address `page << 8 | offset`. Single-register writes use
//! FC 0x06, blocks use FC 0x10.

use rcio_hal::{IoError, RegisterPort};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_modbus::client::{rtu, tcp, Context, Writer};
use tokio_modbus::slave::Slave;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

const MAX_CONNECT_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;
const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Holding register address of coprocessor register `(page, offset)`.
pub const fn holding_address(page: u8, offset: u8) -> u16 {
    (page as u16) << 8 | offset as u16
}

pub struct ModbusPort {
    ctx: Context,
    rt: Runtime,
    timeout: Duration,
}

impl ModbusPort {
    fn from_ctx(ctx: Context, rt: Runtime) -> Self {
        Self {
            ctx,
            rt,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Per-request timeout; a request that exceeds it fails with [`IoError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect to a Modbus TCP bridge with retry logic.
    pub fn connect(addr: SocketAddr, slave_id: u8) -> Result<Self, IoError> {
        let rt = Runtime::new().map_err(|e| IoError::CommError(e.to_string()))?;

        log::info!("Connecting to RCIO Modbus TCP bridge at {addr} (unit {slave_id})");

        let mut last_err = String::new();
        for attempt in 1..=MAX_CONNECT_RETRIES {
            match rt.block_on(tcp::connect_slave(addr, Slave(slave_id))) {
                Ok(ctx) => {
                    if attempt > 1 {
                        log::info!("Connected on attempt {attempt}");
                    }
                    return Ok(Self::from_ctx(ctx, rt));
                }
                Err(e) => {
                    log::warn!("Connect attempt {attempt}/{MAX_CONNECT_RETRIES} failed: {e}");
                    last_err = e.to_string();
                    if attempt < MAX_CONNECT_RETRIES {
                        std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                    }
                }
            }
        }
        Err(IoError::CommError(format!(
            "Modbus TCP connect failed after {MAX_CONNECT_RETRIES} attempts: {last_err}"
        )))
    }

    /// Connect to a Modbus RTU bridge over a serial port.
    pub fn connect_rtu(serial_port: &str, baud_rate: u32, slave_id: u8) -> Result<Self, IoError> {
        let rt = Runtime::new().map_err(|e| IoError::CommError(e.to_string()))?;

        log::info!(
            "Connecting to RCIO Modbus RTU bridge at {serial_port} (baud {baud_rate}, unit {slave_id})"
        );

        let serial_port = serial_port.to_string();
        let ctx = rt.block_on(async move {
            let builder = tokio_serial::new(serial_port, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None);

            let port = builder
                .open_native_async()
                .map_err(|e| IoError::CommError(format!("open serial port: {e}")))?;

            Ok::<Context, IoError>(rtu::attach_slave(port, Slave(slave_id)))
        })?;

        Ok(Self::from_ctx(ctx, rt))
    }
}

impl RegisterPort for ModbusPort {
    fn write_byte(&mut self, page: u8, offset: u8, value: u16) -> Result<(), IoError> {
        let addr = holding_address(page, offset);
        let timeout = self.timeout;
        let request = self.ctx.write_single_register(addr, value);
        self.rt
            .block_on(async { tokio::time::timeout(timeout, request).await })
            .map_err(|_| IoError::Timeout)?
            .map_err(|e| IoError::CommError(format!("write_single_register: {e}")))?
            .map_err(|e| {
                log::debug!("Modbus exception at {page}:{offset}: {e:?}");
                IoError::Rejected { page, offset }
            })?;
        log::debug!("HR {addr:#06x} <- {value}");
        Ok(())
    }

    fn write_block(&mut self, page: u8, offset: u8, values: &[u16]) -> Result<(), IoError> {
        let addr = holding_address(page, offset);
        let timeout = self.timeout;
        let request = self.ctx.write_multiple_registers(addr, values);
        self.rt
            .block_on(async { tokio::time::timeout(timeout, request).await })
            .map_err(|_| IoError::Timeout)?
            .map_err(|e| IoError::CommError(format!("write_multiple_registers: {e}")))?
            .map_err(|e| {
                log::debug!("Modbus exception at {page}:{offset}: {e:?}");
                IoError::Rejected { page, offset }
            })?;
        log::debug!("HR {addr:#06x} <- {} registers", values.len());
        Ok(())
    }
}
