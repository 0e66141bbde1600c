use rcio_hal::RegisterPort;
use rcio_pwm::{RcioPwm, SyncError, SyncReport};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// `[runtime]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_cycle_time")]
    pub cycle_time_ms: u64,
    /// Zero runs forever.
    #[serde(default)]
    pub max_cycles: u64,
    /// Zero never gives up.
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
}

fn default_cycle_time() -> u64 {
    20
}

fn default_max_failures() -> u32 {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: default_cycle_time(),
            max_cycles: 0,
            max_consecutive_failures: default_max_failures(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("output lost after {failures} consecutive failures: {last}")]
    OutputLost { failures: u32, last: SyncError },
    #[error("driver not attached")]
    NotAttached,
}

pub struct SyncLoop<P: RegisterPort> {
    pub driver: RcioPwm<P>,
    pub cycle_time: Duration,
    pub cycle_count: u64,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    config: RuntimeConfig,
    stop: Arc<AtomicBool>,
}

impl<P: RegisterPort> SyncLoop<P> {
    pub fn new(driver: RcioPwm<P>, config: RuntimeConfig) -> Self {
        Self {
            driver,
            cycle_time: Duration::from_millis(config.cycle_time_ms),
            cycle_count: 0,
            consecutive_failures: 0,
            total_failures: 0,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends `run_realtime` at the next cycle boundary once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run one pass and account for its outcome. A tolerated output
    /// failure yields `Ok(None)`.
    pub fn step(&mut self) -> Result<Option<SyncReport>, RuntimeError> {
        let result = self.driver.tick();
        if matches!(result, Err(SyncError::NotAttached)) {
            return Err(RuntimeError::NotAttached);
        }
        self.cycle_count += 1;
        match result {
            Ok(report) => {
                if self.consecutive_failures > 0 {
                    log::info!(
                        "PWM output restored after {} failed cycles",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                Ok(Some(report))
            }
            Err(err) => {
                self.consecutive_failures += 1;
                self.total_failures += 1;
                let limit = self.config.max_consecutive_failures;
                if limit != 0 && self.consecutive_failures >= limit {
                    log::error!("Giving up after {limit} consecutive output failures");
                    return Err(RuntimeError::OutputLost {
                        failures: self.consecutive_failures,
                        last: err,
                    });
                }
                log::warn!("Cycle {} failed: {err}", self.cycle_count);
                Ok(None)
            }
        }
    }

    pub fn run_cycles(&mut self, count: u64) -> Result<(), RuntimeError> {
        for _ in 0..count {
            self.step()?;
        }
        Ok(())
    }

    pub fn run_realtime(&mut self) -> Result<(), RuntimeError> {
        let max_cycles = self.config.max_cycles;
        while !self.stop.load(Ordering::Relaxed)
            && (max_cycles == 0 || self.cycle_count < max_cycles)
        {
            let t0 = Instant::now();
            self.step()?;
            let elapsed = t0.elapsed();
            if elapsed < self.cycle_time {
                std::thread::sleep(self.cycle_time - elapsed);
            }
        }
        Ok(())
    }
}
