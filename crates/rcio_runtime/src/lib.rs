pub mod engine;

pub use engine::{RuntimeConfig, RuntimeError, SyncLoop};

/// Install the process logger. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
