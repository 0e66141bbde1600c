use rcio_orchestrator::{start, OrchestratorConfig};
use rcio_pwm::LocalHost;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn usage() -> ! {
    eprintln!(
        "Usage: rcio_pwm <config.toml> [name=value ...]\n\
         \n\
         Examples:\n\
           cargo run -p rcio_orchestrator --bin rcio_pwm -- config/rcio_sim.toml frequency=400 armed=1 ch0=1500\n\
           cargo run -p rcio_orchestrator --bin rcio_pwm -- config/rcio_modbus_tcp.toml armed=1 ch7=1100\n\
         \n\
         Notes:\n\
         - Attributes: ch0..ch7 (write-only), frequency (0..=1000), armed (>0 arms).\n\
         - runtime.max_cycles=0 runs until Ctrl-C or until the output link is lost.\n\
         - On exit the outputs are zeroed and FMU arming is revoked."
    );
    std::process::exit(2)
}

/// Set `stop` on Ctrl-C. The loop itself stays synchronous.
fn watch_ctrl_c(stop: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                log::warn!("Ctrl-C handler not installed: {e}");
                return;
            }
        };
        rt.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("Ctrl-C received, stopping");
                    stop.store(true, Ordering::Relaxed);
                }
                Err(e) => log::warn!("Ctrl-C handler failed: {e}"),
            }
        });
    });
}

fn main() {
    rcio_runtime::init_logging();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| usage());
    let assignments: Vec<(String, String)> = args
        .map(|arg| match arg.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => {
                eprintln!("Expected name=value, got: {arg}");
                usage()
            }
        })
        .collect();

    let config = OrchestratorConfig::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("failed to load config: {e}");
        std::process::exit(1)
    });

    let mut host = LocalHost::new();
    let mut sync = start(&config, &mut host).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1)
    });

    let surface = sync.driver.surface();
    for (name, value) in &assignments {
        if let Err(e) = surface.store(name, value) {
            eprintln!("{name}={value}: {e}");
            std::process::exit(1);
        }
    }

    watch_ctrl_c(sync.stop_handle());
    let result = sync.run_realtime();

    if let Err(e) = sync.driver.safe_stop() {
        eprintln!("fail-safe incomplete: {e}");
    }

    log::info!(
        "Stopped after {} cycles ({} failed)",
        sync.cycle_count,
        sync.total_failures
    );
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
