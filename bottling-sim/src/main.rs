//! Wires together the register image, the transaction-log emitter, the line
//! engine (on its own OS thread), and the Modbus/TCP server (on a `tokio`
//! runtime), per `SPEC_FULL.md` §5's runtime model.

mod cli;
mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sim_data::schedule::load_schedule;
use sim_engine::{EngineConfig, LineEngine};
use sim_events::emitter::EnterpriseContext;
use sim_events::EventEmitter;
use sim_modbus::ModbusServer;
use sim_registers::RegisterImage;

use crate::cli::Cli;
use crate::config::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(speed) = cli.speed {
        config.simulator.speed_factor = speed;
    }
    if let Some(port) = cli.port {
        config.modbus.port = port;
    }
    if let Some(level) = cli.loglevel {
        config.logging.level = level.as_str().to_string();
    }

    install_tracing(&config.logging.level, config.logging.console)?;
    tracing::info!(instance_id = %config.simulator.instance_id, "starting bottling line simulator");

    let image = Arc::new(RegisterImage::new());
    // `false` = running; set `true` to request shutdown.
    let shutdown = Arc::new(AtomicBool::new(false));

    let enterprise_ctx = EnterpriseContext {
        enterprise: config.enterprise.name.clone(),
        site: config.enterprise.site.clone(),
        area: config.enterprise.area.clone(),
        line: config.enterprise.line.clone(),
        instance_id: config.simulator.instance_id.clone(),
    };
    let emitter = EventEmitter::new(&config.logging.transactions_file, enterprise_ctx)?;

    let engine_config = EngineConfig {
        tick_hz: config.simulator.tick_hz,
        speed_factor: config.simulator.speed_factor,
        microstop_mean_interval_s: config.production.microstop_mean_interval_s,
        base_reject_probability: config.production.base_reject_probability,
        label_stock_initial_pct: config.production.label_stock_initial_pct,
        label_stock_depletion_per_1000: config.production.label_stock_depletion_per_1000,
        cap_stock_initial_pct: config.production.cap_stock_initial_pct,
    };
    let seed = config.simulator.seed;
    let schedule = load_schedule(config.simulator.schedule_xlsx.as_deref());

    let engine_image = image.clone();
    let engine_shutdown = shutdown.clone();
    let engine_handle = std::thread::spawn(move || {
        let mut engine = LineEngine::new(engine_image, emitter, engine_config, seed, engine_shutdown);
        if let Err(err) = engine.run(&schedule) {
            tracing::error!(error = %err, "engine terminated with a fatal error");
        }
    });

    let signal_shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::info!("shutdown signal received");
        signal_shutdown.store(true, Ordering::Relaxed);
    })?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let server = ModbusServer::bind(&config.modbus.host, config.modbus.port, image).await?;
        let server_running = server.shutdown_handle();
        tokio::spawn(async move {
            while !shutdown.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            server_running.store(false, Ordering::Relaxed);
        });
        server.serve().await;
        Ok::<(), anyhow::Error>(())
    })?;

    engine_handle.join().expect("engine thread panicked");
    tracing::info!("shutdown complete");
    Ok(())
}

fn install_tracing(level: &str, console: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if console {
        subscriber.init();
    } else {
        subscriber.with_writer(std::io::sink).init();
    }
    Ok(())
}
