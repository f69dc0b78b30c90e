use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use flow_inspector::cli::{Args, Mode};
use flow_inspector::config;
use flow_inspector::inspector::{Inspector, RuleReloader};
use flow_inspector::origin::{LiveOrigin, PacketOrigin, PcapFileOrigin, StopHandle};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Log panics before dying so crashes in worker threads leave a trace.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in flow-inspector: {info}");
        default_hook(info);
    }));

    let default_filter = match args.log_level {
        flow_inspector::cli::LogLevelArg::Debug => "flow_inspector=debug",
        flow_inspector::cli::LogLevelArg::Info => "flow_inspector=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let origin: Box<dyn PacketOrigin> = match args.mode {
        Mode::Live => {
            let interface = args.interface.as_deref().expect("clap enforces --interface");
            Box::new(LiveOrigin::new(interface))
        }
        Mode::Pcap => {
            let file = args.file.as_deref().expect("clap enforces --file");
            Box::new(PcapFileOrigin::new(file))
        }
    };

    let mut inspector = Inspector::new(args.cores, origin);
    inspector.set_log_output(&args.log_output);
    inspector.set_pcap_output(&args.write);
    inspector.set_log_level(args.log_level.into());
    inspector.set_stat_interval(args.stat_speed);

    let rules_path = (!args.rules.is_empty()).then(|| PathBuf::from(&args.rules));
    if let Some(path) = &rules_path {
        inspector
            .load_rules(path)
            .with_context(|| format!("failed to load rules from {}", path.display()))?;
    }

    spawn_signal_control(
        inspector.stop_handle(),
        rules_path
            .as_deref()
            .map(|path| RuleReloader::new(inspector.analyzer(), path)),
    )?;

    println!(
        "FlowInspector started. Send SIGHUP to reload rules from: {}",
        rules_path
            .as_deref()
            .map(Path::display)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<no rules file specified>".to_string())
    );
    println!("Process ID: {}", std::process::id());

    inspector.start().map_err(anyhow::Error::from)?;
    Ok(())
}

/// Register SIGINT/SIGHUP flags and start the control thread that services
/// them. Signal handlers themselves only flip the flags; all real work
/// happens here.
fn spawn_signal_control(
    stop: StopHandle,
    reloader: Option<RuleReloader>,
) -> anyhow::Result<()> {
    let terminate = Arc::new(AtomicBool::new(false));
    let reload = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&terminate))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&terminate))
        .context("failed to register SIGTERM handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&reload))
        .context("failed to register SIGHUP handler")?;

    std::thread::Builder::new()
        .name("signal-control".into())
        .spawn(move || loop {
            std::thread::sleep(Duration::from_millis(config::SIGNAL_POLL_INTERVAL_MS));

            if reload.swap(false, Ordering::AcqRel) {
                match &reloader {
                    Some(reloader) => reloader.reload(),
                    None => tracing::warn!("SIGHUP received but no rules file was specified"),
                }
            }
            if terminate.load(Ordering::Acquire) {
                tracing::info!("termination signal received, stopping");
                stop.stop();
                return;
            }
        })
        .context("failed to spawn signal control thread")?;
    Ok(())
}
