//! Loop Engine — four-track phase-locked audio looper
//!
//! Wires the CLI parser, the `EngineConfig` loader, the JACK backend, and
//! optionally the MIDI handler and terminal status view around a single
//! [`Session`], then dispatches one command and exits (or, with `--watch`,
//! stays resident driving the JACK callback until Ctrl+C).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing::info;

use loop_engine::audio::io::jack::JackAudio;
#[cfg(feature = "midi")]
use loop_engine::midi::handler::MidiHandler;
use loop_engine::error::logger::ErrorLogger;
use loop_engine::session::Session;
use loop_engine::state::config::EngineConfig;
use loop_engine::ui::cli::{Cli, Command};
use loop_engine::DEFAULT_SAMPLE_RATE;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let _logger = ErrorLogger::new(log_level);

    let config = EngineConfig::load(None).unwrap_or_else(|e| {
        tracing::warn!("falling back to default engine config: {e}");
        EngineConfig::default()
    });

    info!("starting loop engine with config: {config:?}");

    let session = Arc::new(Mutex::new(Session::new(DEFAULT_SAMPLE_RATE, cli.outputs.max(1), config)));

    let mut jack = JackAudio::new(session.clone(), &cli.client_name, cli.inputs, cli.outputs)?;
    info!("audio backend ready at {}Hz", jack.sample_rate());

    #[cfg(feature = "midi")]
    let mut midi_handler = {
        let mut handler = MidiHandler::new(&cli.client_name)?;
        if let Err(e) = handler.connect_all(session.clone()) {
            tracing::warn!("no MIDI inputs connected: {e}");
        }
        handler
    };

    let mix_output = match &cli.command {
        Command::StopMixRecord { output } => output.clone(),
        _ => None,
    };

    {
        let mut guard = session.lock();
        let result = guard.dispatch(cli.command.into_session_command());
        for event in &result.events {
            info!("{event:?}");
        }

        #[cfg(feature = "file_io")]
        if let (Some(path), Some(mix)) = (mix_output, result.exported_mix) {
            match loop_engine::audio::io::file::encode_wav(&mix) {
                Ok(bytes) => match std::fs::write(&path, bytes) {
                    Ok(()) => info!("wrote mix-down to {}", path.display()),
                    Err(e) => tracing::warn!("failed to write mix-down to {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("failed to encode mix-down: {e}"),
            }
        }
        #[cfg(not(feature = "file_io"))]
        if mix_output.is_some() {
            tracing::warn!("--output given for stop-mix-record but the file_io feature is disabled");
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        info!("shutdown signal received");
    })?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    #[cfg(feature = "midi")]
    midi_handler.disconnect_all();

    jack.shutdown()?;
    info!("loop engine shutdown complete");

    Ok(())
}
