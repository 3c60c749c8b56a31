//! JACK audio backend
//!
//! Wires a [`Session`] to a JACK client: the realtime callback pushes
//! fresh mic input into whatever capture is in flight, drives
//! [`Session::tick`], and writes the mixed-down master bus to the
//! output ports. The Session itself never touches JACK types; this
//! module is the only place that does, so the rest of the crate builds
//! without the `jack_backend` feature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use jack::{AsyncClient, AudioIn, AudioOut, Client, ClientOptions, Control, Port};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::error::LoopEngineError;
use crate::session::Session;

/// A running JACK client bound to a [`Session`].
pub struct JackAudio {
    client: AsyncClient<(), ProcessHandler>,
    sample_rate: u32,
    active: Arc<AtomicBool>,
}

struct ProcessHandler {
    session: Arc<Mutex<Session>>,
    active: Arc<AtomicBool>,
    input_ports: Vec<Port<AudioIn>>,
    output_ports: Vec<Port<AudioOut>>,
}

impl JackAudio {
    /// Register `input_channels` input ports and `output_channels`
    /// output ports under `client_name`, and activate the client
    /// against `session`.
    pub fn new(
        session: Arc<Mutex<Session>>,
        client_name: &str,
        input_channels: usize,
        output_channels: usize,
    ) -> Result<Self, LoopEngineError> {
        let (client, status) =
            Client::new(client_name, ClientOptions::NO_START_SERVER).map_err(LoopEngineError::Jack)?;
        if !status.is_empty() {
            info!("JACK client status: {:?}", status);
        }

        let input_ports = (0..input_channels)
            .map(|i| {
                client
                    .register_port(&format!("input_{}", i + 1), AudioIn::default())
                    .map_err(LoopEngineError::Jack)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output_ports = (0..output_channels)
            .map(|i| {
                client
                    .register_port(&format!("output_{}", i + 1), AudioOut::default())
                    .map_err(LoopEngineError::Jack)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sample_rate = client.sample_rate() as u32;
        let active = Arc::new(AtomicBool::new(true));

        let handler = ProcessHandler {
            session,
            active: active.clone(),
            input_ports,
            output_ports,
        };

        let async_client = client
            .activate_async((), handler)
            .map_err(|e| LoopEngineError::Audio(e.to_string()))?;

        info!(
            "JACK client activated with {} inputs, {} outputs at {}Hz",
            input_channels, output_channels, sample_rate
        );

        Ok(Self {
            client: async_client,
            sample_rate,
            active,
        })
    }

    /// Whether the client is still processing.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop processing; the next callback returns `Control::Quit`.
    pub fn shutdown(&mut self) -> Result<(), LoopEngineError> {
        self.active.store(false, Ordering::SeqCst);
        info!("JACK client shutdown");
        Ok(())
    }

    /// The JACK server's sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Round-trip output port latency, for UI display.
    pub fn get_latency(&self) -> Result<Duration, LoopEngineError> {
        let port_name = format!("{}:output_1", self.client.as_client().name());
        let frames = self
            .client
            .as_client()
            .port_by_name(&port_name)
            .map_or(0, |port| {
                let (_, max) = port.get_latency_range(jack::LatencyType::Playback);
                max
            });
        Ok(Duration::from_secs_f64(frames as f64 / self.sample_rate as f64))
    }
}

impl jack::ProcessHandler for ProcessHandler {
    fn process(&mut self, _client: &jack::Client, ps: &jack::ProcessScope) -> Control {
        if !self.active.load(Ordering::SeqCst) {
            return Control::Quit;
        }

        let frames = ps.n_frames() as usize;
        let input_slices: Vec<&[f32]> = self.input_ports.iter().map(|p| p.as_slice(ps)).collect();

        let mut session = self.session.lock();

        if let Err(e) = session.push_capture_frame(&input_slices) {
            error!("capture push failed: {e}");
        }

        let now = session.now();
        session.tick(now);

        let mixed = session.mix_down(frames);
        for (i, port) in self.output_ports.iter_mut().enumerate() {
            let out = port.as_mut_slice(ps);
            match mixed.channel(i % mixed.channels().max(1)) {
                Some(channel) => out.copy_from_slice(&channel[..out.len().min(channel.len())]),
                None => out.fill(0.0),
            }
        }

        Control::Continue
    }
}

impl Drop for JackAudio {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.shutdown();
        }
    }
}
