//! MIDI control surface input
//!
//! Maps a hardware footswitch or controller to [`SessionCommand`]s: note-on
//! messages press/stop tracks the way a foot press would, and a handful of
//! control-change numbers reach the transport-level toggles. Connects via
//! `midir`, whose callback runs on its own thread, so the handler talks to
//! the session through the same `Arc<Mutex<Session>>` the audio backend
//! uses.

use std::sync::Arc;

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::LoopEngineError;
use crate::session::coordinator::{SessionCommand, TrackCommand};
use crate::session::Session;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const CONTROL_CHANGE: u8 = 0xB0;

const CC_MONITOR_TOGGLE: u8 = 20;
const CC_CONFIRM_LOOPBACK: u8 = 21;
const CC_START_MIX_RECORD: u8 = 22;
const CC_STOP_MIX_RECORD: u8 = 23;

/// Owns the `midir` input and its live port connections.
pub struct MidiHandler {
    input_name: String,
    connections: Vec<MidiInputConnection<()>>,
}

impl MidiHandler {
    /// Open a new MIDI input client under `client_name`. Does not connect
    /// to any port yet; call [`MidiHandler::connect_all`] or
    /// [`MidiHandler::connect_port_index`].
    pub fn new(client_name: &str) -> Result<Self, LoopEngineError> {
        let _ = MidiInput::new(client_name).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        Ok(Self {
            input_name: client_name.to_string(),
            connections: Vec::new(),
        })
    }

    /// List the currently visible MIDI input ports' names.
    pub fn list_ports(&self) -> Result<Vec<String>, LoopEngineError> {
        let input = MidiInput::new(&self.input_name).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        input
            .ports()
            .iter()
            .map(|p| input.port_name(p).map_err(|e| LoopEngineError::Audio(e.to_string())))
            .collect()
    }

    /// Connect to every visible input port, dispatching parsed commands
    /// straight into `session`.
    pub fn connect_all(&mut self, session: Arc<Mutex<Session>>) -> Result<(), LoopEngineError> {
        let input = MidiInput::new(&self.input_name).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        let ports = input.ports();
        for port in &ports {
            self.connect_port(port, session.clone())?;
        }
        Ok(())
    }

    /// Connect to a single port by index into [`MidiHandler::list_ports`].
    pub fn connect_port_index(&mut self, index: usize, session: Arc<Mutex<Session>>) -> Result<(), LoopEngineError> {
        let input = MidiInput::new(&self.input_name).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        let ports = input.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| LoopEngineError::Audio(format!("no MIDI input port at index {index}")))?;
        self.connect_port(port, session)
    }

    fn connect_port(&mut self, port: &MidiInputPort, session: Arc<Mutex<Session>>) -> Result<(), LoopEngineError> {
        let input = MidiInput::new(&self.input_name).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        let port_name = input.port_name(port).unwrap_or_else(|_| "unknown".to_string());

        let connection = input
            .connect(
                port,
                "loop_engine-midi-in",
                move |_stamp, message, _| {
                    if let Some(command) = parse_message(message) {
                        debug!("midi -> {command:?}");
                        session.lock().dispatch(command);
                    }
                },
                (),
            )
            .map_err(|e| LoopEngineError::Audio(e.to_string()))?;

        warn!("connected MIDI input: {port_name}");
        self.connections.push(connection);
        Ok(())
    }

    /// Number of currently-open port connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drop every open connection.
    pub fn disconnect_all(&mut self) {
        self.connections.clear();
    }
}

/// Translate a raw MIDI message into a [`SessionCommand`], or `None` if it
/// isn't one this engine understands.
fn parse_message(message: &[u8]) -> Option<SessionCommand> {
    let status = *message.first()?;
    let kind = status & 0xF0;

    match kind {
        NOTE_ON => {
            let note = *message.get(1)?;
            let velocity = *message.get(2)?;
            let track = note_to_track(note)?;
            if velocity == 0 {
                Some(SessionCommand::Track(track, TrackCommand::Stop))
            } else {
                Some(SessionCommand::Track(track, TrackCommand::Press))
            }
        }
        NOTE_OFF => {
            let note = *message.get(1)?;
            let track = note_to_track(note)?;
            Some(SessionCommand::Track(track, TrackCommand::Stop))
        }
        CONTROL_CHANGE => {
            let controller = *message.get(1)?;
            match controller {
                CC_MONITOR_TOGGLE => Some(SessionCommand::ToggleMonitor),
                CC_CONFIRM_LOOPBACK => Some(SessionCommand::ConfirmLoopback),
                CC_START_MIX_RECORD => Some(SessionCommand::StartMixRecord),
                CC_STOP_MIX_RECORD => Some(SessionCommand::StopMixRecord),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Notes 60-63 (middle C through D#5) map to tracks 1-4, mirroring a
/// four-button footswitch's usual General MIDI mapping.
fn note_to_track(note: u8) -> Option<usize> {
    match note {
        60..=63 => Some((note - 60) as usize + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_with_velocity_maps_to_press() {
        let cmd = parse_message(&[NOTE_ON, 60, 100]).unwrap();
        assert!(matches!(cmd, SessionCommand::Track(1, TrackCommand::Press)));
    }

    #[test]
    fn note_on_with_zero_velocity_is_a_stop() {
        let cmd = parse_message(&[NOTE_ON, 61, 0]).unwrap();
        assert!(matches!(cmd, SessionCommand::Track(2, TrackCommand::Stop)));
    }

    #[test]
    fn note_off_maps_to_stop() {
        let cmd = parse_message(&[NOTE_OFF, 63, 64]).unwrap();
        assert!(matches!(cmd, SessionCommand::Track(4, TrackCommand::Stop)));
    }

    #[test]
    fn unmapped_note_is_ignored() {
        assert!(parse_message(&[NOTE_ON, 10, 100]).is_none());
    }

    #[test]
    fn control_change_monitor_toggle() {
        let cmd = parse_message(&[CONTROL_CHANGE, CC_MONITOR_TOGGLE, 127]).unwrap();
        assert!(matches!(cmd, SessionCommand::ToggleMonitor));
    }

    #[test]
    fn unmapped_controller_is_ignored() {
        assert!(parse_message(&[CONTROL_CHANGE, 99, 127]).is_none());
    }
}
