//! Engine configuration
//!
//! [`EngineConfig`] carries every tunable named in spec §6. It loads from
//! an optional TOML file and `LOOP_`-prefixed environment variables via
//! the `config` crate, falling back to the documented defaults.

use serde::{Deserialize, Serialize};

/// Tunables for the loop engine's recorder, pitch engine, undo stack, and
/// anti-feedback policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default grain size for the granular pitch engine (samples).
    pub pitch_grain_size: usize,
    /// Hop size as a fraction of grain size.
    pub pitch_hop_ratio: f32,
    /// Per-job timeout before falling back to inline synchronous pitch
    /// shifting, in milliseconds.
    pub pitch_job_timeout_ms: u64,
    /// Maximum number of undo snapshots retained per track.
    pub undo_stack_limit: usize,
    /// Hard watchdog timeout for any single recorder operation, in
    /// milliseconds.
    pub recorder_global_timeout_ms: u64,
    /// Whether arming an overdub automatically mutes the master bus and
    /// monitor.
    pub auto_mute_monitor_on_overdub: bool,
    /// Whether an overdub capture shorter than the loop may wrap instead
    /// of being zero-padded.
    pub allow_wrap_overdub: bool,
    /// RMS threshold above which the loopback probe flags feedback risk.
    pub loopback_rms_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pitch_grain_size: 2048,
            pitch_hop_ratio: 0.25,
            pitch_job_timeout_ms: 45_000,
            undo_stack_limit: 6,
            recorder_global_timeout_ms: 120_000,
            auto_mute_monitor_on_overdub: true,
            allow_wrap_overdub: false,
            loopback_rms_threshold: 0.02,
        }
    }
}

impl EngineConfig {
    /// Load configuration, layering an optional TOML file under
    /// environment overrides (`LOOP_PITCH_GRAIN_SIZE`, etc), falling back
    /// to [`EngineConfig::default`] entirely if neither is present.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("LOOP").separator("_"));

        builder.build()?.try_deserialize()
    }

    /// Hop size in samples for a given grain size, honoring
    /// `pitch_hop_ratio`.
    pub fn hop_size(&self, grain_size: usize) -> usize {
        ((grain_size as f32) * self.pitch_hop_ratio).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.pitch_grain_size, 2048);
        assert_eq!(cfg.undo_stack_limit, 6);
        assert_eq!(cfg.recorder_global_timeout_ms, 120_000);
        assert!(!cfg.allow_wrap_overdub);
    }

    #[test]
    fn hop_size_uses_ratio() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.hop_size(2048), 512);
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let cfg = EngineConfig::load(None).expect("load should succeed with no sources");
        assert_eq!(cfg, EngineConfig::default());
    }
}
