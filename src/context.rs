// src/context.rs
//
// The host engine interface.
//
// Nodes never process audio themselves. They create primitive units on a
// host, schedule values on the units' parameters, and wire units together.
// `AudioContext` is that host, and `Context` is the shared handle every
// node is constructed with.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::audio_buffer::AudioBuffer;
use crate::error::Result;
use crate::graph::OfflineContext;

/// Handle to a primitive unit owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// Handle to an automatable parameter of a primitive unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

// ═══════════════════════════════════════════════════════════════════
// Unit Kinds
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Lowshelf,
    Highshelf,
    Peaking,
    Notch,
    Allpass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversample {
    #[default]
    None,
    X2,
    X4,
}

/// The primitive unit types a host must be able to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Oscillator,
    Gain,
    BiquadFilter,
    Delay,
    Convolver,
    DynamicsCompressor,
    ConstantSource,
    BufferSource,
    ChannelMerger { inputs: usize },
    ChannelSplitter { outputs: usize },
    WaveShaper,
    StereoPanner,
    /// The final mix bus. Hosts create exactly one.
    Destination,
}

impl UnitKind {
    pub fn name(&self) -> &'static str {
        match self {
            UnitKind::Oscillator => "Oscillator",
            UnitKind::Gain => "Gain",
            UnitKind::BiquadFilter => "BiquadFilter",
            UnitKind::Delay => "Delay",
            UnitKind::Convolver => "Convolver",
            UnitKind::DynamicsCompressor => "DynamicsCompressor",
            UnitKind::ConstantSource => "ConstantSource",
            UnitKind::BufferSource => "BufferSource",
            UnitKind::ChannelMerger { .. } => "ChannelMerger",
            UnitKind::ChannelSplitter { .. } => "ChannelSplitter",
            UnitKind::WaveShaper => "WaveShaper",
            UnitKind::StereoPanner => "StereoPanner",
            UnitKind::Destination => "Destination",
        }
    }

    /// Automatable parameters and the values a freshly created unit holds.
    pub fn param_defaults(&self) -> &'static [(&'static str, f32)] {
        match self {
            UnitKind::Oscillator => &[("frequency", 440.0), ("detune", 0.0)],
            UnitKind::Gain => &[("gain", 1.0)],
            UnitKind::BiquadFilter => &[
                ("frequency", 350.0),
                ("detune", 0.0),
                ("q", 1.0),
                ("gain", 0.0),
            ],
            UnitKind::Delay => &[("delay_time", 0.0)],
            UnitKind::DynamicsCompressor => &[
                ("threshold", -24.0),
                ("knee", 30.0),
                ("ratio", 12.0),
                ("attack", 0.003),
                ("release", 0.25),
            ],
            UnitKind::ConstantSource => &[("offset", 1.0)],
            UnitKind::BufferSource => &[("playback_rate", 1.0), ("detune", 0.0)],
            UnitKind::StereoPanner => &[("pan", 0.0)],
            UnitKind::Convolver
            | UnitKind::ChannelMerger { .. }
            | UnitKind::ChannelSplitter { .. }
            | UnitKind::WaveShaper
            | UnitKind::Destination => &[],
        }
    }

    pub fn input_count(&self) -> usize {
        match self {
            UnitKind::Oscillator | UnitKind::ConstantSource | UnitKind::BufferSource => 0,
            UnitKind::ChannelMerger { inputs } => *inputs,
            _ => 1,
        }
    }

    pub fn output_count(&self) -> usize {
        match self {
            UnitKind::ChannelSplitter { outputs } => *outputs,
            UnitKind::Destination => 0,
            _ => 1,
        }
    }

    /// Scheduled sources must be started before they produce signal.
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            UnitKind::Oscillator | UnitKind::ConstantSource | UnitKind::BufferSource
        )
    }

    pub fn accepts(&self, setting: &UnitSetting) -> bool {
        matches!(
            (self, setting),
            (UnitKind::Oscillator, UnitSetting::Waveform(_))
                | (UnitKind::BiquadFilter, UnitSetting::FilterType(_))
                | (UnitKind::WaveShaper, UnitSetting::Curve(_))
                | (UnitKind::WaveShaper, UnitSetting::Oversample(_))
                | (UnitKind::Convolver, UnitSetting::Buffer(_))
                | (UnitKind::Convolver, UnitSetting::Normalize(_))
                | (UnitKind::BufferSource, UnitSetting::Buffer(_))
                | (UnitKind::BufferSource, UnitSetting::Loop(_))
        )
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-automatable unit configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSetting {
    Waveform(Waveform),
    FilterType(FilterType),
    Curve(Option<Arc<[f32]>>),
    Oversample(Oversample),
    Buffer(Option<Arc<AudioBuffer>>),
    Normalize(bool),
    Loop(bool),
}

impl UnitSetting {
    pub fn name(&self) -> &'static str {
        match self {
            UnitSetting::Waveform(_) => "waveform",
            UnitSetting::FilterType(_) => "filter type",
            UnitSetting::Curve(_) => "curve",
            UnitSetting::Oversample(_) => "oversample",
            UnitSetting::Buffer(_) => "buffer",
            UnitSetting::Normalize(_) => "normalize",
            UnitSetting::Loop(_) => "loop",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Host Interface
// ═══════════════════════════════════════════════════════════════════

/// A real-time graph engine that owns primitive units.
///
/// All times are in seconds on the host clock. Connection calls take the
/// output port of `from` and, for unit destinations, the input port of `to`.
pub trait AudioContext: Send + Sync {
    fn sample_rate(&self) -> f32;

    /// Monotonic host clock.
    fn current_time(&self) -> f64;

    /// The final mix bus.
    fn destination(&self) -> UnitId;

    fn create_unit(&self, kind: UnitKind) -> UnitId;

    /// Looks up an automatable parameter of `unit` by name.
    fn param(&self, unit: UnitId, name: &str) -> Result<ParamId>;

    /// Value of the parameter at the current host time.
    fn param_value(&self, param: ParamId) -> Option<f32>;

    fn set_value_at_time(&self, param: ParamId, value: f32, time: f64) -> Result<()>;

    /// Exponential approach towards `target` starting at `start`.
    fn set_target_at_time(
        &self,
        param: ParamId,
        target: f32,
        start: f64,
        time_constant: f64,
    ) -> Result<()>;

    fn configure(&self, unit: UnitId, setting: UnitSetting) -> Result<()>;

    fn connect_unit(&self, from: UnitId, to: UnitId, output: usize, input: usize) -> Result<()>;

    fn connect_param(&self, from: UnitId, param: ParamId, output: usize) -> Result<()>;

    /// Severs every outgoing connection of `from`.
    fn disconnect_all(&self, from: UnitId) -> Result<()>;

    fn disconnect_unit(&self, from: UnitId, to: UnitId, output: usize, input: usize)
    -> Result<()>;

    fn disconnect_param(&self, from: UnitId, param: ParamId, output: usize) -> Result<()>;

    fn start(&self, unit: UnitId, when: f64) -> Result<()>;

    fn stop(&self, unit: UnitId, when: f64) -> Result<()>;

    /// Resumes a suspended host clock.
    fn resume(&self);

    /// Current gain reduction of a compressor, in dB.
    fn reduction(&self, _unit: UnitId) -> f32 {
        0.0
    }
}

/// Shared handle to a host.
pub type Context = Arc<dyn AudioContext>;

// ═══════════════════════════════════════════════════════════════════
// Global Default
// ═══════════════════════════════════════════════════════════════════

// Process-wide convenience default. Tests must build their own context
// instead of relying on this one.
static GLOBAL: RwLock<Option<Context>> = RwLock::new(None);

/// Returns the process-wide context, creating an `OfflineContext` on first use.
pub fn get_context() -> Context {
    if let Some(ctx) = GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return ctx.clone();
    }

    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    slot.get_or_insert_with(|| {
        log::debug!("creating default offline context");
        Arc::new(OfflineContext::default()) as Context
    })
    .clone()
}

/// Replaces the process-wide context.
pub fn set_context(ctx: Context) {
    *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Some(ctx);
}

/// Resumes the process-wide context.
pub fn resume() {
    get_context().resume();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_defaults() {
        assert_eq!(UnitKind::Gain.param_defaults(), &[("gain", 1.0)]);
        assert!(UnitKind::WaveShaper.param_defaults().is_empty());
    }

    #[test]
    fn test_port_counts() {
        assert_eq!(UnitKind::Oscillator.input_count(), 0);
        assert_eq!(UnitKind::ChannelMerger { inputs: 2 }.input_count(), 2);
        assert_eq!(UnitKind::ChannelSplitter { outputs: 2 }.output_count(), 2);
        assert_eq!(UnitKind::Destination.output_count(), 0);
    }

    #[test]
    fn test_accepts_settings() {
        assert!(UnitKind::Oscillator.accepts(&UnitSetting::Waveform(Waveform::Square)));
        assert!(!UnitKind::Gain.accepts(&UnitSetting::Loop(true)));
        assert!(UnitKind::BufferSource.accepts(&UnitSetting::Buffer(None)));
    }

    #[test]
    fn test_global_context_is_shared() {
        let a = get_context();
        let b = get_context();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
