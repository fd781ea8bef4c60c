// Low frequency modulation and the effects driven by it.

use std::sync::Arc;

use crate::context::{Context, ParamId, Waveform};
use crate::error::Result;
use crate::node::{Endpoint, Node, Params, Ports, Source, impl_node};

use super::oscillators::{Oscillator, OscillatorOptions};
use super::utility::{Gain, GainOptions, StereoPanner, StereoPannerOptions};

const MIN_RATE: f32 = 0.0;
const MAX_RATE: f32 = 100.0;

// ═══════════════════════════════════════════════════════════════════
// LFO
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoOptions {
    pub depth: f32,
    pub detune: f32,
    /// Hz, clamped to 0..=100.
    pub rate: f32,
    pub start: bool,
    pub waveform: Waveform,
}

impl Default for LfoOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            detune: 0.0,
            rate: 1.0,
            start: false,
            waveform: Waveform::Sine,
        }
    }
}

/// An oscillator scaled by a depth gain, meant to drive parameters.
pub struct Lfo {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    oscillator: Oscillator,
    depth: Gain,
}

impl Lfo {
    pub fn new(ctx: &Context, options: LfoOptions) -> Result<Self> {
        let oscillator = Oscillator::new(
            ctx,
            OscillatorOptions {
                detune: options.detune,
                frequency: options.rate.clamp(MIN_RATE, MAX_RATE),
                start: false,
                waveform: options.waveform,
            },
        )?;
        let depth = Gain::new(ctx, GainOptions { gain: options.depth })?;
        oscillator.connect(&depth);

        let params = Params::new()
            .with("depth", depth.gain_param())
            .with_all("detune", oscillator.params().get_all("detune").to_vec())
            .with("rate", oscillator.frequency_param());
        let lfo = Self {
            ctx: ctx.clone(),
            ports: Ports::new("LFO", Vec::new(), vec![Source::Node(depth.ports().clone())]),
            params,
            oscillator,
            depth,
        };
        if options.start {
            lfo.start()?;
        }
        Ok(lfo)
    }

    pub fn start(&self) -> Result<()> {
        self.oscillator.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.oscillator.stop()
    }

    pub fn rate(&self) -> f32 {
        self.oscillator.frequency()
    }

    pub fn set_rate(&self, value: f32, time: f64) {
        self.oscillator
            .set_frequency(value.clamp(MIN_RATE, MAX_RATE), time);
    }

    pub fn rate_param(&self) -> ParamId {
        self.oscillator.frequency_param()
    }

    pub fn detune(&self) -> f32 {
        self.oscillator.detune()
    }

    pub fn set_detune(&self, value: f32, time: f64) {
        self.oscillator.set_detune(value, time);
    }

    pub fn depth(&self) -> f32 {
        self.depth.gain()
    }

    pub fn set_depth(&self, value: f32, time: f64) {
        self.depth.set_gain(value, time);
    }

    pub fn depth_param(&self) -> ParamId {
        self.depth.gain_param()
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationOptions {
    pub depth: f32,
    pub rate: f32,
    pub waveform: Waveform,
}

impl Default for ModulationOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            rate: 1.0,
            waveform: Waveform::Sine,
        }
    }
}

impl ModulationOptions {
    fn lfo(self) -> LfoOptions {
        LfoOptions {
            depth: self.depth,
            rate: self.rate,
            start: true,
            waveform: self.waveform,
            ..Default::default()
        }
    }
}

fn lfo_params(lfo: &Lfo) -> Params {
    Params::new()
        .with("depth", lfo.depth_param())
        .with("rate", lfo.rate_param())
}

// ═══════════════════════════════════════════════════════════════════
// Tremolo
// ═══════════════════════════════════════════════════════════════════

pub type TremoloOptions = ModulationOptions;

/// Amplitude modulation. The LFO is the only thing opening the gain.
pub struct Tremolo {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    lfo: Lfo,
    gain: Gain,
}

impl Tremolo {
    pub fn new(ctx: &Context, options: TremoloOptions) -> Result<Self> {
        let lfo = Lfo::new(ctx, options.lfo())?;
        let gain = Gain::new(ctx, GainOptions { gain: 0.0 })?;
        lfo.connect(gain.gain_param());

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "Tremolo",
                vec![Endpoint::Node(gain.ports().clone())],
                vec![Source::Node(gain.ports().clone())],
            ),
            params: lfo_params(&lfo),
            lfo,
            gain,
        })
    }

    pub fn depth(&self) -> f32 {
        self.lfo.depth()
    }

    pub fn set_depth(&self, value: f32, time: f64) {
        self.lfo.set_depth(value, time);
    }

    pub fn rate(&self) -> f32 {
        self.lfo.rate()
    }

    pub fn set_rate(&self, value: f32, time: f64) {
        self.lfo.set_rate(value, time);
    }

    pub fn waveform(&self) -> Waveform {
        self.lfo.waveform()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.lfo.set_waveform(waveform);
    }
}

// ═══════════════════════════════════════════════════════════════════
// AutoPan
// ═══════════════════════════════════════════════════════════════════

pub type AutoPanOptions = ModulationOptions;

/// Stereo position swept by an LFO.
pub struct AutoPan {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    lfo: Lfo,
    panner: StereoPanner,
}

impl AutoPan {
    pub fn new(ctx: &Context, options: AutoPanOptions) -> Result<Self> {
        let lfo = Lfo::new(ctx, options.lfo())?;
        let panner = StereoPanner::new(ctx, StereoPannerOptions::default())?;
        lfo.connect(panner.pan_param());

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "AutoPan",
                vec![Endpoint::Node(panner.ports().clone())],
                vec![Source::Node(panner.ports().clone())],
            ),
            params: lfo_params(&lfo),
            lfo,
            panner,
        })
    }

    pub fn depth(&self) -> f32 {
        self.lfo.depth()
    }

    pub fn set_depth(&self, value: f32, time: f64) {
        self.lfo.set_depth(value, time);
    }

    pub fn rate(&self) -> f32 {
        self.lfo.rate()
    }

    pub fn set_rate(&self, value: f32, time: f64) {
        self.lfo.set_rate(value, time);
    }

    pub fn waveform(&self) -> Waveform {
        self.lfo.waveform()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.lfo.set_waveform(waveform);
    }
}

impl_node!(Lfo, Tremolo, AutoPan);
