// Signal sources: oscillators, constant and buffer sources, noise.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio_buffer::AudioBuffer;
use crate::context::{Context, ParamId, UnitId, UnitKind, UnitSetting, Waveform};
use crate::error::Result;
use crate::node::{Node, Params, Ports, Source, impl_node};
use crate::update::param_accessors;

use super::apply_setting;
use super::utility::{Gain, GainOptions};

// ═══════════════════════════════════════════════════════════════════
// Oscillator
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorOptions {
    pub detune: f32,
    pub frequency: f32,
    pub start: bool,
    pub waveform: Waveform,
}

impl Default for OscillatorOptions {
    fn default() -> Self {
        Self {
            detune: 0.0,
            frequency: 440.0,
            start: false,
            waveform: Waveform::Sine,
        }
    }
}

pub struct Oscillator {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    waveform: Waveform,
    detune: ParamId,
    frequency: ParamId,
}

impl Oscillator {
    pub fn new(ctx: &Context, options: OscillatorOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::Oscillator);
        let detune = ctx.param(unit, "detune")?;
        let frequency = ctx.param(unit, "frequency")?;
        ctx.configure(unit, UnitSetting::Waveform(options.waveform))?;

        let osc = Self {
            ctx: ctx.clone(),
            ports: Ports::source("Oscillator", unit),
            params: Params::new()
                .with("detune", detune)
                .with("frequency", frequency),
            unit,
            waveform: options.waveform,
            detune,
            frequency,
        };
        osc.set_frequency(options.frequency, 0.0);
        osc.set_detune(options.detune, 0.0);
        if options.start {
            osc.start()?;
        }
        Ok(osc)
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn frequency_param(&self) -> ParamId {
        self.frequency
    }

    pub fn start(&self) -> Result<()> {
        self.ctx.start(self.unit, self.ctx.current_time())
    }

    pub fn stop(&self) -> Result<()> {
        self.ctx.stop(self.unit, self.ctx.current_time())
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Waveform(waveform));
        self.waveform = waveform;
    }

    param_accessors! {
        detune, set_detune;
        frequency, set_frequency;
    }
}

// ═══════════════════════════════════════════════════════════════════
// ConstantSource
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSourceOptions {
    pub offset: f32,
    pub start: bool,
}

impl Default for ConstantSourceOptions {
    fn default() -> Self {
        Self {
            offset: 1.0,
            start: false,
        }
    }
}

/// Emits its `offset` parameter as a signal.
pub struct ConstantSource {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    offset: ParamId,
}

impl ConstantSource {
    pub fn new(ctx: &Context, options: ConstantSourceOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::ConstantSource);
        let offset = ctx.param(unit, "offset")?;

        let source = Self {
            ctx: ctx.clone(),
            ports: Ports::source("ConstantSource", unit),
            params: Params::new().with("offset", offset),
            unit,
            offset,
        };
        source.set_offset(options.offset, 0.0);
        if options.start {
            source.start()?;
        }
        Ok(source)
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn offset_param(&self) -> ParamId {
        self.offset
    }

    pub fn start(&self) -> Result<()> {
        self.ctx.start(self.unit, self.ctx.current_time())
    }

    pub fn stop(&self) -> Result<()> {
        self.ctx.stop(self.unit, self.ctx.current_time())
    }

    param_accessors! {
        offset, set_offset;
    }
}

// ═══════════════════════════════════════════════════════════════════
// BufferSource
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct BufferSourceOptions {
    pub buffer: Option<Arc<AudioBuffer>>,
    pub detune: f32,
    pub looping: bool,
    pub playback_rate: f32,
    pub start: bool,
}

impl Default for BufferSourceOptions {
    fn default() -> Self {
        Self {
            buffer: None,
            detune: 0.0,
            looping: false,
            playback_rate: 1.0,
            start: false,
        }
    }
}

pub struct BufferSource {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    buffer: Option<Arc<AudioBuffer>>,
    looping: bool,
    detune: ParamId,
    playback_rate: ParamId,
}

impl BufferSource {
    pub fn new(ctx: &Context, options: BufferSourceOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::BufferSource);
        let detune = ctx.param(unit, "detune")?;
        let playback_rate = ctx.param(unit, "playback_rate")?;
        ctx.configure(unit, UnitSetting::Buffer(options.buffer.clone()))?;
        ctx.configure(unit, UnitSetting::Loop(options.looping))?;

        let source = Self {
            ctx: ctx.clone(),
            ports: Ports::source("BufferSource", unit),
            params: Params::new()
                .with("detune", detune)
                .with("playback_rate", playback_rate),
            unit,
            buffer: options.buffer,
            looping: options.looping,
            detune,
            playback_rate,
        };
        source.set_detune(options.detune, 0.0);
        source.set_playback_rate(options.playback_rate, 0.0);
        if options.start {
            source.start()?;
        }
        Ok(source)
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn start(&self) -> Result<()> {
        self.ctx.start(self.unit, self.ctx.current_time())
    }

    pub fn stop(&self) -> Result<()> {
        self.ctx.stop(self.unit, self.ctx.current_time())
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    pub fn set_buffer(&mut self, buffer: Option<Arc<AudioBuffer>>) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Buffer(buffer.clone()));
        self.buffer = buffer;
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Loop(looping));
        self.looping = looping;
    }

    param_accessors! {
        detune, set_detune;
        playback_rate, set_playback_rate;
    }
}

// ═══════════════════════════════════════════════════════════════════
// NoiseGenerator
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseType {
    #[default]
    White,
    Pink,
    Brown,
}

#[inline]
fn white_sample(rng: &mut impl Rng) -> f32 {
    rng.gen_range(-1.0..1.0)
}

pub(crate) fn fill_white(data: &mut [f32], rng: &mut impl Rng) {
    for sample in data {
        *sample = white_sample(rng);
    }
}

/// Paul Kellet's refined pink noise filter.
fn fill_pink(data: &mut [f32], rng: &mut impl Rng) {
    let mut b = [0.0f32; 7];
    for sample in data {
        let white = white_sample(rng);
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.969 * b[2] + white * 0.153852;
        b[3] = 0.8665 * b[3] + white * 0.3104856;
        b[4] = 0.55 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.016898;
        *sample = (b.iter().sum::<f32>() + white * 0.5362) * 0.11;
        b[6] = white * 0.115926;
    }
}

/// Leaky integration of white noise, with makeup gain.
fn fill_brown(data: &mut [f32], rng: &mut impl Rng) {
    const MAKEUP: f32 = 4.0;
    let mut last = 0.0f32;
    for sample in data {
        let white = white_sample(rng);
        *sample = ((last + 0.02 * white) * MAKEUP) / 1.02;
        last = *sample / MAKEUP;
    }
}

/// A two second mono noise buffer.
pub fn noise_buffer(noise_type: NoiseType, sample_rate: f32, rng: &mut impl Rng) -> AudioBuffer {
    let mut buffer = AudioBuffer::new(1, (sample_rate * 2.0) as usize, sample_rate);
    let data = buffer.channel_mut(0);
    match noise_type {
        NoiseType::White => fill_white(data, rng),
        NoiseType::Pink => fill_pink(data, rng),
        NoiseType::Brown => fill_brown(data, rng),
    }
    buffer
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoiseGeneratorOptions {
    pub start: bool,
    pub noise_type: NoiseType,
    /// Fixed seed for reproducible buffers.
    pub seed: Option<u64>,
}

/// Loops a generated noise buffer.
pub struct NoiseGenerator {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    source: BufferSource,
    noise_type: NoiseType,
    rng: StdRng,
}

impl NoiseGenerator {
    pub fn new(ctx: &Context, options: NoiseGeneratorOptions) -> Result<Self> {
        let source = BufferSource::new(
            ctx,
            BufferSourceOptions {
                looping: true,
                ..Default::default()
            },
        )?;
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut noise = Self {
            ctx: ctx.clone(),
            ports: Ports::new("NoiseGenerator", Vec::new(), vec![Source::Node(source.ports.clone())]),
            params: Params::new(),
            source,
            noise_type: options.noise_type,
            rng,
        };
        noise.set_noise_type(options.noise_type);
        if options.start {
            noise.start()?;
        }
        Ok(noise)
    }

    pub fn start(&self) -> Result<()> {
        self.source.start()
    }

    pub fn stop(&self) -> Result<()> {
        self.source.stop()
    }

    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    /// Regenerates the looping buffer with the new color.
    pub fn set_noise_type(&mut self, noise_type: NoiseType) {
        self.noise_type = noise_type;
        let buffer = noise_buffer(noise_type, self.ctx.sample_rate(), &mut self.rng);
        self.source.set_buffer(Some(Arc::new(buffer)));
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.source.buffer()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Osc
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscOptions {
    pub detune: f32,
    pub frequency: f32,
    pub gain: f32,
    pub waveform: Waveform,
}

impl Default for OscOptions {
    fn default() -> Self {
        Self {
            detune: 0.0,
            frequency: 440.0,
            gain: 1.0,
            waveform: Waveform::Sine,
        }
    }
}

/// A running oscillator with an output gain.
pub struct Osc {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    oscillator: Oscillator,
    gain: Gain,
}

impl Osc {
    pub fn new(ctx: &Context, options: OscOptions) -> Result<Self> {
        let oscillator = Oscillator::new(
            ctx,
            OscillatorOptions {
                detune: options.detune,
                frequency: options.frequency,
                start: true,
                waveform: options.waveform,
            },
        )?;
        let gain = Gain::new(ctx, GainOptions { gain: options.gain })?;
        oscillator.connect(&gain);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new("Osc", Vec::new(), vec![Source::Node(gain.ports().clone())]),
            params: Params::new()
                .with("detune", oscillator.detune)
                .with("frequency", oscillator.frequency)
                .with("gain", gain.gain_param()),
            oscillator,
            gain,
        })
    }

    pub fn frequency_param(&self) -> ParamId {
        self.oscillator.frequency
    }

    pub fn detune(&self) -> f32 {
        self.oscillator.detune()
    }

    pub fn set_detune(&self, value: f32, time: f64) {
        self.oscillator.set_detune(value, time);
    }

    pub fn frequency(&self) -> f32 {
        self.oscillator.frequency()
    }

    pub fn set_frequency(&self, value: f32, time: f64) {
        self.oscillator.set_frequency(value, time);
    }

    pub fn gain(&self) -> f32 {
        self.gain.gain()
    }

    pub fn set_gain(&self, value: f32, time: f64) {
        self.gain.set_gain(value, time);
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }

    pub(crate) fn output_unit(&self) -> UnitId {
        self.gain.unit()
    }
}

impl_node!(Oscillator, ConstantSource, BufferSource, NoiseGenerator, Osc);
