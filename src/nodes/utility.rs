// Single-unit wrappers plus the limiter.

use std::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::context::{Context, Oversample, ParamId, UnitId, UnitKind, UnitSetting};
use crate::error::Result;
use crate::node::{Endpoint, Node, Params, Ports, Source, impl_node};
use crate::update::{param_accessors, update};

use super::apply_setting;

// ═══════════════════════════════════════════════════════════════════
// Gain
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainOptions {
    pub gain: f32,
}

impl Default for GainOptions {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

pub struct Gain {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    gain: ParamId,
}

impl Gain {
    pub fn new(ctx: &Context, options: GainOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::Gain);
        let gain = ctx.param(unit, "gain")?;
        update(&**ctx, gain, options.gain);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("Gain", unit),
            params: Params::new().with("gain", gain),
            unit,
            gain,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn gain_param(&self) -> ParamId {
        self.gain
    }

    param_accessors! {
        gain, set_gain;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Delay
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DelayOptions {
    pub delay_time: f32,
}

pub struct Delay {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    delay_time: ParamId,
}

impl Delay {
    pub fn new(ctx: &Context, options: DelayOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::Delay);
        let delay_time = ctx.param(unit, "delay_time")?;
        update(&**ctx, delay_time, options.delay_time);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("Delay", unit),
            params: Params::new().with("delay_time", delay_time),
            unit,
            delay_time,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn delay_time_param(&self) -> ParamId {
        self.delay_time
    }

    param_accessors! {
        /// Delay in seconds.
        delay_time, set_delay_time;
    }
}

// ═══════════════════════════════════════════════════════════════════
// StereoPanner
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StereoPannerOptions {
    pub pan: f32,
}

pub struct StereoPanner {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    pan: ParamId,
}

impl StereoPanner {
    pub fn new(ctx: &Context, options: StereoPannerOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::StereoPanner);
        let pan = ctx.param(unit, "pan")?;
        update(&**ctx, pan, options.pan);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("StereoPanner", unit),
            params: Params::new().with("pan", pan),
            unit,
            pan,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn pan_param(&self) -> ParamId {
        self.pan
    }

    param_accessors! {
        /// -1 is hard left, 1 is hard right.
        pan, set_pan;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Channel routing
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelOptions {
    pub channels: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self { channels: 2 }
    }
}

/// Combines mono inputs into one multi-channel output.
pub struct ChannelMerger {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
}

impl ChannelMerger {
    pub fn new(ctx: &Context, options: ChannelOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::ChannelMerger {
            inputs: options.channels,
        });
        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("ChannelMerger", unit),
            params: Params::new(),
            unit,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }
}

/// Splits a multi-channel input into mono outputs.
pub struct ChannelSplitter {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
}

impl ChannelSplitter {
    pub fn new(ctx: &Context, options: ChannelOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::ChannelSplitter {
            outputs: options.channels,
        });
        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("ChannelSplitter", unit),
            params: Params::new(),
            unit,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }
}

// ═══════════════════════════════════════════════════════════════════
// WaveShaper
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveShaperOptions {
    pub curve: Option<Arc<[f32]>>,
    pub oversample: Oversample,
}

pub struct WaveShaper {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    curve: Option<Arc<[f32]>>,
    oversample: Oversample,
}

impl WaveShaper {
    pub fn new(ctx: &Context, options: WaveShaperOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::WaveShaper);
        ctx.configure(unit, UnitSetting::Curve(options.curve.clone()))?;
        ctx.configure(unit, UnitSetting::Oversample(options.oversample))?;

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("WaveShaper", unit),
            params: Params::new(),
            unit,
            curve: options.curve,
            oversample: options.oversample,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn curve(&self) -> Option<&Arc<[f32]>> {
        self.curve.as_ref()
    }

    pub fn set_curve(&mut self, curve: Option<Arc<[f32]>>) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Curve(curve.clone()));
        self.curve = curve;
    }

    pub fn oversample(&self) -> Oversample {
        self.oversample
    }

    pub fn set_oversample(&mut self, oversample: Oversample) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Oversample(oversample));
        self.oversample = oversample;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Convolver
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvolverOptions {
    pub buffer: Option<Arc<AudioBuffer>>,
    pub normalize: bool,
}

pub struct Convolver {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    buffer: Option<Arc<AudioBuffer>>,
    normalize: bool,
}

impl Convolver {
    pub fn new(ctx: &Context, options: ConvolverOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::Convolver);
        ctx.configure(unit, UnitSetting::Normalize(options.normalize))?;
        ctx.configure(unit, UnitSetting::Buffer(options.buffer.clone()))?;

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::unit("Convolver", unit),
            params: Params::new(),
            unit,
            buffer: options.buffer,
            normalize: options.normalize,
        })
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.buffer.as_ref()
    }

    pub fn set_buffer(&mut self, buffer: Option<Arc<AudioBuffer>>) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Buffer(buffer.clone()));
        self.buffer = buffer;
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Only affects buffers set after this call.
    pub fn set_normalize(&mut self, normalize: bool) {
        apply_setting(&self.ctx, self.unit, UnitSetting::Normalize(normalize));
        self.normalize = normalize;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Compressor
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorOptions {
    pub attack: f32,
    pub knee: f32,
    pub ratio: f32,
    pub release: f32,
    pub threshold: f32,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self {
            attack: 0.003,
            knee: 30.0,
            ratio: 12.0,
            release: 0.25,
            threshold: -24.0,
        }
    }
}

pub struct Compressor {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    unit: UnitId,
    attack: ParamId,
    knee: ParamId,
    ratio: ParamId,
    release: ParamId,
    threshold: ParamId,
}

impl Compressor {
    pub fn new(ctx: &Context, options: CompressorOptions) -> Result<Self> {
        let unit = ctx.create_unit(UnitKind::DynamicsCompressor);
        let attack = ctx.param(unit, "attack")?;
        let knee = ctx.param(unit, "knee")?;
        let ratio = ctx.param(unit, "ratio")?;
        let release = ctx.param(unit, "release")?;
        let threshold = ctx.param(unit, "threshold")?;

        let compressor = Self {
            ctx: ctx.clone(),
            ports: Ports::unit("Compressor", unit),
            params: Params::new()
                .with("attack", attack)
                .with("knee", knee)
                .with("ratio", ratio)
                .with("release", release)
                .with("threshold", threshold),
            unit,
            attack,
            knee,
            ratio,
            release,
            threshold,
        };
        compressor.set_threshold(options.threshold, 0.0);
        compressor.set_ratio(options.ratio, 0.0);
        compressor.set_knee(options.knee, 0.0);
        compressor.set_attack(options.attack, 0.0);
        compressor.set_release(options.release, 0.0);
        Ok(compressor)
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Current gain reduction in dB.
    pub fn reduction(&self) -> f32 {
        self.ctx.reduction(self.unit)
    }

    param_accessors! {
        /// Seconds to reduce gain by 10 dB.
        attack, set_attack;
        knee, set_knee;
        ratio, set_ratio;
        /// Seconds to recover gain by 10 dB.
        release, set_release;
        /// dB above which compression starts.
        threshold, set_threshold;
    }
}

// ═══════════════════════════════════════════════════════════════════
// Limiter
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterOptions {
    pub threshold: f32,
    pub ratio: f32,
    pub knee: f32,
    pub attack: f32,
    pub release: f32,
    pub gain: f32,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            threshold: -6.0,
            ratio: 20.0,
            knee: 0.0,
            attack: 0.003,
            release: 0.01,
            gain: 0.75,
        }
    }
}

/// An aggressively configured compressor followed by a make-up gain.
pub struct Limiter {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    compressor: Compressor,
    gain: Gain,
}

impl Limiter {
    pub fn new(ctx: &Context, options: LimiterOptions) -> Result<Self> {
        let compressor = Compressor::new(
            ctx,
            CompressorOptions {
                attack: options.attack,
                knee: options.knee,
                ratio: options.ratio,
                release: options.release,
                threshold: options.threshold,
            },
        )?;
        let gain = Gain::new(ctx, GainOptions { gain: options.gain })?;
        compressor.connect(&gain);

        let params = Params::new()
            .with("attack", compressor.attack)
            .with("gain", gain.gain)
            .with("knee", compressor.knee)
            .with("ratio", compressor.ratio)
            .with("release", compressor.release)
            .with("threshold", compressor.threshold);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "Limiter",
                vec![Endpoint::Node(compressor.ports.clone())],
                vec![Source::Node(gain.ports.clone())],
            ),
            params,
            compressor,
            gain,
        })
    }

    pub fn attack(&self) -> f32 {
        self.compressor.attack()
    }

    pub fn set_attack(&self, value: f32, time: f64) {
        self.compressor.set_attack(value, time);
    }

    pub fn knee(&self) -> f32 {
        self.compressor.knee()
    }

    pub fn set_knee(&self, value: f32, time: f64) {
        self.compressor.set_knee(value, time);
    }

    pub fn ratio(&self) -> f32 {
        self.compressor.ratio()
    }

    pub fn set_ratio(&self, value: f32, time: f64) {
        self.compressor.set_ratio(value, time);
    }

    pub fn release(&self) -> f32 {
        self.compressor.release()
    }

    pub fn set_release(&self, value: f32, time: f64) {
        self.compressor.set_release(value, time);
    }

    pub fn threshold(&self) -> f32 {
        self.compressor.threshold()
    }

    pub fn set_threshold(&self, value: f32, time: f64) {
        self.compressor.set_threshold(value, time);
    }

    pub fn reduction(&self) -> f32 {
        self.compressor.reduction()
    }

    /// Output gain.
    pub fn gain(&self) -> f32 {
        self.gain.gain()
    }

    pub fn set_gain(&self, value: f32, time: f64) {
        self.gain.set_gain(value, time);
    }
}

impl_node!(
    Gain,
    Delay,
    StereoPanner,
    ChannelMerger,
    ChannelSplitter,
    WaveShaper,
    Convolver,
    Compressor,
    Limiter,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, OfflineContext};
    use crate::update;

    fn setup() -> (Arc<OfflineContext>, Context) {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        (host, ctx)
    }

    #[test]
    fn test_gain_defaults() {
        let (_host, ctx) = setup();
        let gain = Gain::new(&ctx, GainOptions::default()).unwrap();
        assert_eq!(gain.gain(), 1.0);
        assert_eq!(gain.params().get("gain"), Some(gain.gain_param()));
    }

    #[test]
    fn test_param_handle_aliases_setter() {
        let (_host, ctx) = setup();
        let a = Gain::new(&ctx, GainOptions::default()).unwrap();
        let b = Gain::new(&ctx, GainOptions::default()).unwrap();

        a.set_gain(0.4, 0.0);
        update::update(&*ctx, b.params().get("gain").unwrap(), 0.4);
        assert_eq!(a.gain(), b.gain());
    }

    #[test]
    fn test_partial_options() {
        let (_host, ctx) = setup();
        let compressor = Compressor::new(
            &ctx,
            CompressorOptions {
                ratio: 4.0,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(compressor.ratio(), 4.0);
        assert_eq!(compressor.threshold(), -24.0);
        assert_eq!(compressor.knee(), 30.0);
        assert_eq!(compressor.reduction(), 0.0);
    }

    #[test]
    fn test_limiter_wiring() {
        let (host, ctx) = setup();
        let limiter = Limiter::new(&ctx, LimiterOptions::default()).unwrap();

        assert_eq!(
            host.connections(),
            vec![Connection::Unit {
                from: limiter.compressor.unit(),
                to: limiter.gain.unit(),
                output: 0,
                input: 0,
            }]
        );
        assert_eq!(limiter.threshold(), -6.0);
        assert_eq!(limiter.ratio(), 20.0);
        assert_eq!(limiter.gain(), 0.75);
        assert_eq!(
            limiter.ports().input_targets(),
            vec![crate::node::Target::Unit(limiter.compressor.unit())]
        );
        assert_eq!(limiter.ports().output_units(), vec![limiter.gain.unit()]);
    }

    #[test]
    fn test_merger_accepts_second_input() {
        let (host, ctx) = setup();
        let gain = Gain::new(&ctx, GainOptions::default()).unwrap();
        let merger = ChannelMerger::new(&ctx, ChannelOptions::default()).unwrap();

        gain.connect_with(&merger, 0, 1);
        assert!(host.is_connected(Connection::Unit {
            from: gain.unit(),
            to: merger.unit(),
            output: 0,
            input: 1,
        }));

        // Out of range input is logged, not connected
        gain.connect_with(&merger, 0, 2);
        assert_eq!(host.connections().len(), 1);
    }

    #[test]
    fn test_wave_shaper_settings() {
        let (host, ctx) = setup();
        let mut shaper = WaveShaper::new(&ctx, WaveShaperOptions::default()).unwrap();
        assert_eq!(shaper.oversample(), Oversample::None);
        assert!(shaper.curve().is_none());

        let curve: Arc<[f32]> = Arc::from(vec![-1.0, 0.0, 1.0]);
        shaper.set_curve(Some(curve.clone()));
        shaper.set_oversample(Oversample::X4);

        let settings = host.settings(shaper.unit());
        assert!(settings.contains(&UnitSetting::Curve(Some(curve))));
        assert!(settings.contains(&UnitSetting::Oversample(Oversample::X4)));
    }

    #[test]
    fn test_convolver_defaults() {
        let (_host, ctx) = setup();
        let convolver = Convolver::new(&ctx, ConvolverOptions::default()).unwrap();
        assert!(convolver.buffer().is_none());
        assert!(!convolver.normalize());
        assert_eq!(ctx.sample_rate(), 48_000.0);
    }

    #[test]
    fn test_delay_and_panner_defaults() {
        let (_host, ctx) = setup();
        let delay = Delay::new(&ctx, DelayOptions::default()).unwrap();
        let panner = StereoPanner::new(&ctx, StereoPannerOptions { pan: -0.5 }).unwrap();
        assert_eq!(delay.delay_time(), 0.0);
        assert_eq!(panner.pan(), -0.5);
    }
}
