// Dry/wet effects: distortion, convolution reverb and delays.

use std::f32::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio_buffer::AudioBuffer;
use crate::context::Context;
use crate::error::Result;
use crate::node::{Endpoint, Node, Params, Ports, Source, impl_node};
use crate::parameter::ParamTimeline;
use crate::update::{dry_wet_update, linear_fade_update};

use super::filters::{Filter, FilterOptions};
use super::oscillators::fill_white;
use super::utility::{
    ChannelMerger, ChannelOptions, Convolver, ConvolverOptions, Delay, DelayOptions, Gain,
    GainOptions, WaveShaper, WaveShaperOptions,
};

/// Dry and wet gains shared by every effect here. Both sit on the output.
struct DryWet {
    dry: Gain,
    wet: Gain,
}

impl DryWet {
    fn new(ctx: &Context) -> Result<Self> {
        Ok(Self {
            dry: Gain::new(ctx, GainOptions::default())?,
            wet: Gain::new(ctx, GainOptions::default())?,
        })
    }

    fn outputs(&self) -> Vec<Source> {
        vec![
            Source::Node(self.dry.ports().clone()),
            Source::Node(self.wet.ports().clone()),
        ]
    }
}

// ═══════════════════════════════════════════════════════════════════
// Distortion
// ═══════════════════════════════════════════════════════════════════

/// Soft clipping transfer curve with `len` points over [-1, 1).
pub fn distortion_curve(amount: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = (i as f32 * 2.0) / len as f32 - 1.0;
            ((3.0 + amount) * ((x * 0.25).sinh() * 5.0).atan()) / (PI + amount * x.abs())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistortionOptions {
    /// Dry/wet mix, 0 is fully dry.
    pub amount: f32,
    pub distortion: f32,
}

pub struct Distortion {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    mix: DryWet,
    shaper: WaveShaper,
    distortion: f32,
}

impl Distortion {
    pub fn new(ctx: &Context, options: DistortionOptions) -> Result<Self> {
        let mix = DryWet::new(ctx)?;
        let shaper = WaveShaper::new(ctx, WaveShaperOptions::default())?;
        shaper.connect(&mix.wet);

        let mut distortion = Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "Distortion",
                vec![
                    Endpoint::Node(mix.dry.ports().clone()),
                    Endpoint::Node(shaper.ports().clone()),
                ],
                mix.outputs(),
            ),
            params: Params::new(),
            mix,
            shaper,
            distortion: 0.0,
        };
        distortion.set_amount(options.amount, 0.0);
        distortion.set_distortion(options.distortion);
        Ok(distortion)
    }

    /// Reads the wet level.
    pub fn amount(&self) -> f32 {
        self.mix.wet.gain()
    }

    pub fn set_amount(&self, value: f32, time: f64) {
        linear_fade_update(
            &*self.ctx,
            self.mix.dry.gain_param(),
            self.mix.wet.gain_param(),
            value,
            time,
        );
    }

    pub fn distortion(&self) -> f32 {
        self.distortion
    }

    pub fn set_distortion(&mut self, distortion: f32) {
        let len = self.ctx.sample_rate() as usize;
        let curve = distortion_curve(distortion, len);
        self.shaper.set_curve(Some(Arc::from(curve)));
        self.distortion = distortion;
    }

    pub fn curve(&self) -> Option<&Arc<[f32]>> {
        self.shaper.curve()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Reverb
// ═══════════════════════════════════════════════════════════════════

const IMPULSE_PRE_DELAY: f64 = 0.01;
const IMPULSE_DECAY: f64 = 0.5;
const IMPULSE_PEAK: f32 = 0.05;

/// The gain curve applied to the noise of a synthesized impulse.
pub fn impulse_envelope() -> ParamTimeline {
    let mut envelope = ParamTimeline::new(1.0);
    envelope.set_value_at_time(0.0, 0.0);
    envelope.set_target_at_time(IMPULSE_PEAK, 0.0, IMPULSE_PRE_DELAY);
    envelope.set_target_at_time(0.0, IMPULSE_PRE_DELAY, IMPULSE_DECAY);
    envelope
}

/// Stereo decaying noise, `(pre delay + decay) * 5` seconds long.
pub fn impulse_response(sample_rate: f32, rng: &mut impl Rng) -> AudioBuffer {
    let seconds = (IMPULSE_PRE_DELAY + IMPULSE_DECAY) * 5.0;
    let frames = (seconds * sample_rate as f64).round() as usize;
    let envelope = impulse_envelope();
    let gains: Vec<f32> = (0..frames)
        .map(|i| envelope.value_at(i as f64 / sample_rate as f64))
        .collect();

    let mut buffer = AudioBuffer::new(2, frames, sample_rate);
    for ch in 0..buffer.channels() {
        let data = buffer.channel_mut(ch);
        fill_white(data, rng);
        for (sample, gain) in data.iter_mut().zip(&gains) {
            *sample *= gain;
        }
    }
    buffer
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReverbOptions {
    pub amount: f32,
    /// Impulse response. A default one is synthesized when absent.
    pub buffer: Option<Arc<AudioBuffer>>,
    pub normalize: bool,
    /// Seed for the synthesized impulse.
    pub seed: Option<u64>,
}

pub struct Reverb {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    mix: DryWet,
    convolver: Convolver,
    amount: f32,
}

impl Reverb {
    pub fn new(ctx: &Context, options: ReverbOptions) -> Result<Self> {
        let mix = DryWet::new(ctx)?;
        let buffer = match options.buffer {
            Some(buffer) => buffer,
            None => {
                let mut rng = match options.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Arc::new(impulse_response(ctx.sample_rate(), &mut rng))
            }
        };
        let convolver = Convolver::new(
            ctx,
            ConvolverOptions {
                buffer: Some(buffer),
                normalize: options.normalize,
            },
        )?;
        convolver.connect(&mix.wet);

        let mut reverb = Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "Reverb",
                vec![
                    Endpoint::Node(mix.dry.ports().clone()),
                    Endpoint::Node(convolver.ports().clone()),
                ],
                mix.outputs(),
            ),
            params: Params::new(),
            mix,
            convolver,
            amount: 0.0,
        };
        reverb.set_amount(options.amount, 0.0);
        Ok(reverb)
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_amount(&mut self, value: f32, time: f64) {
        self.amount = value;
        dry_wet_update(
            &*self.ctx,
            self.mix.dry.gain_param(),
            self.mix.wet.gain_param(),
            value,
            time,
        );
    }

    pub fn buffer(&self) -> Option<&Arc<AudioBuffer>> {
        self.convolver.buffer()
    }

    pub fn set_buffer(&mut self, buffer: Option<Arc<AudioBuffer>>) {
        self.convolver.set_buffer(buffer);
    }

    pub fn normalize(&self) -> bool {
        self.convolver.normalize()
    }

    pub fn set_normalize(&mut self, normalize: bool) {
        self.convolver.set_normalize(normalize);
    }
}

// ═══════════════════════════════════════════════════════════════════
// FeedbackDelay
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackDelayOptions {
    pub amount: f32,
    pub delay_time: f32,
    pub feedback: f32,
    /// Lowpass cutoff on the repeats.
    pub tone: f32,
}

impl Default for FeedbackDelayOptions {
    fn default() -> Self {
        Self {
            amount: 0.0,
            delay_time: 0.2,
            feedback: 0.6,
            tone: 4400.0,
        }
    }
}

fn tone_filter(ctx: &Context, tone: f32) -> Result<Filter> {
    Filter::new(
        ctx,
        FilterOptions {
            frequency: tone,
            ..Default::default()
        },
    )
}

/// Delay with a feedback loop. Repeats are darkened by the tone filter.
pub struct FeedbackDelay {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    mix: DryWet,
    delay: Delay,
    feedback: Gain,
    tone: Filter,
    amount: f32,
}

impl FeedbackDelay {
    pub fn new(ctx: &Context, options: FeedbackDelayOptions) -> Result<Self> {
        let mix = DryWet::new(ctx)?;
        let delay = Delay::new(
            ctx,
            DelayOptions {
                delay_time: options.delay_time,
            },
        )?;
        let feedback = Gain::new(
            ctx,
            GainOptions {
                gain: options.feedback,
            },
        )?;
        let tone = tone_filter(ctx, options.tone)?;

        delay.connect(&feedback);
        feedback.connect(&tone).connect(&delay);
        tone.connect(&mix.wet);

        let params = Params::new()
            .with("delay_time", delay.delay_time_param())
            .with("feedback", feedback.gain_param())
            .with("tone", tone.frequency_param());
        let mut node = Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "FeedbackDelay",
                vec![
                    Endpoint::Node(mix.dry.ports().clone()),
                    Endpoint::Node(delay.ports().clone()),
                ],
                mix.outputs(),
            ),
            params,
            mix,
            delay,
            feedback,
            tone,
            amount: 0.0,
        };
        node.set_amount(options.amount, 0.0);
        Ok(node)
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_amount(&mut self, value: f32, time: f64) {
        self.amount = value;
        dry_wet_update(
            &*self.ctx,
            self.mix.dry.gain_param(),
            self.mix.wet.gain_param(),
            value,
            time,
        );
    }

    pub fn delay_time(&self) -> f32 {
        self.delay.delay_time()
    }

    pub fn set_delay_time(&self, value: f32, time: f64) {
        self.delay.set_delay_time(value, time);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.gain()
    }

    pub fn set_feedback(&self, value: f32, time: f64) {
        self.feedback.set_gain(value, time);
    }

    pub fn tone(&self) -> f32 {
        self.tone.frequency()
    }

    pub fn set_tone(&self, value: f32, time: f64) {
        self.tone.set_frequency(value, time);
    }
}

// ═══════════════════════════════════════════════════════════════════
// PingPongDelay
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingPongDelayOptions {
    pub amount: f32,
    pub pre_delay_time: f32,
    pub left_delay_time: f32,
    pub right_delay_time: f32,
    pub left_feedback: f32,
    pub right_feedback: f32,
    pub tone: f32,
}

impl Default for PingPongDelayOptions {
    fn default() -> Self {
        Self {
            amount: 0.0,
            pre_delay_time: 0.2,
            left_delay_time: 0.2,
            right_delay_time: 0.2,
            left_feedback: 0.6,
            right_feedback: 0.6,
            tone: 4400.0,
        }
    }
}

/// Repeats alternate between the left and right channels.
///
/// The input feeds the left line directly and the right line through the
/// pre delay. Each line's feedback crosses over into the other.
pub struct PingPongDelay {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    mix: DryWet,
    pre_delay: Delay,
    left_delay: Delay,
    right_delay: Delay,
    left_feedback: Gain,
    right_feedback: Gain,
    merger: ChannelMerger,
    tone: Filter,
    amount: f32,
}

impl PingPongDelay {
    pub fn new(ctx: &Context, options: PingPongDelayOptions) -> Result<Self> {
        let mix = DryWet::new(ctx)?;
        let delay = |delay_time| Delay::new(ctx, DelayOptions { delay_time });
        let pre_delay = delay(options.pre_delay_time)?;
        let left_delay = delay(options.left_delay_time)?;
        let right_delay = delay(options.right_delay_time)?;
        let left_feedback = Gain::new(
            ctx,
            GainOptions {
                gain: options.left_feedback,
            },
        )?;
        let right_feedback = Gain::new(
            ctx,
            GainOptions {
                gain: options.right_feedback,
            },
        )?;
        let merger = ChannelMerger::new(ctx, ChannelOptions::default())?;
        let tone = tone_filter(ctx, options.tone)?;

        pre_delay.connect(&right_delay);
        left_delay.connect_with(&merger, 0, 0);
        right_delay.connect_with(&merger, 0, 1);
        left_delay.connect(&left_feedback);
        left_feedback.connect(&right_delay);
        right_delay.connect(&right_feedback);
        right_feedback.connect(&left_delay);
        merger.connect(&tone);
        tone.connect(&mix.wet);

        let params = Params::new()
            .with("pre_delay_time", pre_delay.delay_time_param())
            .with("left_delay_time", left_delay.delay_time_param())
            .with("right_delay_time", right_delay.delay_time_param())
            .with("left_feedback", left_feedback.gain_param())
            .with("right_feedback", right_feedback.gain_param())
            .with("tone", tone.frequency_param());
        let ports = Ports::new(
            "PingPongDelay",
            vec![
                Endpoint::Node(mix.dry.ports().clone()),
                Endpoint::Node(left_delay.ports().clone()),
                Endpoint::Node(pre_delay.ports().clone()),
            ],
            mix.outputs(),
        );

        let mut node = Self {
            ctx: ctx.clone(),
            ports,
            params,
            mix,
            pre_delay,
            left_delay,
            right_delay,
            left_feedback,
            right_feedback,
            merger,
            tone,
            amount: 0.0,
        };
        node.set_amount(options.amount, 0.0);
        Ok(node)
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn set_amount(&mut self, value: f32, time: f64) {
        self.amount = value;
        dry_wet_update(
            &*self.ctx,
            self.mix.dry.gain_param(),
            self.mix.wet.gain_param(),
            value,
            time,
        );
    }

    pub fn pre_delay_time(&self) -> f32 {
        self.pre_delay.delay_time()
    }

    pub fn set_pre_delay_time(&self, value: f32, time: f64) {
        self.pre_delay.set_delay_time(value, time);
    }

    pub fn left_delay_time(&self) -> f32 {
        self.left_delay.delay_time()
    }

    pub fn set_left_delay_time(&self, value: f32, time: f64) {
        self.left_delay.set_delay_time(value, time);
    }

    pub fn right_delay_time(&self) -> f32 {
        self.right_delay.delay_time()
    }

    pub fn set_right_delay_time(&self, value: f32, time: f64) {
        self.right_delay.set_delay_time(value, time);
    }

    pub fn left_feedback(&self) -> f32 {
        self.left_feedback.gain()
    }

    pub fn set_left_feedback(&self, value: f32, time: f64) {
        self.left_feedback.set_gain(value, time);
    }

    pub fn right_feedback(&self) -> f32 {
        self.right_feedback.gain()
    }

    pub fn set_right_feedback(&self, value: f32, time: f64) {
        self.right_feedback.set_gain(value, time);
    }

    pub fn tone(&self) -> f32 {
        self.tone.frequency()
    }

    pub fn set_tone(&self, value: f32, time: f64) {
        self.tone.set_frequency(value, time);
    }
}

impl_node!(Distortion, Reverb, FeedbackDelay, PingPongDelay);
