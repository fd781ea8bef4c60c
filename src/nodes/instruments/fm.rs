// Frequency-modulation instruments.

use std::sync::Arc;

use log::{debug, error};

use crate::context::{Context, FilterType, ParamId, Waveform};
use crate::error::{Error, Result};
use crate::node::{Node, Params, Ports, Source, impl_node};
use crate::note::Note;
use crate::nodes::envelope::{
    EnvelopeControl, EnvelopeOptions, EnvelopePhase, GainEnvelope, GainEnvelopeOptions,
};
use crate::nodes::oscillators::{Osc, OscOptions};
use crate::nodes::utility::{Limiter, LimiterOptions};

use super::algorithms::ALGORITHMS;
use super::mono::{MonoSynth, MonoSynthOptions};

// ═══════════════════════════════════════════════════════════════════
// FmSynth
// ═══════════════════════════════════════════════════════════════════

/// One of the four FM operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulator {
    A,
    B,
    C,
    D,
}

impl Modulator {
    pub const ALL: [Modulator; 4] = [Modulator::A, Modulator::B, Modulator::C, Modulator::D];

    fn index(self) -> usize {
        self as usize
    }
}

const MODULATOR_PARAMS: [[&str; 3]; 4] = [
    ["modulator_a_gain", "modulator_a_detune", "modulator_a_frequency"],
    ["modulator_b_gain", "modulator_b_detune", "modulator_b_frequency"],
    ["modulator_c_gain", "modulator_c_detune", "modulator_c_frequency"],
    ["modulator_d_gain", "modulator_d_detune", "modulator_d_frequency"],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmSynthOptions {
    /// Index into [`ALGORITHMS`].
    pub algorithm: usize,
    /// Operators A to D. `gain` is the modulation depth in Hz.
    pub modulators: [OscOptions; 4],
    pub gain_envelope: EnvelopeOptions,
}

impl Default for FmSynthOptions {
    fn default() -> Self {
        Self {
            algorithm: 0,
            modulators: [OscOptions {
                frequency: 440.0,
                gain: 440.0,
                ..Default::default()
            }; 4],
            gain_envelope: EnvelopeOptions {
                modifier: 0.75,
                ..Default::default()
            },
        }
    }
}

/// Four operators routed by a selectable algorithm into a limiter and a
/// gain envelope.
pub struct FmSynth {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    modulators: [Osc; 4],
    limiter: Limiter,
    gain_env: GainEnvelope,
    algorithm: usize,
    label: &'static str,
}

impl FmSynth {
    /// Fails with `InvalidAlgorithm` when `options.algorithm` is out of range.
    pub fn new(ctx: &Context, options: FmSynthOptions) -> Result<Self> {
        let [a, b, c, d] = options.modulators;
        let modulators = [
            Osc::new(ctx, a)?,
            Osc::new(ctx, b)?,
            Osc::new(ctx, c)?,
            Osc::new(ctx, d)?,
        ];
        let limiter = Limiter::new(ctx, LimiterOptions::default())?;
        let gain_env = GainEnvelope::new(
            ctx,
            GainEnvelopeOptions {
                envelope: options.gain_envelope,
                ..Default::default()
            },
        )?;
        limiter.connect(&gain_env);

        let params = modulators.iter().zip(MODULATOR_PARAMS).fold(
            Params::new(),
            |params, (osc, [gain, detune, frequency])| {
                let p = osc.params();
                params
                    .with_all(gain, p.get_all("gain").to_vec())
                    .with_all(detune, p.get_all("detune").to_vec())
                    .with_all(frequency, p.get_all("frequency").to_vec())
            },
        );

        let mut synth = Self {
            ctx: ctx.clone(),
            ports: Ports::new("FmSynth", Vec::new(), vec![Source::Node(gain_env.ports().clone())]),
            params,
            modulators,
            limiter,
            gain_env,
            algorithm: options.algorithm,
            label: "",
        };
        synth.try_set_algorithm(options.algorithm)?;
        Ok(synth)
    }

    /// Label of the active topology, e.g. `"A > B > C > D"`.
    pub fn algorithm(&self) -> &'static str {
        self.label
    }

    pub fn algorithm_index(&self) -> usize {
        self.algorithm
    }

    /// Rewires the operators. On an invalid index nothing changes.
    pub fn try_set_algorithm(&mut self, index: usize) -> Result<&'static str> {
        let algorithm = ALGORITHMS.get(index).ok_or(Error::InvalidAlgorithm {
            index,
            count: ALGORITHMS.len(),
        })?;
        let [a, b, c, d] = &self.modulators;
        self.label = algorithm(a, b, c, d, &self.limiter);
        self.algorithm = index;
        debug!("fm algorithm {index}: {}", self.label);
        Ok(self.label)
    }

    pub fn set_algorithm(&mut self, index: usize) {
        if let Err(err) = self.try_set_algorithm(index) {
            error!("FmSynth: {err}");
        }
    }

    pub fn modulator(&self, which: Modulator) -> &Osc {
        &self.modulators[which.index()]
    }

    /// For settings that need `&mut`, such as the waveform.
    pub fn modulator_mut(&mut self, which: Modulator) -> &mut Osc {
        &mut self.modulators[which.index()]
    }

    envelope_accessors! { gain_env;
        gain_attack, set_gain_attack => attack, set_attack: f64;
        gain_decay, set_gain_decay => decay, set_decay: f64;
        gain_sustain, set_gain_sustain => sustain, set_sustain: f32;
        gain_release, set_gain_release => release, set_release: f64;
        gain_amount, set_gain_amount => modifier, set_modifier: f32;
    }

    pub fn trigger_attack(&mut self) {
        self.gain_env.trigger_attack();
    }

    pub fn trigger_release(&mut self) {
        self.gain_env.trigger_release();
    }

    pub fn trigger_stop(&mut self) {
        self.gain_env.trigger_stop();
    }

    pub fn poll(&mut self) -> EnvelopePhase {
        self.gain_env.poll()
    }
}

// ═══════════════════════════════════════════════════════════════════
// SimpleFmSynth
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleFmSynthOptions {
    /// `gain` is the modulation depth in Hz.
    pub modulator: OscOptions,
    pub carrier: MonoSynthOptions,
}

impl Default for SimpleFmSynthOptions {
    fn default() -> Self {
        Self {
            modulator: OscOptions {
                frequency: 440.0,
                gain: 440.0,
                ..Default::default()
            },
            carrier: MonoSynthOptions::default(),
        }
    }
}

/// One oscillator modulating the pitch of a MonoSynth.
pub struct SimpleFmSynth {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    modulator: Osc,
    carrier: MonoSynth,
}

impl SimpleFmSynth {
    pub fn new(ctx: &Context, options: SimpleFmSynthOptions) -> Result<Self> {
        let modulator = Osc::new(ctx, options.modulator)?;
        let carrier = MonoSynth::new(ctx, options.carrier)?;
        modulator.connect(carrier.frequency_param());

        let m = modulator.params();
        let c = carrier.params();
        let params = Params::new()
            .with_all("modulator_depth", m.get_all("gain").to_vec())
            .with_all("modulator_detune", m.get_all("detune").to_vec())
            .with_all("modulator_frequency", m.get_all("frequency").to_vec())
            .with_all("carrier_detune", c.get_all("detune").to_vec())
            .with_all("carrier_frequency", c.get_all("frequency").to_vec())
            .with_all("carrier_gain", c.get_all("gain").to_vec())
            .with_all("carrier_filter_detune", c.get_all("filter_detune").to_vec())
            .with_all("carrier_filter_frequency", c.get_all("filter_frequency").to_vec())
            .with_all("carrier_filter_gain", c.get_all("filter_gain").to_vec())
            .with_all("carrier_filter_q", c.get_all("filter_q").to_vec());

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new(
                "SimpleFmSynth",
                Vec::new(),
                vec![Source::Node(carrier.ports().clone())],
            ),
            params,
            modulator,
            carrier,
        })
    }

    pub fn carrier(&self) -> &MonoSynth {
        &self.carrier
    }

    /// Envelope times and filter settings live on the carrier.
    pub fn carrier_mut(&mut self) -> &mut MonoSynth {
        &mut self.carrier
    }

    pub fn modulator_frequency(&self) -> f32 {
        self.modulator.frequency()
    }

    pub fn set_modulator_frequency(&self, value: f32, time: f64) {
        self.modulator.set_frequency(value, time);
    }

    pub fn modulator_detune(&self) -> f32 {
        self.modulator.detune()
    }

    pub fn set_modulator_detune(&self, value: f32, time: f64) {
        self.modulator.set_detune(value, time);
    }

    pub fn modulator_depth(&self) -> f32 {
        self.modulator.gain()
    }

    pub fn set_modulator_depth(&self, value: f32, time: f64) {
        self.modulator.set_gain(value, time);
    }

    pub fn modulator_waveform(&self) -> Waveform {
        self.modulator.waveform()
    }

    pub fn set_modulator_waveform(&mut self, waveform: Waveform) {
        self.modulator.set_waveform(waveform);
    }

    pub fn carrier_frequency(&self) -> f32 {
        self.carrier.frequency()
    }

    pub fn set_carrier_frequency(&self, value: f32, time: f64) {
        self.carrier.set_frequency(value, time);
    }

    pub fn carrier_detune(&self) -> f32 {
        self.carrier.detune()
    }

    pub fn set_carrier_detune(&self, value: f32, time: f64) {
        self.carrier.set_detune(value, time);
    }

    pub fn filter_type(&self) -> FilterType {
        self.carrier.filter_type()
    }

    pub fn frequency_param(&self) -> ParamId {
        self.carrier.frequency_param()
    }

    pub fn trigger_attack(&mut self, note: Note) {
        self.carrier.trigger_attack(note);
    }

    /// Releases when `note` is `None` or matches the note being held.
    pub fn trigger_release(&mut self, note: Option<Note>) {
        self.carrier.trigger_release(note);
    }

    pub fn trigger_stop(&mut self) {
        self.carrier.trigger_stop();
    }

    pub fn poll(&mut self) -> EnvelopePhase {
        self.carrier.poll()
    }
}

impl_node!(FmSynth, SimpleFmSynth);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, OfflineContext};

    fn setup() -> (Arc<OfflineContext>, Context) {
        let host = Arc::new(OfflineContext::default());
        let ctx: Context = host.clone();
        (host, ctx)
    }

    #[test]
    fn test_fm_defaults() {
        let (_host, ctx) = setup();
        let synth = FmSynth::new(&ctx, FmSynthOptions::default()).unwrap();

        assert_eq!(synth.algorithm(), "A > B > C > D");
        assert_eq!(synth.algorithm_index(), 0);
        assert_eq!(synth.gain_amount(), 0.75);
        for which in Modulator::ALL {
            assert_eq!(synth.modulator(which).frequency(), 440.0);
            assert_eq!(synth.modulator(which).gain(), 440.0);
        }
        assert_eq!(synth.params().len(), 12);
        assert_eq!(
            synth.params().get("modulator_c_frequency"),
            Some(synth.modulator(Modulator::C).frequency_param())
        );
    }

    #[test]
    fn test_limiter_feeds_envelope() {
        let (host, ctx) = setup();
        let synth = FmSynth::new(&ctx, FmSynthOptions::default()).unwrap();

        let limiter_out = synth.limiter.ports().output_units()[0];
        let env_in = synth.gain_env.ports().output_units()[0];
        assert!(host.is_connected(Connection::Unit {
            from: limiter_out,
            to: env_in,
            output: 0,
            input: 0,
        }));
        assert_eq!(synth.ports().output_units(), vec![env_in]);
    }

    #[test]
    fn test_invalid_algorithm_keeps_state() {
        let (host, ctx) = setup();
        let mut synth = FmSynth::new(
            &ctx,
            FmSynthOptions {
                algorithm: 7,
                ..Default::default()
            },
        )
        .unwrap();
        let before = host.connections();

        let err = synth.try_set_algorithm(19).unwrap_err();
        assert_eq!(err, Error::InvalidAlgorithm { index: 19, count: 19 });
        synth.set_algorithm(42);

        assert_eq!(synth.algorithm(), "[A > B] + [C > D]");
        assert_eq!(synth.algorithm_index(), 7);
        assert_eq!(host.connections(), before);
    }

    #[test]
    fn test_invalid_initial_algorithm() {
        let (_host, ctx) = setup();
        let result = FmSynth::new(
            &ctx,
            FmSynthOptions {
                algorithm: 30,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::InvalidAlgorithm { index: 30, .. })));
    }

    #[test]
    fn test_switch_algorithm() {
        let (host, ctx) = setup();
        let mut synth = FmSynth::new(&ctx, FmSynthOptions::default()).unwrap();

        assert_eq!(synth.try_set_algorithm(11), Ok("[A > A] > B > C > D"));
        let a = synth.modulator(Modulator::A);
        assert!(host.is_connected(Connection::Param {
            from: a.output_unit(),
            param: a.frequency_param(),
            output: 0,
        }));
    }

    #[test]
    fn test_modulator_mut() {
        let (_host, ctx) = setup();
        let mut synth = FmSynth::new(&ctx, FmSynthOptions::default()).unwrap();

        synth.modulator_mut(Modulator::B).set_waveform(Waveform::Square);
        synth.modulator(Modulator::B).set_gain(100.0, 0.0);
        assert_eq!(synth.modulator(Modulator::B).waveform(), Waveform::Square);
        assert_eq!(synth.modulator(Modulator::B).gain(), 100.0);
        assert_eq!(synth.modulator(Modulator::A).waveform(), Waveform::Sine);
    }

    #[test]
    fn test_simple_fm_wiring() {
        let (host, ctx) = setup();
        let synth = SimpleFmSynth::new(&ctx, SimpleFmSynthOptions::default()).unwrap();

        assert!(host.is_connected(Connection::Param {
            from: synth.modulator.output_unit(),
            param: synth.frequency_param(),
            output: 0,
        }));
        assert_eq!(synth.modulator_depth(), 440.0);
        assert_eq!(synth.carrier().gain_amount(), 0.75);
        assert_eq!(synth.params().len(), 10);
        assert_eq!(
            synth.params().get("carrier_frequency"),
            Some(synth.frequency_param())
        );
    }

    #[test]
    fn test_simple_fm_notes() {
        let (_host, ctx) = setup();
        let mut synth = SimpleFmSynth::new(&ctx, SimpleFmSynthOptions::default()).unwrap();
        let c4: Note = "C4".parse().unwrap();

        synth.carrier_mut().set_gain_release(0.3);
        synth.trigger_attack(c4);
        assert_eq!(synth.carrier().current_note(), Some(c4));

        synth.trigger_release(Some("D4".parse().unwrap()));
        assert_eq!(synth.carrier().current_note(), Some(c4));

        synth.trigger_release(None);
        assert_eq!(synth.poll(), EnvelopePhase::Release);
        assert!(synth.carrier().is_idle());
    }
}
