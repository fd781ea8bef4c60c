// Single-voice subtractive synth.

use std::sync::Arc;

use crate::context::{Context, FilterType, ParamId, Waveform};
use crate::error::Result;
use crate::node::{Node, Params, Ports, Source, impl_node};
use crate::note::Note;

use crate::nodes::envelope::{
    EnvelopeControl, EnvelopeOptions, EnvelopePhase, FilterEnvelope, FilterEnvelopeOptions,
    GainEnvelope, GainEnvelopeOptions,
};
use crate::nodes::filters::FilterOptions;
use crate::nodes::oscillators::{Oscillator, OscillatorOptions};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonoSynthOptions {
    pub detune: f32,
    pub frequency: f32,
    pub waveform: Waveform,
    /// Amplitude envelope. `modifier` is the gain amount.
    pub gain_envelope: EnvelopeOptions,
    pub filter: FilterOptions,
    /// Cutoff envelope. `modifier` is the sweep in Hz added to the cutoff.
    pub filter_envelope: EnvelopeOptions,
}

impl Default for MonoSynthOptions {
    fn default() -> Self {
        Self {
            detune: 0.0,
            frequency: 440.0,
            waveform: Waveform::Sine,
            gain_envelope: EnvelopeOptions {
                modifier: 0.75,
                ..Default::default()
            },
            filter: FilterOptions {
                frequency: 2000.0,
                ..Default::default()
            },
            filter_envelope: EnvelopeOptions {
                modifier: 6000.0,
                ..Default::default()
            },
        }
    }
}

/// Oscillator into a gain envelope into a filter envelope.
///
/// Remembers the note it plays so a release for another note is ignored.
pub struct MonoSynth {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    oscillator: Oscillator,
    gain_env: GainEnvelope,
    filter_env: FilterEnvelope,
    current_note: Option<Note>,
}

impl MonoSynth {
    pub fn new(ctx: &Context, options: MonoSynthOptions) -> Result<Self> {
        let oscillator = Oscillator::new(
            ctx,
            OscillatorOptions {
                detune: options.detune,
                frequency: options.frequency,
                start: true,
                waveform: options.waveform,
            },
        )?;
        let gain_env = GainEnvelope::new(
            ctx,
            GainEnvelopeOptions {
                envelope: options.gain_envelope,
                ..Default::default()
            },
        )?;
        let filter_env = FilterEnvelope::new(
            ctx,
            FilterEnvelopeOptions {
                filter: options.filter,
                envelope: options.filter_envelope,
            },
        )?;
        oscillator.connect(&gain_env);
        gain_env.connect(&filter_env);

        let osc_params = oscillator.params();
        let filter_params = filter_env.params();
        let params = Params::new()
            .with_all("detune", osc_params.get_all("detune").to_vec())
            .with_all("frequency", osc_params.get_all("frequency").to_vec())
            .with_all("gain", gain_env.params().get_all("gain").to_vec())
            .with_all("filter_detune", filter_params.get_all("detune").to_vec())
            .with_all("filter_frequency", filter_params.get_all("frequency").to_vec())
            .with_all("filter_gain", filter_params.get_all("gain").to_vec())
            .with_all("filter_q", filter_params.get_all("q").to_vec());
        let ports = Ports::new(
            "MonoSynth",
            Vec::new(),
            vec![Source::Node(filter_env.ports().clone())],
        );

        Ok(Self {
            ctx: ctx.clone(),
            ports,
            params,
            oscillator,
            gain_env,
            filter_env,
            current_note: None,
        })
    }

    /// The note being held, `None` once released or stopped.
    pub fn current_note(&self) -> Option<Note> {
        self.current_note
    }

    pub fn is_idle(&self) -> bool {
        self.current_note.is_none()
    }

    pub fn frequency_param(&self) -> ParamId {
        self.oscillator.frequency_param()
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.oscillator.set_waveform(waveform);
    }

    pub fn frequency(&self) -> f32 {
        self.oscillator.frequency()
    }

    pub fn set_frequency(&self, value: f32, time: f64) {
        self.oscillator.set_frequency(value, time);
    }

    pub fn detune(&self) -> f32 {
        self.oscillator.detune()
    }

    pub fn set_detune(&self, value: f32, time: f64) {
        self.oscillator.set_detune(value, time);
    }

    envelope_accessors! { gain_env;
        gain_attack, set_gain_attack => attack, set_attack: f64;
        gain_decay, set_gain_decay => decay, set_decay: f64;
        gain_sustain, set_gain_sustain => sustain, set_sustain: f32;
        gain_release, set_gain_release => release, set_release: f64;
        gain_amount, set_gain_amount => modifier, set_modifier: f32;
    }

    envelope_accessors! { filter_env;
        filter_attack, set_filter_attack => attack, set_attack: f64;
        filter_decay, set_filter_decay => decay, set_decay: f64;
        filter_sustain, set_filter_sustain => sustain, set_sustain: f32;
        filter_release, set_filter_release => release, set_release: f64;
        filter_amount, set_filter_amount => modifier, set_modifier: f32;
    }

    pub fn filter_frequency(&self) -> f32 {
        self.filter_env.frequency()
    }

    pub fn set_filter_frequency(&self, value: f32, time: f64) {
        self.filter_env.set_frequency(value, time);
    }

    pub fn filter_q(&self) -> f32 {
        self.filter_env.q()
    }

    pub fn set_filter_q(&self, value: f32, time: f64) {
        self.filter_env.set_q(value, time);
    }

    pub fn filter_detune(&self) -> f32 {
        self.filter_env.detune()
    }

    pub fn set_filter_detune(&self, value: f32, time: f64) {
        self.filter_env.set_detune(value, time);
    }

    pub fn filter_gain(&self) -> f32 {
        self.filter_env.gain()
    }

    pub fn set_filter_gain(&self, value: f32, time: f64) {
        self.filter_env.set_gain(value, time);
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_env.filter_type()
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_env.set_filter_type(filter_type);
    }

    pub fn trigger_attack(&mut self, note: Note) {
        self.current_note = Some(note);
        self.oscillator.set_frequency(note.frequency(), 0.0);
        self.gain_env.trigger_attack();
        self.filter_env.trigger_attack();
    }

    /// Releases when `note` is `None` or matches the note being held.
    pub fn trigger_release(&mut self, note: Option<Note>) {
        if note.is_some() && note != self.current_note {
            return;
        }
        self.gain_env.trigger_release();
        self.filter_env.trigger_release();
        self.current_note = None;
    }

    pub fn trigger_stop(&mut self) {
        self.gain_env.trigger_stop();
        self.filter_env.trigger_stop();
        self.current_note = None;
    }

    /// Advances both envelopes and returns the amplitude phase.
    pub fn poll(&mut self) -> EnvelopePhase {
        self.filter_env.poll();
        self.gain_env.poll()
    }
}

impl_node!(MonoSynth);
