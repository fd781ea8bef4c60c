// Eight MonoSynth voices behind a limiter.

use std::sync::Arc;

use log::debug;

use crate::context::{Context, FilterType, ParamId, Waveform};
use crate::error::Result;
use crate::node::{Node, Params, Ports, Source, impl_node};
use crate::note::Note;
use crate::nodes::envelope::EnvelopeOptions;
use crate::nodes::utility::{Limiter, LimiterOptions};
use crate::voice_allocator::VoiceAllocator;

use super::mono::{MonoSynth, MonoSynthOptions};

/// Physical size of the voice pool.
pub const VOICE_COUNT: usize = 8;

const PARAM_NAMES: [&str; 7] = [
    "detune",
    "frequency",
    "gain",
    "filter_detune",
    "filter_frequency",
    "filter_gain",
    "filter_q",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolySynthOptions {
    /// Voices eligible for allocation, clamped to 1..=8.
    pub polyphony: usize,
    /// Applied to every voice.
    pub voice: MonoSynthOptions,
}

impl Default for PolySynthOptions {
    fn default() -> Self {
        Self {
            polyphony: VOICE_COUNT,
            voice: MonoSynthOptions {
                gain_envelope: EnvelopeOptions {
                    modifier: 0.15,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

/// Forward time-aware parameter setters to every voice. Getters read voice 0.
macro_rules! voice_params {
    ($($get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self) -> f32 {
                self.voices[0].$get()
            }

            pub fn $set(&self, value: f32, time: f64) {
                for voice in &self.voices {
                    voice.$set(value, time);
                }
            }
        )*
    };
}

/// Forward plain settings to every voice. Getters read voice 0.
macro_rules! voice_settings {
    ($($get:ident, $set:ident: $ty:ty;)*) => {
        $(
            pub fn $get(&self) -> $ty {
                self.voices[0].$get()
            }

            pub fn $set(&mut self, value: $ty) {
                for voice in &mut self.voices {
                    voice.$set(value);
                }
            }
        )*
    };
}

/// Polyphonic synth over a fixed pool of MonoSynths.
///
/// Notes are handed out round-robin over the first `polyphony` voices. When
/// all of them are busy the voice at the cursor is retriggered.
pub struct PolySynth {
    ctx: Context,
    ports: Arc<Ports>,
    params: Params,
    voices: Vec<MonoSynth>,
    limiter: Limiter,
    allocator: VoiceAllocator,
}

impl PolySynth {
    pub fn new(ctx: &Context, options: PolySynthOptions) -> Result<Self> {
        let limiter = Limiter::new(ctx, LimiterOptions::default())?;
        let voices = (0..VOICE_COUNT)
            .map(|_| MonoSynth::new(ctx, options.voice))
            .collect::<Result<Vec<_>>>()?;
        for voice in &voices {
            voice.connect(&limiter);
        }

        let params = PARAM_NAMES.iter().fold(Params::new(), |params, &name| {
            let handles: Vec<ParamId> = voices
                .iter()
                .flat_map(|voice| voice.params().get_all(name).iter().copied())
                .collect();
            params.with_all(name, handles)
        });

        let mut allocator = VoiceAllocator::new(VOICE_COUNT);
        allocator.set_polyphony(options.polyphony);

        Ok(Self {
            ctx: ctx.clone(),
            ports: Ports::new("PolySynth", Vec::new(), vec![Source::Node(limiter.ports().clone())]),
            params,
            voices,
            limiter,
            allocator,
        })
    }

    pub fn polyphony(&self) -> usize {
        self.allocator.polyphony()
    }

    pub fn set_polyphony(&mut self, polyphony: usize) {
        self.allocator.set_polyphony(polyphony);
    }

    pub fn voices(&self) -> &[MonoSynth] {
        &self.voices
    }

    /// Notes currently held, by voice.
    pub fn active_notes(&self) -> Vec<(usize, Note)> {
        self.voices
            .iter()
            .enumerate()
            .filter_map(|(i, voice)| voice.current_note().map(|note| (i, note)))
            .collect()
    }

    voice_settings! {
        waveform, set_waveform: Waveform;
        filter_type, set_filter_type: FilterType;
        gain_attack, set_gain_attack: f64;
        gain_decay, set_gain_decay: f64;
        gain_sustain, set_gain_sustain: f32;
        gain_release, set_gain_release: f64;
        gain_amount, set_gain_amount: f32;
        filter_attack, set_filter_attack: f64;
        filter_decay, set_filter_decay: f64;
        filter_sustain, set_filter_sustain: f32;
        filter_release, set_filter_release: f64;
        filter_amount, set_filter_amount: f32;
    }

    voice_params! {
        detune, set_detune;
        filter_frequency, set_filter_frequency;
        filter_detune, set_filter_detune;
        filter_q, set_filter_q;
        filter_gain, set_filter_gain;
    }

    pub fn trigger_attack(&mut self, note: Note) {
        let voices = &self.voices;
        let index = self.allocator.allocate(|i| voices[i].is_idle());
        debug!("{note} -> voice {index}");
        self.voices[index].trigger_attack(note);
    }

    pub fn trigger_attack_all(&mut self, notes: &[Note]) {
        for &note in notes {
            self.trigger_attack(note);
        }
    }

    /// With `None` every voice releases. With a note, only voices holding it.
    pub fn trigger_release(&mut self, note: Option<Note>) {
        for voice in &mut self.voices {
            voice.trigger_release(note);
        }
    }

    pub fn trigger_release_all(&mut self, notes: &[Note]) {
        for &note in notes {
            self.trigger_release(Some(note));
        }
    }

    /// Stops the voices holding `note`. `None` matches no voice, so nothing
    /// stops; use `trigger_stop_all` or `trigger_release(None)` instead.
    pub fn trigger_stop(&mut self, note: Option<Note>) {
        let Some(note) = note else {
            return;
        };
        for voice in &mut self.voices {
            if voice.current_note() == Some(note) {
                voice.trigger_stop();
            }
        }
    }

    pub fn trigger_stop_all(&mut self, notes: &[Note]) {
        for &note in notes {
            self.trigger_stop(Some(note));
        }
    }

    /// Advances every voice's envelopes.
    pub fn poll(&mut self) {
        for voice in &mut self.voices {
            voice.poll();
        }
    }
}

impl_node!(PolySynth);
