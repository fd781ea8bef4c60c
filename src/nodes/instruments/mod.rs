// Playable instruments built from oscillators and envelopes.

/// Getter/setter pairs forwarding to one field of an envelope owned by
/// `self.$env`.
macro_rules! envelope_accessors {
    ($env:ident; $($get:ident, $set:ident => $inner_get:ident, $inner_set:ident: $ty:ty;)*) => {
        $(
            pub fn $get(&self) -> $ty {
                self.$env.envelope().$inner_get()
            }

            pub fn $set(&mut self, value: $ty) {
                self.$env.envelope_mut().$inner_set(value);
            }
        )*
    };
}

mod algorithms;
mod fm;
mod mono;
mod poly;

pub use algorithms::{ALGORITHMS, Algorithm};
pub use fm::{FmSynth, FmSynthOptions, Modulator, SimpleFmSynth, SimpleFmSynthOptions};
pub use mono::{MonoSynth, MonoSynthOptions};
pub use poly::{PolySynth, PolySynthOptions, VOICE_COUNT};
