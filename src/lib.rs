// src/lib.rs
//
// Library entry point: composite synth and effect nodes over a host graph
// engine.

pub mod audio_buffer;
pub mod context;
pub mod error;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod note;
pub mod parameter;
pub mod scheduler;
pub mod update;
pub mod voice_allocator;

#[cfg(feature = "ios")]
pub mod ffi;

#[cfg(feature = "web")]
pub mod wasm;

// Re-export key types for Rust consumers
pub use audio_buffer::AudioBuffer;
pub use context::{
    AudioContext, Context, FilterType, Oversample, ParamId, UnitId, UnitKind, UnitSetting,
    Waveform, get_context, resume, set_context,
};
pub use error::{Error, Result, RouteError};
pub use graph::{Connection, OfflineContext};
pub use node::{Destination, Endpoint, Node, Params, Ports, Source, Target, chain};
pub use note::{Note, PitchClass};
pub use parameter::{Automation, ParamTimeline};
