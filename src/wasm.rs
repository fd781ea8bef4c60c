//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! ```javascript
//! import init, { blip_init, note_frequency, fm_algorithm_count } from './blip.js';
//!
//! await init();
//! blip_init();
//!
//! note_frequency("A4");      // 440
//! fm_algorithm_count();      // 19
//! ```

use wasm_bindgen::prelude::*;

use crate::nodes::ALGORITHMS;
use crate::note::Note;

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn blip_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Frequency in Hz of a note name such as `"F#2"`, or `undefined`.
#[wasm_bindgen]
pub fn note_frequency(name: &str) -> Option<f32> {
    match name.parse::<Note>() {
        Ok(note) => Some(note.frequency()),
        Err(err) => {
            log::warn!("{err}");
            None
        }
    }
}

/// MIDI number of a note name, or `undefined`.
#[wasm_bindgen]
pub fn note_midi(name: &str) -> Option<u8> {
    name.parse::<Note>().ok().map(|note| note.midi())
}

/// Number of FM algorithms.
#[wasm_bindgen]
pub fn fm_algorithm_count() -> usize {
    ALGORITHMS.len()
}
