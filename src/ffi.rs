// C-compatible FFI bindings for Swift/iOS integration.
//
// Safety requirements:
// - String parameters must be valid, NUL-terminated UTF-8
// - Pointers may be null; null inputs are reported as invalid
// - Functions taking pointers are `unsafe`; callers uphold the above

use std::ffi::{CStr, c_char};

use log::{LevelFilter, warn};
use oslog::OsLogger;

use crate::nodes::ALGORITHMS;
use crate::note::Note;

// Logger subsystem identifier
const LOG_SUBSYSTEM: &str = "com.blip.engine";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at application startup. Output appears in Console.app and
/// Xcode's debug console.
#[unsafe(no_mangle)]
pub extern "C" fn blip_init_logger() {
    OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Notes
// ═══════════════════════════════════════════════════════════════════════════

/// # Safety
/// `name` must be null or point to a valid NUL-terminated string.
unsafe fn parse_note(name: *const c_char) -> Option<Note> {
    if name.is_null() {
        warn!("null note name");
        return None;
    }
    let name = unsafe { CStr::from_ptr(name) };
    match name.to_str().map(str::parse::<Note>) {
        Ok(Ok(note)) => Some(note),
        Ok(Err(err)) => {
            warn!("{err}");
            None
        }
        Err(_) => {
            warn!("note name is not valid UTF-8");
            None
        }
    }
}

/// Frequency in Hz of a note name such as `"C#4"`. Returns `-1.0` when the
/// name does not parse.
///
/// # Safety
/// `name` must be null or point to a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn blip_note_frequency(name: *const c_char) -> f32 {
    unsafe { parse_note(name) }.map_or(-1.0, |note| note.frequency())
}

/// MIDI number of a note name. Returns `-1` when the name does not parse.
///
/// # Safety
/// `name` must be null or point to a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn blip_note_midi(name: *const c_char) -> i32 {
    unsafe { parse_note(name) }.map_or(-1, |note| i32::from(note.midi()))
}

/// Number of FM algorithms accepted by `FmSynth::set_algorithm`.
#[unsafe(no_mangle)]
pub extern "C" fn blip_fm_algorithm_count() -> u32 {
    ALGORITHMS.len() as u32
}
