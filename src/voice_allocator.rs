// src/voice_allocator.rs

use log::debug;

/// Picks which voice of a fixed pool plays the next note.
///
/// Responsibilities:
/// - round-robin over the first `polyphony` voices
/// - prefer an idle voice, steal the cursor's voice when none is idle
///
/// Does NOT:
/// - own the voices
/// - track which note each voice plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceAllocator {
    pool: usize,
    polyphony: usize,
    cursor: usize,
}

impl VoiceAllocator {
    pub fn new(pool: usize) -> Self {
        let pool = pool.max(1);
        Self {
            pool,
            polyphony: pool,
            cursor: 0,
        }
    }

    pub fn pool(&self) -> usize {
        self.pool
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    /// Clamps to `1..=pool`. The cursor is wrapped into the new range.
    pub fn set_polyphony(&mut self, polyphony: usize) {
        self.polyphony = polyphony.clamp(1, self.pool);
        self.cursor %= self.polyphony;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.polyphony;
    }

    /// Select a voice for a note-on and move the cursor past it.
    ///
    /// Starting at the cursor, the first idle voice wins. After a full cycle
    /// with every voice busy, the voice at the starting cursor is stolen.
    pub fn allocate(&mut self, is_idle: impl Fn(usize) -> bool) -> usize {
        let start = self.cursor;
        if !is_idle(start) {
            self.advance();
            while self.cursor != start && !is_idle(self.cursor) {
                self.advance();
            }
            if self.cursor == start {
                debug!("all {} voices busy, stealing voice {start}", self.polyphony);
            }
        }

        let voice = self.cursor;
        self.advance();
        voice
    }
}
