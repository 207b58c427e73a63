use std::sync::{Arc, Mutex};

use serde::{Serialize, Deserialize};

/// Player settings that outlive a single game.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub high_score: u32,
    pub sound_enabled: bool,
    pub tutorial_shown: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            high_score: 0,
            sound_enabled: true,
            tutorial_shown: false,
        }
    }
}

impl Preferences {
    /// Raises the stored high score if `score` beats it. Returns true when it changed.
    pub fn record_score(&mut self, score: u32) -> bool {
        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    /// Marks the tutorial as seen. Returns true only the first time, when it should be shown.
    pub fn mark_tutorial_shown(&mut self) -> bool {
        let first_time = !self.tutorial_shown;
        self.tutorial_shown = true;
        first_time
    }
}

/// Key-value persistence for [`Preferences`].
pub trait PreferenceStore {
    fn load(&self) -> Preferences;
    /// Read-modify-write that no other writer can interleave with.
    fn update<T>(&self, f: impl FnOnce(&mut Preferences) -> T) -> T;
}

/// Process-local store. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    inner: Arc<Mutex<Preferences>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Preferences {
        match self.inner.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn update<T>(&self, f: impl FnOnce(&mut Preferences) -> T) -> T {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}
