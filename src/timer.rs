use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn duration_secs(&self) -> u32 {
        match self {
            TimerMode::Focus => 25 * 60,
            TimerMode::ShortBreak => 5 * 60,
            TimerMode::LongBreak => 15 * 60,
        }
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_secs() / 60
    }
}

/// Commands accepted by `POST /timer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TimerAction {
    Toggle,
    Reset,
    ChangeMode { mode: TimerMode },
    Tick {
        #[serde(rename = "elapsedSecs")]
        elapsed_secs: u32,
    },
}

/// Countdown for one Pomodoro block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    mode: TimerMode,
    remaining_secs: u32,
    active: bool,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(TimerMode::Focus)
    }
}

impl FocusTimer {
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            remaining_secs: mode.duration_secs(),
            active: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) {
        if self.remaining_secs > 0 {
            self.active = !self.active;
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.remaining_secs = self.mode.duration_secs();
    }

    pub fn change_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.reset();
    }

    /// Percentage of the block already elapsed.
    pub fn progress(&self) -> f64 {
        let total = f64::from(self.mode.duration_secs());
        (total - f64::from(self.remaining_secs)) / total * 100.0
    }

    /// `MM:SS` of the remaining time.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// Advances an active timer. Returns the focus minutes to log when a
    /// focus block runs out; the timer stops at zero in every mode.
    pub fn tick(&mut self, elapsed_secs: u32) -> Option<u32> {
        if !self.active {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed_secs);
        if self.remaining_secs > 0 {
            return None;
        }
        self.active = false;
        (self.mode == TimerMode::Focus).then(|| self.mode.duration_minutes())
    }
}
