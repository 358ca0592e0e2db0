//! Actuator control state and its transition rules.
//!
//! Pure data: no I/O, no locking. [`StepperController`](super::StepperController)
//! wraps it in a critical-section mutex and publishes what each transition
//! reports.
//!
//! A cycle emits exactly `count` steps. `current_step` counts the steps
//! already emitted, so the cycle is exhausted once `current_step >= count`.

/// Outcome of one control-loop tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running.
    Idle,
    /// `emitted` is the level before this tick's advance. `finished` is set
    /// when this step exhausted the cycle and `run` was cleared.
    Stepped { emitted: i16, finished: bool },
    /// `run` was set on an exhausted cycle and has been cleared.
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepperState {
    pub state: i16,
    pub step: i16,
    pub count: i16,
    pub current_step: i16,
    pub run: bool,
    pub reset_counter: i16,
}

impl StepperState {
    pub const fn new(state: i16, step: i16, count: i16) -> Self {
        Self {
            state,
            step,
            count,
            current_step: 0,
            run: false,
            reset_counter: 0,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.current_step >= self.count
    }

    pub fn set_step(&mut self, v: i16) {
        self.step = v;
    }

    pub fn set_count(&mut self, v: i16) {
        self.count = v;
    }

    /// Apply a run request. Returns `true` when `run` changed.
    ///
    /// | current | requested | effect                                   |
    /// |---------|-----------|------------------------------------------|
    /// | off     | off       | none                                     |
    /// | off     | on        | start; an exhausted cycle restarts at 0  |
    /// | on      | off       | stop                                     |
    /// | on      | on        | none                                     |
    ///
    /// A start is refused while `count <= 0`: there is no step to emit.
    pub fn set_run(&mut self, requested: bool) -> bool {
        match (self.run, requested) {
            (false, true) => {
                if self.count <= 0 {
                    return false;
                }
                if self.exhausted() {
                    self.current_step = 0;
                }
                self.run = true;
                true
            }
            (true, false) => {
                self.run = false;
                true
            }
            _ => false,
        }
    }

    /// Apply a reset request. Only a counter above the last recognised one
    /// counts; returns `true` when the reset was applied.
    pub fn set_reset(&mut self, v: i16) -> bool {
        if v <= self.reset_counter {
            return false;
        }
        self.reset_counter = self.reset_counter.saturating_add(1);
        self.current_step = 0;
        true
    }

    pub fn tick(&mut self) -> Tick {
        if !self.run {
            return Tick::Idle;
        }
        if self.exhausted() {
            self.run = false;
            return Tick::Halted;
        }

        let emitted = self.state;
        self.state = self.state.saturating_add(self.step);
        self.current_step += 1;

        let finished = self.exhausted();
        if finished {
            self.run = false;
        }
        Tick::Stepped { emitted, finished }
    }
}
