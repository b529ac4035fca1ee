use crate::framerenderer::Rgb;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Waiting,
    Running,
    Notifying,
}

/// Top-level animation mode and its timers.
///
/// `notify_ticks_remaining` is non-zero exactly while the mode is `Notifying`.
#[derive(Clone, Debug)]
pub struct AnimationState {
    mode: Mode,
    notify_color: Rgb,
    notify_ticks_remaining: u32,
    wait_phase: bool,
}

impl AnimationState {
    pub fn new() -> AnimationState {
        AnimationState {
            mode: Mode::Waiting,
            notify_color: Rgb::new(0, 0, 0),
            notify_ticks_remaining: 0,
            wait_phase: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn notify_color(&self) -> Rgb {
        self.notify_color
    }

    pub fn notify_ticks_remaining(&self) -> u32 {
        self.notify_ticks_remaining
    }

    pub fn wait_phase(&self) -> bool {
        self.wait_phase
    }

    pub(crate) fn toggle_wait_phase(&mut self) {
        self.wait_phase = !self.wait_phase;
    }

    pub fn reset(&mut self) {
        self.mode = Mode::Waiting;
        self.notify_color = Rgb::new(0, 0, 0);
        self.notify_ticks_remaining = 0;
    }

    /// A build started. Cuts a running notification short.
    pub fn start_running(&mut self) {
        self.mode = Mode::Running;
        self.notify_ticks_remaining = 0;
    }

    /// Holds `color` on the whole strip for `hold_ticks` ticks.
    pub fn notify(&mut self, color: Rgb, hold_ticks: u32) {
        if hold_ticks == 0 {
            return;
        }

        self.mode = Mode::Notifying;
        self.notify_color = color;
        self.notify_ticks_remaining = hold_ticks;
    }

    /// Autonomous transition at the end of each tick.
    pub fn tick(&mut self, registry_empty: bool) {
        if self.mode == Mode::Notifying {
            self.notify_ticks_remaining = self.notify_ticks_remaining.saturating_sub(1);
            if self.notify_ticks_remaining > 0 {
                return;
            }
        }

        self.mode = if registry_empty {
            Mode::Waiting
        } else {
            Mode::Running
        };
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_waiting() {
        let state = AnimationState::new();
        assert_eq!(state.mode(), Mode::Waiting);
        assert_eq!(state.notify_ticks_remaining(), 0);
    }

    #[test]
    fn idle_modes_follow_registry() {
        let mut state = AnimationState::new();
        state.tick(false);
        assert_eq!(state.mode(), Mode::Running);
        state.tick(true);
        assert_eq!(state.mode(), Mode::Waiting);
    }

    #[test]
    fn notification_counts_down() {
        let red = Rgb::new(255, 0, 0);
        let mut state = AnimationState::new();
        state.notify(red, 3);
        assert_eq!(state.mode(), Mode::Notifying);

        state.tick(false);
        state.tick(false);
        assert_eq!(state.mode(), Mode::Notifying);
        assert_eq!(state.notify_color(), red);
        assert_eq!(state.notify_ticks_remaining(), 1);

        state.tick(false);
        assert_eq!(state.mode(), Mode::Running);
        assert_eq!(state.notify_ticks_remaining(), 0);
    }

    #[test]
    fn notification_falls_back_to_waiting() {
        let mut state = AnimationState::new();
        state.notify(Rgb::new(0, 255, 0), 1);
        state.tick(true);
        assert_eq!(state.mode(), Mode::Waiting);
    }

    #[test]
    fn start_running_cancels_hold() {
        let mut state = AnimationState::new();
        state.notify(Rgb::new(0, 255, 0), 5);
        state.start_running();
        assert_eq!(state.mode(), Mode::Running);
        assert_eq!(state.notify_ticks_remaining(), 0);
    }

    #[test]
    fn reset_cancels_hold() {
        let mut state = AnimationState::new();
        state.notify(Rgb::new(0, 255, 0), 5);
        state.reset();
        assert_eq!(state.mode(), Mode::Waiting);
        assert_eq!(state.notify_ticks_remaining(), 0);
    }
}
