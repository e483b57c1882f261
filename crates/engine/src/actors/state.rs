/// Current state plus ticks spent in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMachine<S> {
    current: S,
    time_in_state: u32,
}

impl<S: Copy + PartialEq> StateMachine<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: initial,
            time_in_state: 0,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn is(&self, state: S) -> bool {
        self.current == state
    }

    pub fn time_in_state(&self) -> u32 {
        self.time_in_state
    }

    /// Re-entering the current state also restarts its timer.
    pub fn transition(&mut self, next: S) {
        self.current = next;
        self.time_in_state = 0;
    }

    pub fn tick(&mut self) {
        self.time_in_state = self.time_in_state.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
    }

    #[test]
    fn tick_counts_time_in_state() {
        let mut machine = StateMachine::new(Light::Red);
        machine.tick();
        machine.tick();

        assert!(machine.is(Light::Red));
        assert_eq!(machine.time_in_state(), 2);
    }

    #[test]
    fn transition_resets_timer_even_for_same_state() {
        let mut machine = StateMachine::new(Light::Red);
        machine.tick();
        machine.transition(Light::Green);
        assert_eq!(machine.current(), Light::Green);
        assert_eq!(machine.time_in_state(), 0);

        machine.tick();
        machine.transition(Light::Green);
        assert_eq!(machine.time_in_state(), 0);
    }
}
