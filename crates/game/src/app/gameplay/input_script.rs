/// Keyboard stand-in for the headless run: holds right forever, hopping and
/// firing wind on a fixed rhythm.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Autopilot;

impl InputSource for Autopilot {
    fn poll(&mut self, tick: u64) -> Option<HeldKeys> {
        Some(autopilot_keys(tick))
    }
}

fn autopilot_keys(tick: u64) -> HeldKeys {
    let mut held = HeldKeys::default().with(Key::Right);
    if tick % AUTOPILOT_JUMP_PERIOD_TICKS < AUTOPILOT_JUMP_HOLD_TICKS {
        held.set(Key::Jump, true);
    }
    if tick % AUTOPILOT_FIRE_PERIOD_TICKS == 0 {
        held.set(Key::Action, true);
    }
    held
}
