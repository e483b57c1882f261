#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Down,
    Jump,
    Action,
}

const KEY_COUNT: usize = 5;

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::Left,
        Key::Right,
        Key::Down,
        Key::Jump,
        Key::Action,
    ];

    const fn index(self) -> usize {
        match self {
            Key::Left => 0,
            Key::Right => 1,
            Key::Down => 2,
            Key::Jump => 3,
            Key::Action => 4,
        }
    }
}

/// Read-only view of the keyboard that entities consume.
pub trait InputQuery {
    /// Signed hold counter: `n > 0` while held for `n` ticks, `-n` while
    /// released for `n` ticks, `0` before the key was ever seen.
    fn get_key(&self, key: Key) -> i32;

    fn is_key_down(&self, key: Key) -> bool {
        self.get_key(key) > 0
    }

    /// True only on the first tick after the key went down.
    fn is_key_pressed(&self, key: Key) -> bool {
        self.get_key(key) == 1
    }
}

/// Which keys are physically down for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    down: [bool; KEY_COUNT],
}

impl HeldKeys {
    pub fn set(&mut self, key: Key, is_down: bool) {
        self.down[key.index()] = is_down;
    }

    pub fn with(mut self, key: Key) -> Self {
        self.set(key, true);
        self
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.down[key.index()]
    }
}

/// Hold-duration counters advanced once per simulation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    counters: [i32; KEY_COUNT],
}

impl InputState {
    pub fn advance(&mut self, held: HeldKeys) {
        for key in Key::ALL {
            let counter = &mut self.counters[key.index()];
            *counter = if held.is_down(key) {
                if *counter > 0 {
                    counter.saturating_add(1)
                } else {
                    1
                }
            } else if *counter < 0 {
                counter.saturating_sub(1)
            } else {
                -1
            };
        }
    }

    pub fn reset(&mut self) {
        self.counters = [0; KEY_COUNT];
    }
}

impl InputQuery for InputState {
    fn get_key(&self, key: Key) -> i32 {
        self.counters[key.index()]
    }
}
