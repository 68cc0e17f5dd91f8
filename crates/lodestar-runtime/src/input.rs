//! Pad sampling for the four controller ports.

use crate::frontend::Frontend;

pub const PORTS: usize = 4;

pub const DEVICE_JOYPAD: u32 = 1;
pub const DEVICE_ANALOG: u32 = 5;

const ANALOG_LEFT: u32 = 0;
const ANALOG_RIGHT: u32 = 1;
const AXIS_X: u32 = 0;
const AXIS_Y: u32 = 1;

/// Buttons as a bitmask in [`PadState::buttons`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Button {
    A = 1 << 0,
    B = 1 << 1,
    X = 1 << 2,
    Y = 1 << 3,
    L = 1 << 4,
    R = 1 << 5,
    L2 = 1 << 6,
    R2 = 1 << 7,
    L3 = 1 << 8,
    R3 = 1 << 9,
    Select = 1 << 10,
    Start = 1 << 11,
    Up = 1 << 12,
    Down = 1 << 13,
    Left = 1 << 14,
    Right = 1 << 15,
}

impl Button {
    pub const ALL: [Button; 16] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::L,
        Button::R,
        Button::L2,
        Button::R2,
        Button::L3,
        Button::R3,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    /// Joypad id in the host's numbering.
    pub fn joypad_id(self) -> u32 {
        match self {
            Button::B => 0,
            Button::Y => 1,
            Button::Select => 2,
            Button::Start => 3,
            Button::Up => 4,
            Button::Down => 5,
            Button::Left => 6,
            Button::Right => 7,
            Button::A => 8,
            Button::X => 9,
            Button::L => 10,
            Button::R => 11,
            Button::L2 => 12,
            Button::R2 => 13,
            Button::L3 => 14,
            Button::R3 => 15,
        }
    }

    pub fn mask(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadState {
    pub buttons: u16,
    /// Left stick, each axis in `-1.0..=1.0`.
    pub left: [f32; 2],
    pub right: [f32; 2],
}

impl PadState {
    pub fn read(frontend: &dyn Frontend, port: u32) -> Self {
        let buttons = Button::ALL
            .iter()
            .filter(|button| frontend.input_state(port, DEVICE_JOYPAD, 0, button.joypad_id()) != 0)
            .fold(0, |mask, button| mask | button.mask());
        let axis = |stick, id| normalize_axis(frontend.input_state(port, DEVICE_ANALOG, stick, id));
        Self {
            buttons,
            left: [axis(ANALOG_LEFT, AXIS_X), axis(ANALOG_LEFT, AXIS_Y)],
            right: [axis(ANALOG_RIGHT, AXIS_X), axis(ANALOG_RIGHT, AXIS_Y)],
        }
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }
}

pub fn normalize_axis(raw: i16) -> f32 {
    if raw >= 0 {
        f32::from(raw) / 32767.0
    } else {
        f32::from(raw) / 32768.0
    }
}

pub fn read_pads(frontend: &dyn Frontend) -> [PadState; PORTS] {
    std::array::from_fn(|port| PadState::read(frontend, port as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionDefinition;

    struct Held;

    impl Frontend for Held {
        fn poll_input(&self) {}

        fn input_state(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
            match (port, device, index, id) {
                (1, DEVICE_JOYPAD, 0, 8) | (1, DEVICE_JOYPAD, 0, 3) => 1,
                (1, DEVICE_ANALOG, ANALOG_LEFT, AXIS_X) => i16::MIN,
                (1, DEVICE_ANALOG, ANALOG_RIGHT, AXIS_Y) => i16::MAX,
                _ => 0,
            }
        }

        fn submit_hw_frame(&self, _: u32, _: u32) {}
        fn submit_placeholder_frame(&self) {}
        fn variable(&self, _: &str) -> Option<String> {
            None
        }
        fn variables_updated(&self) -> bool {
            false
        }
        fn set_variables(&self, _: &[OptionDefinition]) -> bool {
            true
        }
        fn username(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn reads_buttons_and_sticks() {
        let pads = read_pads(&Held);
        assert_eq!(pads[0], PadState::default());
        let pad = pads[1];
        assert!(pad.pressed(Button::A));
        assert!(pad.pressed(Button::Start));
        assert!(!pad.pressed(Button::B));
        assert_eq!(pad.left, [-1.0, 0.0]);
        assert_eq!(pad.right, [0.0, 1.0]);
    }

    #[test]
    fn button_ids_are_unique() {
        let mut ids: Vec<u32> = Button::ALL.iter().map(|b| b.joypad_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        let mask = Button::ALL.iter().fold(0u16, |m, b| m | b.mask());
        assert_eq!(mask, u16::MAX);
    }
}
