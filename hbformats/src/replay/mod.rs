//! Project Heartbeat replay files (`.phr`).
//!
//! A replay is an append-only log of timestamped low-level input events
//! (joystick axes, gamepad buttons, keyboard keys). Each event also records
//! which semantic game [`Action`]s it starts and stops asserting, which lets
//! the reader rebuild "what was held at time T" for playback and scoring.

mod reader;
mod snapshot;
mod writer;

pub use reader::*;
pub use snapshot::*;
pub use writer::*;

use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

pub const REPLAY_MAGIC: [u8; 3] = *b"PHR";
pub const REPLAY_VERSION: u8 = 0;

/// Joystick axis slots tracked per device.
pub const MAX_AXES: usize = 10;
/// Gamepad button slots tracked per device.
pub const MAX_BUTTONS: usize = 128;
/// The device table length is stored in a single byte.
pub const MAX_DEVICES: usize = u8::MAX as usize;

/// Minimum spacing between accepted extra events (60 Hz in timestamp units).
pub const DEFAULT_EXTRA_EVENT_INTERVAL: i64 = 1_000_000 / 60;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum EventType {
    JoypadSingleAxis,
    JoypadDualAxis,
    JoypadButton,
    KeyboardKey,
}

impl EventType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::JoypadSingleAxis),
            1 => Some(Self::JoypadDualAxis),
            2 => Some(Self::JoypadButton),
            3 => Some(Self::KeyboardKey),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::JoypadSingleAxis => 0,
            Self::JoypadDualAxis => 1,
            Self::JoypadButton => 2,
            Self::KeyboardKey => 3,
        }
    }

    pub fn is_gamepad(self) -> bool {
        self != Self::KeyboardKey
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum Action {
    NoteUp,
    NoteLeft,
    NoteDown,
    NoteRight,
    SlideLeft,
    SlideRight,
    HeartNote,
}

pub const ACTION_COUNT: usize = 7;

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::NoteUp,
        Action::NoteLeft,
        Action::NoteDown,
        Action::NoteRight,
        Action::SlideLeft,
        Action::SlideRight,
        Action::HeartNote,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> Actions {
        Actions(1 << self.index())
    }
}

/// Bitfield of [`Action`]s, one bit per action in declaration order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Actions(pub u8);

impl Actions {
    pub const NONE: Actions = Actions(0);
    pub const NOTE_UP: Actions = Actions(1);
    pub const NOTE_LEFT: Actions = Actions(1 << 1);
    pub const NOTE_DOWN: Actions = Actions(1 << 2);
    pub const NOTE_RIGHT: Actions = Actions(1 << 3);
    pub const SLIDE_LEFT: Actions = Actions(1 << 4);
    pub const SLIDE_RIGHT: Actions = Actions(1 << 5);
    pub const HEART_NOTE: Actions = Actions(1 << 6);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, action: Action) -> bool {
        self.0 & action.bit().0 != 0
    }

    pub fn insert(&mut self, other: Actions) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Actions) {
        self.0 &= !other.0;
    }

    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl From<Action> for Actions {
    fn from(action: Action) -> Self {
        action.bit()
    }
}

impl BitOr for Actions {
    type Output = Actions;

    fn bitor(self, rhs: Self) -> Self::Output {
        Actions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Actions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Actions {
    type Output = Actions;

    fn bitand(self, rhs: Self) -> Self::Output {
        Actions(self.0 & rhs.0)
    }
}

impl Not for Actions {
    type Output = Actions;

    fn not(self) -> Self::Output {
        Actions(!self.0)
    }
}

/// Event payload as stored on disk. Gamepad variants carry the dense device id.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum EventPayload {
    SingleAxis {
        device: u8,
        axis: u8,
        value: f32,
    },
    DualAxis {
        device: u8,
        axes: [u8; 2],
        values: [f32; 2],
    },
    Button {
        device: u8,
        button: u8,
        pressed: bool,
    },
    Key {
        key: u32,
        pressed: bool,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::SingleAxis { .. } => EventType::JoypadSingleAxis,
            Self::DualAxis { .. } => EventType::JoypadDualAxis,
            Self::Button { .. } => EventType::JoypadButton,
            Self::Key { .. } => EventType::KeyboardKey,
        }
    }

    pub fn device(&self) -> Option<u8> {
        match *self {
            Self::SingleAxis { device, .. }
            | Self::DualAxis { device, .. }
            | Self::Button { device, .. } => Some(device),
            Self::Key { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ReplayEvent {
    pub timestamp: i64,
    pub press: Actions,
    pub release: Actions,
    pub payload: EventPayload,
}

impl ReplayEvent {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn is_gamepad_event(&self) -> bool {
        self.event_type().is_gamepad()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct GamepadDeviceInfo {
    pub id: u8,
    pub name: String,
    pub guid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_bits_follow_declaration_order() {
        assert_eq!(Action::NoteUp.bit(), Actions::NOTE_UP);
        assert_eq!(Action::HeartNote.bit(), Actions::HEART_NOTE);
        let both = Actions::SLIDE_LEFT | Actions::HEART_NOTE;
        assert_eq!(both.bits(), 0b101_0000);
        assert_eq!(
            both.iter().collect::<Vec<_>>(),
            [Action::SlideLeft, Action::HeartNote]
        );
    }

    #[test]
    fn insert_and_remove_touch_only_named_bits() {
        let mut actions = Actions::NOTE_UP | Actions::NOTE_DOWN;
        actions.remove(Actions::NOTE_UP | Actions::HEART_NOTE);
        assert_eq!(actions, Actions::NOTE_DOWN);
        actions.insert(Actions::NOTE_LEFT);
        assert!(actions.contains(Action::NoteLeft));
        assert!(!actions.contains(Action::NoteUp));
    }

    #[test]
    fn event_type_tags() {
        for tag in 0..4 {
            assert_eq!(EventType::from_u8(tag).map(EventType::as_u8), Some(tag));
        }
        assert_eq!(EventType::from_u8(4), None);
        assert!(!EventType::KeyboardKey.is_gamepad());
    }
}
