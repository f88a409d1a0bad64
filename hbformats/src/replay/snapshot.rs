use super::{ACTION_COUNT, Action, Actions, EventPayload, MAX_AXES, MAX_BUTTONS, ReplayEvent};
use std::collections::{BTreeMap, BTreeSet};

/// Last known input state of one gamepad.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct JoypadState {
    pub axis_values: [f32; MAX_AXES],
    pub axis_actions: [Actions; MAX_AXES],
    pub button_pressed: Vec<bool>,
    pub button_actions: Vec<Actions>,
}

impl Default for JoypadState {
    fn default() -> Self {
        Self {
            axis_values: [0.0; MAX_AXES],
            axis_actions: [Actions::NONE; MAX_AXES],
            button_pressed: vec![false; MAX_BUTTONS],
            button_actions: vec![Actions::NONE; MAX_BUTTONS],
        }
    }
}

impl JoypadState {
    pub fn is_button_pressed(&self, button: u8) -> bool {
        self.button_pressed
            .get(button as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn axis_value(&self, axis: u8) -> f32 {
        self.axis_values.get(axis as usize).copied().unwrap_or(0.0)
    }
}

/// Cumulative input state after some prefix of a replay's events.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct StateSnapshot {
    pub joypads: Vec<JoypadState>,
    pub pressed_keys: BTreeSet<u32>,
    /// Actions most recently asserted by each key. Entries outlive key releases.
    pub key_actions: BTreeMap<u32, Actions>,
    pub action_held_counts: [u32; ACTION_COUNT],
}

impl StateSnapshot {
    /// Initial snapshot: every known device zeroed, no keys held.
    pub fn new(device_count: usize) -> Self {
        Self {
            joypads: vec![JoypadState::default(); device_count],
            ..Self::default()
        }
    }

    pub fn action_held_count(&self, action: Action) -> u32 {
        self.action_held_counts[action.index()]
    }

    pub fn is_action_held(&self, action: Action) -> bool {
        self.action_held_count(action) > 0
    }

    pub fn is_key_pressed(&self, key: u32) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn joypad(&self, device: u8) -> Option<&JoypadState> {
        self.joypads.get(device as usize)
    }

    /// Returns the state after `event`.
    pub fn next(&self, event: &ReplayEvent) -> Self {
        let mut next = self.clone();
        next.apply(event);
        next
    }

    pub fn apply(&mut self, event: &ReplayEvent) {
        match event.payload {
            EventPayload::Button {
                device,
                button,
                pressed,
            } => {
                let Some(pad) = self.joypads.get_mut(device as usize) else {
                    log::warn!("replay snapshot: unknown device {device}; event ignored");
                    return;
                };
                let b = button as usize;
                if b < MAX_BUTTONS {
                    pad.button_pressed[b] = pressed;
                    pad.button_actions[b].insert(event.press);
                    pad.button_actions[b].remove(event.release);
                }
            }
            EventPayload::SingleAxis {
                device,
                axis,
                value,
            } => {
                let Some(pad) = self.joypads.get_mut(device as usize) else {
                    log::warn!("replay snapshot: unknown device {device}; event ignored");
                    return;
                };
                let a = axis as usize;
                if a < MAX_AXES {
                    pad.axis_values[a] = value;
                    pad.axis_actions[a].insert(event.press);
                    pad.axis_actions[a].remove(event.release);
                }
            }
            EventPayload::DualAxis {
                device,
                axes,
                values,
            } => {
                let Some(pad) = self.joypads.get_mut(device as usize) else {
                    log::warn!("replay snapshot: unknown device {device}; event ignored");
                    return;
                };
                for (axis, value) in axes.into_iter().zip(values) {
                    if let Some(slot) = pad.axis_values.get_mut(axis as usize) {
                        *slot = value;
                    }
                }
                // Only the first axis carries the action state of a stick.
                if let Some(actions) = pad.axis_actions.get_mut(axes[0] as usize) {
                    actions.insert(event.press);
                    actions.remove(event.release);
                }
            }
            EventPayload::Key { key, pressed } => {
                if pressed {
                    self.pressed_keys.insert(key);
                } else {
                    self.pressed_keys.remove(&key);
                }
                self.key_actions.insert(key, event.press);
            }
        }
        self.recount();
    }

    fn recount(&mut self) {
        let keys = self
            .key_actions
            .iter()
            .filter(|(key, _)| self.pressed_keys.contains(key))
            .map(|(_, actions)| *actions);
        let sources = keys.chain(
            self.joypads.iter().flat_map(|pad| {
                pad.axis_actions
                    .iter()
                    .chain(pad.button_actions.iter())
                    .copied()
            }),
        );

        let mut counts = [0u32; ACTION_COUNT];
        for actions in sources.filter(|a| !a.is_empty()) {
            for action in actions.iter() {
                counts[action.index()] += 1;
            }
        }
        self.action_held_counts = counts;
    }
}

/// Folds `events` into `events.len() + 1` snapshots; index 0 is the initial state.
pub fn build_snapshots(device_count: usize, events: &[ReplayEvent]) -> Vec<StateSnapshot> {
    let mut snapshots = Vec::with_capacity(events.len() + 1);
    snapshots.push(StateSnapshot::new(device_count));
    for event in events {
        let next = snapshots[snapshots.len() - 1].next(event);
        snapshots.push(next);
    }
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: i64, press: Actions, release: Actions, payload: EventPayload) -> ReplayEvent {
        ReplayEvent {
            timestamp,
            press,
            release,
            payload,
        }
    }

    #[test]
    fn button_press_then_release_updates_counts() {
        let events = [
            event(
                0,
                Actions::NOTE_UP | Actions::NOTE_DOWN,
                Actions::NONE,
                EventPayload::Button {
                    device: 0,
                    button: 3,
                    pressed: true,
                },
            ),
            event(
                10,
                Actions::NONE,
                Actions::NOTE_UP,
                EventPayload::Button {
                    device: 0,
                    button: 3,
                    pressed: false,
                },
            ),
        ];
        let snapshots = build_snapshots(1, &events);

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].action_held_count(Action::NoteUp), 0);
        assert_eq!(snapshots[1].action_held_count(Action::NoteUp), 1);
        assert_eq!(snapshots[1].action_held_count(Action::NoteDown), 1);
        assert!(snapshots[1].joypad(0).unwrap().is_button_pressed(3));
        assert_eq!(snapshots[2].action_held_count(Action::NoteUp), 0);
        assert_eq!(snapshots[2].action_held_count(Action::NoteDown), 1);
        assert!(!snapshots[2].joypad(0).unwrap().is_button_pressed(3));
    }

    #[test]
    fn dual_axis_actions_live_on_first_axis() {
        let events = [event(
            5,
            Actions::SLIDE_LEFT,
            Actions::NONE,
            EventPayload::DualAxis {
                device: 0,
                axes: [0, 1],
                values: [-1.0, 0.25],
            },
        )];
        let snapshots = build_snapshots(1, &events);
        let pad = snapshots[1].joypad(0).unwrap();

        assert_eq!(pad.axis_value(0), -1.0);
        assert_eq!(pad.axis_value(1), 0.25);
        assert_eq!(pad.axis_actions[0], Actions::SLIDE_LEFT);
        assert_eq!(pad.axis_actions[1], Actions::NONE);
        assert_eq!(snapshots[1].action_held_count(Action::SlideLeft), 1);
    }

    #[test]
    fn key_actions_are_reassigned_not_merged() {
        let events = [
            event(
                0,
                Actions::HEART_NOTE,
                Actions::NONE,
                EventPayload::Key {
                    key: 72,
                    pressed: true,
                },
            ),
            event(
                1,
                Actions::NOTE_LEFT,
                Actions::NONE,
                EventPayload::Key {
                    key: 72,
                    pressed: true,
                },
            ),
            event(
                2,
                Actions::NONE,
                Actions::NOTE_LEFT,
                EventPayload::Key {
                    key: 72,
                    pressed: false,
                },
            ),
        ];
        let snapshots = build_snapshots(0, &events);

        assert!(snapshots[1].is_key_pressed(72));
        assert_eq!(snapshots[1].action_held_count(Action::HeartNote), 1);
        assert_eq!(snapshots[2].action_held_count(Action::HeartNote), 0);
        assert_eq!(snapshots[2].action_held_count(Action::NoteLeft), 1);
        assert!(!snapshots[3].is_key_pressed(72));
        assert_eq!(snapshots[3].action_held_count(Action::NoteLeft), 0);
        assert_eq!(snapshots[3].key_actions.get(&72), Some(&Actions::NONE));
    }

    #[test]
    fn released_keys_hold_no_actions() {
        let events = [event(
            0,
            Actions::NOTE_UP,
            Actions::NONE,
            EventPayload::Key {
                key: 72,
                pressed: false,
            },
        )];
        let snapshots = build_snapshots(0, &events);

        assert!(!snapshots[1].is_key_pressed(72));
        assert_eq!(snapshots[1].key_actions.get(&72), Some(&Actions::NOTE_UP));
        assert_eq!(snapshots[1].action_held_count(Action::NoteUp), 0);
    }

    #[test]
    fn events_for_unknown_devices_leave_state_untouched() {
        let events = [event(
            0,
            Actions::NOTE_UP,
            Actions::NONE,
            EventPayload::Button {
                device: 4,
                button: 0,
                pressed: true,
            },
        )];
        let snapshots = build_snapshots(1, &events);
        assert_eq!(snapshots[1], snapshots[0]);
    }
}
