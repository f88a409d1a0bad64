use super::{
    Actions, DEFAULT_EXTRA_EVENT_INTERVAL, EventPayload, GamepadDeviceInfo, MAX_AXES,
    MAX_BUTTONS, MAX_DEVICES, REPLAY_MAGIC, REPLAY_VERSION, ReplayEvent,
};
use crate::Error;
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;

/// A gamepad as seen by the input layer, before it has a replay device id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRef {
    pub guid: String,
    pub name: String,
}

impl DeviceRef {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordedInput {
    SingleAxis {
        device: DeviceRef,
        axis: u8,
        value: f32,
    },
    DualAxis {
        device: DeviceRef,
        axes: [u8; 2],
        values: [f32; 2],
    },
    Button {
        device: DeviceRef,
        button: u8,
        pressed: bool,
    },
    Key {
        key: u32,
        pressed: bool,
    },
}

/// An input event offered to [`ReplayWriter::push_event`].
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEvent {
    pub timestamp: i64,
    pub press: Actions,
    pub release: Actions,
    /// Extra events (analog noise, stick drift) are rate limited.
    pub extra: bool,
    pub input: RecordedInput,
}

impl PendingEvent {
    pub fn new(timestamp: i64, input: RecordedInput) -> Self {
        Self {
            timestamp,
            press: Actions::NONE,
            release: Actions::NONE,
            extra: false,
            input,
        }
    }

    pub fn single_axis(timestamp: i64, device: DeviceRef, axis: u8, value: f32) -> Self {
        Self::new(timestamp, RecordedInput::SingleAxis { device, axis, value })
    }

    pub fn dual_axis(timestamp: i64, device: DeviceRef, axes: [u8; 2], values: [f32; 2]) -> Self {
        Self::new(timestamp, RecordedInput::DualAxis { device, axes, values })
    }

    pub fn button(timestamp: i64, device: DeviceRef, button: u8, pressed: bool) -> Self {
        Self::new(
            timestamp,
            RecordedInput::Button {
                device,
                button,
                pressed,
            },
        )
    }

    pub fn key(timestamp: i64, key: u32, pressed: bool) -> Self {
        Self::new(timestamp, RecordedInput::Key { key, pressed })
    }

    pub fn with_press(mut self, press: Actions) -> Self {
        self.press = press;
        self
    }

    pub fn with_release(mut self, release: Actions) -> Self {
        self.release = release;
        self
    }

    pub fn as_extra(mut self) -> Self {
        self.extra = true;
        self
    }
}

/// Accumulates input events during a play session and serializes them.
#[derive(Clone, Debug)]
pub struct ReplayWriter {
    song_id: String,
    song_difficulty: String,
    song_chart_hash: String,
    devices: Vec<GamepadDeviceInfo>,
    device_ids: HashMap<String, u8>,
    events: Vec<ReplayEvent>,
    extra_event_interval: i64,
    last_extra_event: Option<i64>,
}

impl Default for ReplayWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayWriter {
    pub fn new() -> Self {
        Self {
            song_id: String::new(),
            song_difficulty: String::new(),
            song_chart_hash: String::new(),
            devices: Vec::new(),
            device_ids: HashMap::new(),
            events: Vec::new(),
            extra_event_interval: DEFAULT_EXTRA_EVENT_INTERVAL,
            last_extra_event: None,
        }
    }

    pub fn with_extra_event_interval(mut self, interval: i64) -> Self {
        self.extra_event_interval = interval;
        self
    }

    pub fn set_song_id(&mut self, song_id: impl Into<String>) {
        self.song_id = song_id.into();
    }

    pub fn set_song_difficulty(&mut self, difficulty: impl Into<String>) {
        self.song_difficulty = difficulty.into();
    }

    pub fn set_song_chart_hash(&mut self, hash: impl Into<String>) {
        self.song_chart_hash = hash.into();
    }

    pub fn song_id(&self) -> &str {
        &self.song_id
    }

    pub fn song_difficulty(&self) -> &str {
        &self.song_difficulty
    }

    pub fn song_chart_hash(&self) -> &str {
        &self.song_chart_hash
    }

    pub fn devices(&self) -> &[GamepadDeviceInfo] {
        &self.devices
    }

    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Appends an event. Returns `false` when it was dropped: by the extra-event
    /// rate limiter, for an axis or button id the format cannot hold, or
    /// because the device table is full.
    pub fn push_event(&mut self, event: PendingEvent) -> bool {
        if !input_ids_in_range(&event.input) {
            return false;
        }
        if event.extra {
            if let Some(last) = self.last_extra_event {
                if event.timestamp < last.saturating_add(self.extra_event_interval) {
                    return false;
                }
            }
        }

        let payload = match event.input {
            RecordedInput::SingleAxis {
                device,
                axis,
                value,
            } => {
                let Some(device) = self.device_id(device) else {
                    return false;
                };
                EventPayload::SingleAxis {
                    device,
                    axis,
                    value,
                }
            }
            RecordedInput::DualAxis {
                device,
                axes,
                values,
            } => {
                let Some(device) = self.device_id(device) else {
                    return false;
                };
                EventPayload::DualAxis {
                    device,
                    axes,
                    values,
                }
            }
            RecordedInput::Button {
                device,
                button,
                pressed,
            } => {
                let Some(device) = self.device_id(device) else {
                    return false;
                };
                EventPayload::Button {
                    device,
                    button,
                    pressed,
                }
            }
            RecordedInput::Key { key, pressed } => EventPayload::Key { key, pressed },
        };

        if let Some(last) = self.events.last() {
            if event.timestamp < last.timestamp {
                log::warn!(
                    "replay writer: event at {} is earlier than previous event at {}",
                    event.timestamp,
                    last.timestamp
                );
            }
        }
        if event.extra {
            self.last_extra_event = Some(event.timestamp);
        }

        self.events.push(ReplayEvent {
            timestamp: event.timestamp,
            press: event.press,
            release: event.release,
            payload,
        });
        true
    }

    /// Looks up or assigns the dense id for a device, keyed by GUID.
    fn device_id(&mut self, device: DeviceRef) -> Option<u8> {
        if let Some(&id) = self.device_ids.get(&device.guid) {
            return Some(id);
        }
        if self.devices.len() >= MAX_DEVICES {
            log::warn!(
                "replay writer: device table is full; dropping event from '{}'",
                device.guid
            );
            return None;
        }
        let id = self.devices.len() as u8;
        self.device_ids.insert(device.guid.clone(), id);
        self.devices.push(GamepadDeviceInfo {
            id,
            name: device.name,
            guid: device.guid,
        });
        Some(id)
    }

    /// Serializes the header, device table and events.
    ///
    /// Fails only when a string or the event list is too long for its u32 length field.
    pub fn write_to_buffer(&self) -> Result<Vec<u8>, Error> {
        let mut out = ByteSink::default();
        out.bytes(&REPLAY_MAGIC);
        out.u8(REPLAY_VERSION);
        out.string("song id", &self.song_id)?;
        out.string("song difficulty", &self.song_difficulty)?;
        out.string("song chart hash", &self.song_chart_hash)?;

        // device_id never assigns more than MAX_DEVICES ids.
        out.u8(self.devices.len() as u8);
        for device in &self.devices {
            out.string("device name", &device.name)?;
            out.string("device guid", &device.guid)?;
        }

        out.u32(length_prefix("event list", self.events.len())?);
        for event in &self.events {
            out.u8(event.event_type().as_u8());
            out.i64(event.timestamp);
            out.u8(event.press.bits());
            out.u8(event.release.bits());
            match event.payload {
                EventPayload::SingleAxis {
                    device,
                    axis,
                    value,
                } => {
                    out.u8(device);
                    out.u8(axis);
                    out.f32(value);
                }
                EventPayload::DualAxis {
                    device,
                    axes,
                    values,
                } => {
                    out.u8(device);
                    out.u8(axes[0]);
                    out.u8(axes[1]);
                    out.f32(values[0]);
                    out.f32(values[1]);
                }
                EventPayload::Button {
                    device,
                    button,
                    pressed,
                } => {
                    out.u8(device);
                    out.u8(pressed as u8);
                    out.u8(button);
                }
                EventPayload::Key { key, pressed } => {
                    out.u8(pressed as u8);
                    out.u32(key);
                }
            }
        }
        Ok(out.0)
    }
}

fn input_ids_in_range(input: &RecordedInput) -> bool {
    let bad = match input {
        RecordedInput::SingleAxis { axis, .. } => {
            (*axis as usize >= MAX_AXES).then(|| format!("axis {axis}"))
        }
        RecordedInput::DualAxis { axes, .. } => axes
            .iter()
            .find(|&&axis| axis as usize >= MAX_AXES)
            .map(|axis| format!("axis {axis}")),
        RecordedInput::Button { button, .. } => {
            (*button as usize >= MAX_BUTTONS).then(|| format!("button {button}"))
        }
        RecordedInput::Key { .. } => None,
    };
    match bad {
        Some(what) => {
            log::warn!("replay writer: joypad {what} is out of range; event dropped");
            false
        }
        None => true,
    }
}

fn length_prefix(what: &'static str, len: usize) -> Result<u32, Error> {
    u32::try_from(len).map_err(|_| Error::ReplayTooLarge { what, len })
}

#[derive(Default)]
struct ByteSink(Vec<u8>);

impl ByteSink {
    fn bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn u32(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, v);
        self.bytes(&buf);
    }

    fn i64(&mut self, v: i64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_i64(&mut buf, v);
        self.bytes(&buf);
    }

    fn f32(&mut self, v: f32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, v);
        self.bytes(&buf);
    }

    /// u32 byte length followed by UTF-8 bytes, no terminator.
    fn string(&mut self, what: &'static str, s: &str) -> Result<(), Error> {
        self.u32(length_prefix(what, s.len())?);
        self.bytes(s.as_bytes());
        Ok(())
    }
}
