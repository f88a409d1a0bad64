use super::{
    Actions, EventPayload, EventType, GamepadDeviceInfo, MAX_AXES, MAX_BUTTONS, REPLAY_MAGIC,
    REPLAY_VERSION, ReplayEvent, StateSnapshot, build_snapshots,
};
use crate::{Error, OffsetCursor};

/// One event returned by [`ReplayReader::events_in_interval`].
#[derive(Clone, Copy, Debug)]
pub struct IntervalEvent<'r> {
    /// Position of the event in the replay.
    pub index: usize,
    pub event: &'r ReplayEvent,
    /// State after this event has been applied.
    pub snapshot: &'r StateSnapshot,
    /// Originating gamepad; `None` for keyboard events.
    pub device: Option<&'r GamepadDeviceInfo>,
}

impl IntervalEvent<'_> {
    pub fn device_name(&self) -> Option<&str> {
        self.device.map(|d| d.name.as_str())
    }

    pub fn device_guid(&self) -> Option<&str> {
        self.device.map(|d| d.guid.as_str())
    }
}

/// Decoded replay plus the per-event state snapshots.
///
/// A replay that fails to decode still yields a reader: header fields and
/// events read before the failure are kept for inspection, [`Self::error`]
/// reports the failure, and interval queries return nothing.
#[derive(Debug, Default)]
pub struct ReplayReader {
    version: u8,
    song_id: String,
    song_difficulty: String,
    song_chart_hash: String,
    devices: Vec<GamepadDeviceInfo>,
    events: Vec<ReplayEvent>,
    snapshots: Vec<StateSnapshot>,
    sorted: bool,
    error: Option<Error>,
}

impl ReplayReader {
    pub fn from_buffer(bytes: &[u8]) -> Self {
        let mut reader = Self::default();
        match reader.decode(&mut OffsetCursor::new(bytes)) {
            Ok(()) => {
                reader.sorted = reader
                    .events
                    .windows(2)
                    .all(|w| w[0].timestamp <= w[1].timestamp);
                if !reader.sorted {
                    log::warn!("replay: events are not in timestamp order; interval queries will scan");
                }
                reader.snapshots = build_snapshots(reader.devices.len(), &reader.events);
            }
            Err(e) => {
                log::error!("replay: {e}");
                reader.error = Some(e);
            }
        }
        reader
    }

    /// Like [`Self::from_buffer`] but fails instead of keeping a partial replay.
    pub fn try_from_buffer(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Self::from_buffer(bytes);
        match reader.error.take() {
            Some(e) => Err(e),
            None => Ok(reader),
        }
    }

    fn decode(&mut self, c: &mut OffsetCursor<'_>) -> Result<(), Error> {
        let magic = c.read_bytes(REPLAY_MAGIC.len())?;
        if magic != REPLAY_MAGIC {
            return Err(Error::InvalidReplay {
                message: format!("header mismatch: expected \"PHR\", found {magic:02x?}"),
            });
        }
        self.version = c.read_u8()?;
        if self.version != REPLAY_VERSION {
            log::warn!(
                "replay: unsupported version {} (expected {REPLAY_VERSION}); reading anyway",
                self.version
            );
        }
        self.song_id = read_string(c)?;
        self.song_difficulty = read_string(c)?;
        self.song_chart_hash = read_string(c)?;

        let device_count = c.read_u8()?;
        for id in 0..device_count {
            let name = read_string(c)?;
            let guid = read_string(c)?;
            self.devices.push(GamepadDeviceInfo { id, name, guid });
        }

        let event_count = c.read_u32()? as usize;
        // Each event takes at least 11 bytes; don't trust the count for the allocation.
        self.events.reserve(event_count.min(c.remaining() / 11));
        for index in 0..event_count {
            let event = self.read_event(c, index)?;
            self.events.push(event);
        }
        if c.remaining() > 0 {
            log::debug!("replay: {} trailing byte(s) ignored", c.remaining());
        }
        Ok(())
    }

    fn read_event(&self, c: &mut OffsetCursor<'_>, index: usize) -> Result<ReplayEvent, Error> {
        let tag = c.read_u8()?;
        let event_type = EventType::from_u8(tag).ok_or(Error::UnknownEventType { tag, index })?;
        let timestamp = c.read_i64()?;
        let press = Actions(c.read_u8()?);
        let release = Actions(c.read_u8()?);

        let payload = match event_type {
            EventType::JoypadSingleAxis => {
                let device = self.check_device(c.read_u8()?, index)?;
                let axis = check_axis(c.read_u8()?, index)?;
                EventPayload::SingleAxis {
                    device,
                    axis,
                    value: c.read_f32()?,
                }
            }
            EventType::JoypadDualAxis => {
                let device = self.check_device(c.read_u8()?, index)?;
                let axes = [check_axis(c.read_u8()?, index)?, check_axis(c.read_u8()?, index)?];
                let values = [c.read_f32()?, c.read_f32()?];
                EventPayload::DualAxis {
                    device,
                    axes,
                    values,
                }
            }
            EventType::JoypadButton => {
                let device = self.check_device(c.read_u8()?, index)?;
                let pressed = c.read_bool()?;
                let button = c.read_u8()?;
                if button as usize >= MAX_BUTTONS {
                    return Err(Error::InvalidReplay {
                        message: format!("event {index}: invalid joypad button {button}"),
                    });
                }
                EventPayload::Button {
                    device,
                    button,
                    pressed,
                }
            }
            EventType::KeyboardKey => {
                let pressed = c.read_bool()?;
                EventPayload::Key {
                    key: c.read_u32()?,
                    pressed,
                }
            }
        };

        Ok(ReplayEvent {
            timestamp,
            press,
            release,
            payload,
        })
    }

    fn check_device(&self, device: u8, index: usize) -> Result<u8, Error> {
        if (device as usize) < self.devices.len() {
            Ok(device)
        } else {
            Err(Error::InvalidReplay {
                message: format!(
                    "event {index}: device {device} is not in the device table ({} devices)",
                    self.devices.len()
                ),
            })
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn version(&self) -> u8 {
        self.version
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

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_name(&self, device: usize) -> Option<&str> {
        self.devices.get(device).map(|d| d.name.as_str())
    }

    pub fn device_guid(&self, device: usize) -> Option<&str> {
        self.devices.get(device).map(|d| d.guid.as_str())
    }

    pub fn events(&self) -> &[ReplayEvent] {
        &self.events
    }

    /// Snapshot `i` is the state after the first `i` events; empty when decoding failed.
    pub fn snapshots(&self) -> &[StateSnapshot] {
        &self.snapshots
    }

    pub fn snapshot(&self, index: usize) -> Option<&StateSnapshot> {
        self.snapshots.get(index)
    }

    /// Events with `start <= timestamp < end`, each paired with the state after it.
    pub fn events_in_interval(&self, start: i64, end: i64) -> Result<Vec<IntervalEvent<'_>>, Error> {
        if start > end {
            return Err(Error::InvalidInterval { start, end });
        }
        Ok(self.collect_events(start, Some(end)))
    }

    /// Events with `start <= timestamp`, through the end of the replay.
    pub fn events_from(&self, start: i64) -> Vec<IntervalEvent<'_>> {
        self.collect_events(start, None)
    }

    fn collect_events(&self, start: i64, end: Option<i64>) -> Vec<IntervalEvent<'_>> {
        if self.error.is_some() {
            return Vec::new();
        }
        let before_end = |ts: i64| end.is_none_or(|end| ts < end);

        let range = if self.sorted {
            let first = self.events.partition_point(|e| e.timestamp < start);
            let last = self.events.partition_point(|e| before_end(e.timestamp));
            first..last.max(first)
        } else {
            0..self.events.len()
        };

        range
            .filter(|&i| {
                let ts = self.events[i].timestamp;
                start <= ts && before_end(ts)
            })
            .filter_map(|index| {
                let event = &self.events[index];
                let snapshot = self.snapshots.get(index + 1)?;
                let device = event
                    .payload
                    .device()
                    .and_then(|d| self.devices.get(d as usize));
                Some(IntervalEvent {
                    index,
                    event,
                    snapshot,
                    device,
                })
            })
            .collect()
    }
}

fn check_axis(axis: u8, index: usize) -> Result<u8, Error> {
    if (axis as usize) < MAX_AXES {
        Ok(axis)
    } else {
        Err(Error::InvalidReplay {
            message: format!("event {index}: invalid joypad axis {axis}"),
        })
    }
}

fn read_string(c: &mut OffsetCursor<'_>) -> Result<String, Error> {
    let len = c.read_offset()?;
    let bytes = c.read_bytes(len)?;
    Ok(match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            log::warn!("replay: string is not valid UTF-8 ({e}); decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    })
}
