//! Emulator events mirrored across a netplay link.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::control::ControlChannel;

/// An input or machine event recorded on one instance and replayed on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum NetplayEvent {
    /// Keyboard matrix state change.
    KeyboardMatrix { row: u8, column: u8, pressed: bool },
    /// RESTORE key pressed or released.
    KeyboardRestore { pressed: bool },
    /// Keyboard buffer delay, in frames.
    KeyboardDelay { frames: u32 },
    /// All keys released.
    KeyboardClear,
    /// New joystick value on a control port (1-based).
    Joystick { port: u16, value: u16 },
    /// Disk image attached to a drive unit.
    AttachDisk { unit: u8, path: String },
    /// Tape image attached.
    AttachTape { path: String },
    /// Datasette transport command.
    Datasette { command: u8 },
    /// Resource value changed.
    Resource { name: String, value: String },
    /// CPU reset.
    ResetCpu,
}

impl NetplayEvent {
    /// Control channel governing whether this event may cross the link.
    ///
    /// Joystick values on ports other than 1 and 2 are not governed by any
    /// channel and always pass.
    pub fn channel(&self) -> Option<ControlChannel> {
        match self {
            Self::KeyboardMatrix { .. }
            | Self::KeyboardRestore { .. }
            | Self::KeyboardDelay { .. }
            | Self::KeyboardClear => Some(ControlChannel::Keyboard),
            Self::AttachDisk { .. } | Self::AttachTape { .. } | Self::Datasette { .. } => {
                Some(ControlChannel::Devices)
            }
            Self::Resource { .. } | Self::ResetCpu => Some(ControlChannel::Resources),
            Self::Joystick { port: 1, .. } => Some(ControlChannel::Joystick1),
            Self::Joystick { port: 2, .. } => Some(ControlChannel::Joystick2),
            Self::Joystick { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_events_use_keyboard_channel() {
        let events = [
            NetplayEvent::KeyboardMatrix {
                row: 1,
                column: 7,
                pressed: true,
            },
            NetplayEvent::KeyboardRestore { pressed: false },
            NetplayEvent::KeyboardDelay { frames: 3 },
            NetplayEvent::KeyboardClear,
        ];
        for e in &events {
            assert_eq!(e.channel(), Some(ControlChannel::Keyboard));
        }
    }

    #[test]
    fn joystick_port_selects_channel() {
        let j = |port| NetplayEvent::Joystick { port, value: 0x10 };
        assert_eq!(j(1).channel(), Some(ControlChannel::Joystick1));
        assert_eq!(j(2).channel(), Some(ControlChannel::Joystick2));
        assert_eq!(j(3).channel(), None);
    }

    #[test]
    fn media_and_resources() {
        assert_eq!(
            NetplayEvent::AttachDisk {
                unit: 8,
                path: "game.d64".to_string()
            }
            .channel(),
            Some(ControlChannel::Devices)
        );
        assert_eq!(
            NetplayEvent::Datasette { command: 1 }.channel(),
            Some(ControlChannel::Devices)
        );
        assert_eq!(
            NetplayEvent::ResetCpu.channel(),
            Some(ControlChannel::Resources)
        );
    }
}
