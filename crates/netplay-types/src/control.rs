//! Control masks: which input categories each side mirrors to its peer.
//!
//! The mask is a 16-bit value. The low byte holds the channels the server
//! forwards, the high byte the channels the client forwards.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Shift applied to a channel bit for the client side.
pub const CLIENT_OFFSET: u32 = 8;

/// An input or resource category that can be mirrored across the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum ControlChannel {
    Keyboard,
    Joystick1,
    Joystick2,
    Devices,
    Resources,
}

impl ControlChannel {
    /// All channels in bit order.
    pub const ALL: [Self; 5] = [
        Self::Keyboard,
        Self::Joystick1,
        Self::Joystick2,
        Self::Devices,
        Self::Resources,
    ];

    /// Bit of this channel within one side's byte.
    pub fn bit(self) -> u16 {
        match self {
            Self::Keyboard => 1 << 0,
            Self::Joystick1 => 1 << 1,
            Self::Joystick2 => 1 << 2,
            Self::Devices => 1 << 3,
            Self::Resources => 1 << 4,
        }
    }

    /// Label used by settings front-ends.
    pub fn label(self) -> &'static str {
        match self {
            Self::Keyboard => "Keyboard",
            Self::Joystick1 => "Joystick #1",
            Self::Joystick2 => "Joystick #2",
            Self::Devices => "Devices",
            Self::Resources => "Resources",
        }
    }
}

/// Which end of the link originates an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Side {
    Server,
    Client,
}

impl Side {
    fn shift(self) -> u32 {
        match self {
            Self::Server => 0,
            Self::Client => CLIENT_OFFSET,
        }
    }
}

/// Per-side channel bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(transparent)]
pub struct ControlMask(pub u16);

impl ControlMask {
    /// Server mirrors keyboard, joystick 2, devices and resources; client
    /// mirrors keyboard and joystick 1.
    pub const DEFAULT: Self = Self(0b0001_1101 | (0b0000_0011 << CLIENT_OFFSET));

    /// No channel is mirrored.
    pub const NONE: Self = Self(0);

    /// Mask bit for a channel on a given side.
    pub fn flag(channel: ControlChannel, side: Side) -> u16 {
        channel.bit() << side.shift()
    }

    /// Whether `side` forwards `channel`.
    pub fn permits(self, channel: ControlChannel, side: Side) -> bool {
        self.0 & Self::flag(channel, side) != 0
    }

    /// Enable or disable one channel for one side.
    #[must_use]
    pub fn with(self, channel: ControlChannel, side: Side, enabled: bool) -> Self {
        let flag = Self::flag(channel, side);
        if enabled {
            Self(self.0 | flag)
        } else {
            Self(self.0 & !flag)
        }
    }

    /// Flip one channel for one side.
    #[must_use]
    pub fn toggled(self, channel: ControlChannel, side: Side) -> Self {
        Self(self.0 ^ Self::flag(channel, side))
    }

    /// Parse the command-line form `"key,joy1,joy2,dev,rsrc"`.
    ///
    /// Each element is `0` (none), `1` (server), `2` (client) or `3` (both).
    /// Resources only accept `0..=2`.
    pub fn parse_spec(spec: &str) -> Result<Self, TypesError> {
        let bytes = spec.as_bytes();
        if bytes.len() != 9 || [1, 3, 5, 7].iter().any(|&i| bytes[i] != b',') {
            return Err(TypesError::ControlSpecFormat(spec.to_string()));
        }

        let mut mask = Self::NONE;
        for (n, channel) in ControlChannel::ALL.into_iter().enumerate() {
            let c = char::from(bytes[n * 2]);
            let max = if channel == ControlChannel::Resources { 2 } else { 3 };
            let value = c
                .to_digit(10)
                .filter(|v| *v <= max)
                .ok_or(TypesError::ControlSpecValue {
                    element: channel.label(),
                    value: c,
                })?;
            mask = mask
                .with(channel, Side::Server, value & 1 != 0)
                .with(channel, Side::Client, value & 2 != 0);
        }
        Ok(mask)
    }

    /// Render back to the command-line form.
    pub fn to_spec(self) -> String {
        ControlChannel::ALL
            .iter()
            .map(|&channel| {
                let value = u8::from(self.permits(channel, Side::Server))
                    | (u8::from(self.permits(channel, Side::Client)) << 1);
                char::from(b'0' + value)
            })
            .map(String::from)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for ControlMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for ControlMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_bits() {
        let m = ControlMask::DEFAULT;
        assert!(m.permits(ControlChannel::Keyboard, Side::Server));
        assert!(!m.permits(ControlChannel::Joystick1, Side::Server));
        assert!(m.permits(ControlChannel::Joystick2, Side::Server));
        assert!(m.permits(ControlChannel::Devices, Side::Server));
        assert!(m.permits(ControlChannel::Resources, Side::Server));
        assert!(m.permits(ControlChannel::Keyboard, Side::Client));
        assert!(m.permits(ControlChannel::Joystick1, Side::Client));
        assert!(!m.permits(ControlChannel::Joystick2, Side::Client));
        assert_eq!(m.0, 0x031d);
    }

    #[test]
    fn client_bits_use_high_byte() {
        assert_eq!(ControlMask::flag(ControlChannel::Joystick1, Side::Server), 0x0002);
        assert_eq!(ControlMask::flag(ControlChannel::Joystick1, Side::Client), 0x0200);
    }

    #[test]
    fn toggle_twice_restores_original() {
        let original = ControlMask::DEFAULT;
        let on = original.toggled(ControlChannel::Joystick1, Side::Server);
        assert!(on.permits(ControlChannel::Joystick1, Side::Server));
        let off = on.toggled(ControlChannel::Joystick1, Side::Server);
        assert_eq!(off, original);
    }

    #[test]
    fn parse_spec_sets_both_sides() {
        let mask = ControlMask::parse_spec("3,1,2,0,1").unwrap();
        assert!(mask.permits(ControlChannel::Keyboard, Side::Server));
        assert!(mask.permits(ControlChannel::Keyboard, Side::Client));
        assert!(mask.permits(ControlChannel::Joystick1, Side::Server));
        assert!(!mask.permits(ControlChannel::Joystick1, Side::Client));
        assert!(!mask.permits(ControlChannel::Joystick2, Side::Server));
        assert!(mask.permits(ControlChannel::Joystick2, Side::Client));
        assert!(!mask.permits(ControlChannel::Devices, Side::Server));
        assert!(!mask.permits(ControlChannel::Devices, Side::Client));
        assert!(mask.permits(ControlChannel::Resources, Side::Server));
        assert_eq!(mask.to_spec(), "3,1,2,0,1");
    }

    #[test]
    fn parse_spec_rejects_bad_shapes() {
        assert!(matches!(
            ControlMask::parse_spec("1,1,1,1"),
            Err(TypesError::ControlSpecFormat(_))
        ));
        assert!(matches!(
            ControlMask::parse_spec("1;1;1;1;1"),
            Err(TypesError::ControlSpecFormat(_))
        ));
        assert!(matches!(
            ControlMask::parse_spec("é,1,1,1,1"),
            Err(TypesError::ControlSpecFormat(_))
        ));
    }

    #[test]
    fn parse_spec_rejects_out_of_range_values() {
        assert_eq!(
            ControlMask::parse_spec("4,0,0,0,0"),
            Err(TypesError::ControlSpecValue {
                element: "Keyboard",
                value: '4'
            })
        );
        // resources cannot be mirrored by both sides
        assert_eq!(
            ControlMask::parse_spec("0,0,0,0,3"),
            Err(TypesError::ControlSpecValue {
                element: "Resources",
                value: '3'
            })
        );
        assert!(ControlMask::parse_spec("x,0,0,0,0").is_err());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(ControlMask::DEFAULT.to_string(), "0x031d");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&ControlMask(0x0102)).unwrap();
        assert_eq!(json, "258");
    }
}
