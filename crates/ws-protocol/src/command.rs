//! Device command set
//!
//! Every request on the wire is a single byte. Lasers answer `Identify` and
//! `Distance` with an ASCII line; the scale answers `Mass` with two raw bytes.

use std::fmt;

/// A single-byte device command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Identify / version query: `0x56` ('V')
    Identify,
    /// Distance measurement: `0x44` ('D')
    Distance,
    /// Mass sample: `0x45` ('E')
    Mass,
}

impl Command {
    /// Wire byte for this command
    pub const fn byte(self) -> u8 {
        match self {
            Command::Identify => 0x56,
            Command::Distance => 0x44,
            Command::Mass => 0x45,
        }
    }

    /// Decode a wire byte back into a command
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x56 => Some(Command::Identify),
            0x44 => Some(Command::Distance),
            0x45 => Some(Command::Mass),
            _ => None,
        }
    }

    /// Prefix a well-formed text reply to this command starts with
    ///
    /// Returns `None` for [`Command::Mass`], whose reply is binary.
    pub const fn reply_prefix(self) -> Option<&'static str> {
        match self {
            Command::Identify => Some("V:"),
            Command::Distance => Some("D:"),
            Command::Mass => None,
        }
    }

    /// Returns a human-readable name for the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Identify => "identify",
            Command::Distance => "distance",
            Command::Mass => "mass",
        }
    }

    /// Check whether a text line has the shape of a reply to this command
    ///
    /// A reply is well formed when it starts with the command's prefix and
    /// contains a comma. Mass replies are never text, so this is always
    /// false for [`Command::Mass`].
    pub fn accepts_reply(self, line: &str) -> bool {
        match self.reply_prefix() {
            Some(prefix) => line.starts_with(prefix) && line.contains(','),
            None => false,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.byte())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::Identify.byte(), b'V');
        assert_eq!(Command::Distance.byte(), b'D');
        assert_eq!(Command::Mass.byte(), b'E');
    }

    #[test]
    fn test_from_byte() {
        for cmd in [Command::Identify, Command::Distance, Command::Mass] {
            assert_eq!(Command::from_byte(cmd.byte()), Some(cmd));
        }
        assert_eq!(Command::from_byte(0x00), None);
    }

    #[test]
    fn test_accepts_identify_reply() {
        assert!(Command::Identify.accepts_reply("V:LDM058,1.02"));
        assert!(!Command::Identify.accepts_reply("V:LDM058"));
        assert!(!Command::Identify.accepts_reply("D:0.700m,ok"));
        assert!(!Command::Identify.accepts_reply(""));
    }

    #[test]
    fn test_accepts_distance_reply() {
        assert!(Command::Distance.accepts_reply("D:0.700m,ok"));
        assert!(!Command::Distance.accepts_reply("D:0.700m"));
        assert!(!Command::Distance.accepts_reply("V:LDM058,1.02"));
    }

    #[test]
    fn test_mass_has_no_text_reply() {
        assert_eq!(Command::Mass.reply_prefix(), None);
        assert!(!Command::Mass.accepts_reply("E:1,2"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Distance.to_string(), "distance (0x44)");
    }
}
