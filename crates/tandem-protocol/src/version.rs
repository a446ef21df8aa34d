//! Protocol versioning.
//!
//! The server reports its version in the `connected` frame. A client that
//! does not know the major number should hang up.

use std::fmt;

/// Current protocol version.
pub const PROTOCOL_VERSION: Version = Version { major: 1, minor: 0 };

/// A `MAJOR.MINOR` protocol version. Only major bumps break clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_frame_carries_version() {
        let frame = crate::Frame::connected(crate::ConnectionId::new(1), PROTOCOL_VERSION, 25_000);
        let json = crate::codec::encode_json(&frame).unwrap();
        assert!(json.contains(r#""version":"1.0""#));
    }
}
