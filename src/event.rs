//! Notifications delivered to live-update listeners.

use crate::envelope::Envelope;

/// Emitted after a transport session opens.
pub const CONNECTED: &str = "connected";
/// Emitted after a transport session closes, whatever the cause.
pub const DISCONNECTED: &str = "disconnected";
/// Emitted for transport errors and failed connection attempts.
pub const ERROR: &str = "error";

/// Payload handed to every listener of an event.
///
/// The three synthetic variants are local only and never travel over the
/// wire. `Message` carries the full inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Connected,
    Disconnected,
    Error(String),
    Message(Envelope),
}

impl Notification {
    /// The envelope for `Message` notifications.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Message(envelope) => Some(envelope),
            _ => None,
        }
    }
}
