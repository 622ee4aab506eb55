//! Strongly-typed identifiers for safeplayd

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a trackable game process.
///
/// Derived by the host from an executable name or its installation folder;
/// two processes launched from the same install folder collapse to one
/// GameId. The key is opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-friendly name for UI surfaces: the key without a trailing
    /// `.exe` (Windows process names carry the extension).
    pub fn display_name(&self) -> &str {
        self.0.strip_suffix(".exe").unwrap_or(&self.0)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a connected IPC client
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_equality() {
        let id1 = GameId::new("Celeste");
        let id2 = GameId::new("Celeste");
        let id3 = GameId::new("Hades");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn display_name_strips_exe() {
        assert_eq!(GameId::new("Celeste.exe").display_name(), "Celeste");
        assert_eq!(GameId::new("Celeste").display_name(), "Celeste");
    }

    #[test]
    fn client_id_uniqueness() {
        let c1 = ClientId::new();
        let c2 = ClientId::new();
        assert_ne!(c1, c2);
    }

    #[test]
    fn ids_serialize_deserialize() {
        let game_id = GameId::new("test-game");
        let json = serde_json::to_string(&game_id).unwrap();
        let parsed: GameId = serde_json::from_str(&json).unwrap();
        assert_eq!(game_id, parsed);
    }
}
