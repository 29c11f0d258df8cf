use serde::{Deserialize, Serialize};

/// A participant of a room, keyed by its connection id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

/// The shared document of a room: editor text plus the run metadata
/// (stdin, last stdout, selected language) that travels with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    pub code: String,
    pub language: String,
    pub input: String,
    pub output: String,
}

/// A collaborative session keyed by an external room id.
///
/// Rooms exist exactly as long as they have members: the first join
/// creates one, removal of the last member destroys it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub document: RoomDocument,
    pub members: Vec<Member>,
}
