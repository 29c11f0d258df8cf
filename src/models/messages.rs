use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::patch::PatchHunk;
use crate::models::room::{Member, Room};

fn default_room_name() -> String {
    "Room X".to_string()
}

fn default_language() -> String {
    "javascript".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    #[serde(default = "default_room_name")]
    pub room_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub avatar: String,
}

/// Shared payload for every event that only names a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTarget {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub room_id: String,
    pub patch: Vec<PatchHunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetaRequest {
    pub room_id: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapIdentityRequest {
    pub user_id: String,
}

/// The room descriptor a permission request carries. Only the owner's
/// durable identity is interpreted; everything else is relayed as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRoom {
    pub owner: String,
    #[serde(flatten)]
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPermissionRequest {
    pub room: PermissionRoom,
    #[serde(default)]
    pub user: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReply {
    pub sender_id: String,
}

/// Opaque drawing payload, relayed verbatim to the rest of the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawData {
    pub room_id: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSignalRequest {
    pub target_id: String,
    pub caller_id: String,
    #[serde(default)]
    pub signal: Value,
    #[serde(default)]
    pub sender_info: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSignalReturn {
    pub caller_id: String,
    #[serde(default)]
    pub signal: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub room_id: String,
    pub user_id: String,
}

/// Events a client sends to the engine, one JSON object per text frame,
/// discriminated by the `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join")]
    Join(JoinRequest),
    #[serde(rename = "leave")]
    Leave(RoomTarget),
    #[serde(rename = "update")]
    Update(UpdateRequest),
    #[serde(rename = "updateMeta")]
    UpdateMeta(UpdateMetaRequest),
    #[serde(rename = "getRoomMembers")]
    GetRoomMembers(RoomTarget),
    #[serde(rename = "getRoom")]
    GetRoom(RoomTarget),
    #[serde(rename = "mapIdentity")]
    MapIdentity(MapIdentityRequest),
    #[serde(rename = "requestJoinPermission")]
    RequestJoinPermission(JoinPermissionRequest),
    #[serde(rename = "acceptPermission")]
    AcceptPermission(PermissionReply),
    #[serde(rename = "rejectPermission")]
    RejectPermission(PermissionReply),
    #[serde(rename = "drawRelay")]
    DrawRelay(DrawData),
    #[serde(rename = "startVideo")]
    StartVideo(RoomTarget),
    #[serde(rename = "sendVideoSignal")]
    SendVideoSignal(VideoSignalRequest),
    #[serde(rename = "returnVideoSignal")]
    ReturnVideoSignal(VideoSignalReturn),
    #[serde(rename = "toggleVideo")]
    ToggleVideo(ToggleRequest),
    #[serde(rename = "toggleAudio")]
    ToggleAudio(ToggleRequest),
    #[serde(rename = "debugDump")]
    DebugDump(RoomTarget),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    pub room: Room,
    pub connection_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberJoined {
    pub member: Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLeft {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftCall {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub room: Option<Room>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchRelay {
    pub patch: Vec<PatchHunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRelay {
    pub input: String,
    pub output: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllPeers {
    pub peers: Vec<Member>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingVideoSignal {
    pub signal: Value,
    pub caller_id: String,
    pub sender_info: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalVideoSignal {
    pub signal: Value,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequested {
    pub room: PermissionRoom,
    pub user: Value,
    pub sender_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleEvent {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugDump {
    pub room: Option<Room>,
    pub all_rooms: Vec<String>,
}

/// Events the engine sends to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joinAck")]
    JoinAck(JoinAck),
    #[serde(rename = "memberJoined")]
    MemberJoined(MemberJoined),
    #[serde(rename = "memberLeft")]
    MemberLeft(MemberLeft),
    #[serde(rename = "leftCall")]
    LeftCall(LeftCall),
    #[serde(rename = "roster")]
    Roster(Roster),
    #[serde(rename = "roomState")]
    RoomState(RoomState),
    #[serde(rename = "patchRelay")]
    PatchRelay(PatchRelay),
    #[serde(rename = "metaRelay")]
    MetaRelay(MetaRelay),
    #[serde(rename = "errorEvent")]
    ErrorEvent(ErrorEvent),
    #[serde(rename = "allPeers")]
    AllPeers(AllPeers),
    #[serde(rename = "incomingVideoSignal")]
    IncomingVideoSignal(IncomingVideoSignal),
    #[serde(rename = "finalVideoSignal")]
    FinalVideoSignal(FinalVideoSignal),
    #[serde(rename = "permissionRequest")]
    PermissionRequest(PermissionRequested),
    #[serde(rename = "permissionAccepted")]
    PermissionAccepted,
    #[serde(rename = "permissionRejected")]
    PermissionRejected,
    #[serde(rename = "drawRelay")]
    DrawRelay(DrawData),
    #[serde(rename = "toggleVideo")]
    ToggleVideo(ToggleEvent),
    #[serde(rename = "toggleAudio")]
    ToggleAudio(ToggleEvent),
    #[serde(rename = "debugDump")]
    DebugDump(DebugDump),
}
