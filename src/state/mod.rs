pub mod presence;
pub mod room_store;

pub use presence::PresenceDirectory;
pub use room_store::RoomStore;

use crate::clients::exec_client::ExecServiceClient;
use crate::config::Config;
use crate::ws::registry::{BroadcastGroups, ConnectionRegistry};

/// Everything the handlers share, built once at startup and passed
/// around behind an `Arc`. Protocol handlers read and mutate rooms and
/// presence only through these components.
pub struct AppState {
    pub config: Config,
    pub rooms: RoomStore,
    pub presence: PresenceDirectory,
    pub registry: ConnectionRegistry,
    pub groups: BroadcastGroups,
    pub exec_client: Option<ExecServiceClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let exec_client = match (&config.exec_client_id, &config.exec_client_secret) {
            (Some(id), Some(secret)) => Some(ExecServiceClient::new(
                config.exec_service_url.clone(),
                id.clone(),
                secret.clone(),
            )),
            _ => None,
        };
        Self {
            config,
            rooms: RoomStore::new(),
            presence: PresenceDirectory::new(),
            registry: ConnectionRegistry::new(),
            groups: BroadcastGroups::new(),
            exec_client,
        }
    }
}
