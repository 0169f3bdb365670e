// Application state module
// Holds the loaded configuration and the endpoint table, both fixed after startup

use super::types::Config;
use crate::handler::EndpointTable;

/// Application state shared read-only by every connection
pub struct AppState {
    pub config: Config,
    pub endpoints: EndpointTable,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            endpoints: EndpointTable::new(),
        }
    }
}
