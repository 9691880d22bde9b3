//! Shared per-process state handed to every request handler.

use crate::config::Config;
use crate::error::RelayError;
use crate::transport::Forwarder;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let forwarder = Forwarder::new(&config)?;
        Ok(Self { config, forwarder })
    }
}
