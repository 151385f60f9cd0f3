//! D-Bus integration for the lock screen
//!
//! logind lives on the system bus; the lock backend and the shield's own
//! service live on the session bus.

use anyhow::{Context, Result};
use zbus::Connection;

pub mod backend;
pub mod login1;
pub mod service;

pub struct DbusManager {
    system: Connection,
    session: Connection,
}

impl DbusManager {
    /// Connect to the system and session buses
    pub async fn new() -> Result<Self> {
        let system = Connection::system()
            .await
            .context("Failed to connect to D-Bus system bus")?;
        let session = Connection::session()
            .await
            .context("Failed to connect to D-Bus session bus")?;

        tracing::info!("Connected to D-Bus system and session buses");

        Ok(Self { system, session })
    }

    pub fn system(&self) -> &Connection {
        &self.system
    }

    pub fn session(&self) -> &Connection {
        &self.session
    }
}
