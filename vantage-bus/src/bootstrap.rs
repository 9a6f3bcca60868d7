//! Bringing the node onto the bus as a client or as the server

use crate::bus::ControlBus;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use vantage_core::{BusMode, Error, Result};

/// Where the node is attached to the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusEndpoint {
    /// Hosting the bus
    Server,
    /// Connected to the robot controller for `team`
    Client { team: i32, address: String },
}

/// Robot controller address for a team number (`10.TE.AM.2`)
pub fn team_address(team: i32) -> Result<String> {
    if !(0..=9999).contains(&team) {
        return Err(Error::Bus(format!(
            "team number {} out of range (0-9999)",
            team
        )));
    }
    Ok(format!("10.{}.{}.2", team / 100, team % 100))
}

/// Starts and stops the node's bus role
pub struct BusBootstrap {
    bus: Arc<dyn ControlBus>,
    endpoint: RwLock<Option<BusEndpoint>>,
}

impl BusBootstrap {
    pub fn new(bus: Arc<dyn ControlBus>) -> Self {
        Self {
            bus,
            endpoint: RwLock::new(None),
        }
    }

    /// Start as server or as client of `team`'s controller
    pub fn start(&self, mode: BusMode, team: i32) -> Result<BusEndpoint> {
        let mut endpoint = self.endpoint.write();
        if endpoint.is_some() {
            return Err(Error::Bus("bus already started".to_string()));
        }

        let started = match mode {
            BusMode::Server => {
                info!("Setting up bus server");
                BusEndpoint::Server
            }
            BusMode::Client => {
                let address = team_address(team)?;
                info!("Setting up bus client for team {} ({})", team, address);
                BusEndpoint::Client { team, address }
            }
        };

        *endpoint = Some(started.clone());
        Ok(started)
    }

    pub fn stop(&self) {
        if self.endpoint.write().take().is_some() {
            info!("Bus stopped");
        }
    }

    pub fn endpoint(&self) -> Option<BusEndpoint> {
        self.endpoint.read().clone()
    }

    pub fn is_started(&self) -> bool {
        self.endpoint.read().is_some()
    }

    /// The bus this bootstrap manages
    pub fn bus(&self) -> Arc<dyn ControlBus> {
        self.bus.clone()
    }
}
