//! Control bus entries and the in-process bus

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::trace;
use vantage_core::{Error, Result};

/// Horizontal pixel position of the target center
pub const CENTER_X: &str = "centerX";
/// Center x of the left tape
pub const LEFT_TARGET: &str = "leftTarget";
/// Center x of the right tape
pub const RIGHT_TARGET: &str = "rightTarget";
/// Estimated distance to the target
pub const DISTANCE_TARGET: &str = "distanceTarget";

const UPDATE_BUFFER_SIZE: usize = 256;

/// One group write, as seen by subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusUpdate {
    pub table: String,
    pub values: Vec<(String, f64)>,
    pub timestamp: DateTime<Utc>,
}

impl BusUpdate {
    pub fn get(&self, entry: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == entry)
            .map(|(_, value)| *value)
    }
}

/// Named numeric entries grouped into tables
pub trait ControlBus: Send + Sync {
    /// Write a single entry
    fn set_number(&self, table: &str, entry: &str, value: f64) -> Result<()> {
        self.set_numbers(table, &[(entry, value)])
    }

    /// Write several entries of one table as a group. Readers see either
    /// none or all of them.
    fn set_numbers(&self, table: &str, values: &[(&str, f64)]) -> Result<()>;

    /// Read an entry, `None` if it was never written
    fn get_number(&self, table: &str, entry: &str) -> Option<f64>;

    /// Subscribe to group writes made after this call
    fn subscribe(&self) -> broadcast::Receiver<BusUpdate>;
}

/// Bus kept in process memory
pub struct MemoryBus {
    tables: RwLock<HashMap<String, HashMap<String, f64>>>,
    update_sender: broadcast::Sender<BusUpdate>,
}

impl MemoryBus {
    pub fn new() -> Self {
        let (update_sender, _) = broadcast::channel(UPDATE_BUFFER_SIZE);
        Self {
            tables: RwLock::new(HashMap::new()),
            update_sender,
        }
    }

    /// Copy of every entry in a table
    pub fn table_snapshot(&self, table: &str) -> HashMap<String, f64> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    /// Names of all tables written so far
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBus for MemoryBus {
    fn set_numbers(&self, table: &str, values: &[(&str, f64)]) -> Result<()> {
        if table.is_empty() {
            return Err(Error::Bus("table name must not be empty".to_string()));
        }
        if let Some((entry, _)) = values.iter().find(|(entry, _)| entry.is_empty()) {
            return Err(Error::Bus(format!(
                "entry name must not be empty (table '{}', entry '{}')",
                table, entry
            )));
        }

        let mut tables = self.tables.write();
        let entries = tables.entry(table.to_string()).or_default();
        for (entry, value) in values {
            entries.insert((*entry).to_string(), *value);
        }

        let update = BusUpdate {
            table: table.to_string(),
            values: values
                .iter()
                .map(|(entry, value)| ((*entry).to_string(), *value))
                .collect(),
            timestamp: Utc::now(),
        };
        // Sent under the write lock so subscribers see updates in write order.
        // No subscribers is not an error.
        let _ = self.update_sender.send(update);
        trace!("Bus table '{}' updated with {} entries", table, values.len());

        Ok(())
    }

    fn get_number(&self, table: &str, entry: &str) -> Option<f64> {
        self.tables
            .read()
            .get(table)
            .and_then(|entries| entries.get(entry))
            .copied()
    }

    fn subscribe(&self) -> broadcast::Receiver<BusUpdate> {
        self.update_sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_number() {
        let bus = MemoryBus::new();
        assert_eq!(bus.get_number("TestTable", CENTER_X), None);

        bus.set_number("TestTable", CENTER_X, 42.0).unwrap();
        assert_eq!(bus.get_number("TestTable", CENTER_X), Some(42.0));
        assert_eq!(bus.get_number("OtherTable", CENTER_X), None);
    }

    #[test]
    fn test_group_write() {
        let bus = MemoryBus::new();
        bus.set_numbers(
            "TestTable",
            &[(CENTER_X, 160.0), (LEFT_TARGET, 110.0), (RIGHT_TARGET, 210.0)],
        )
        .unwrap();

        let snapshot = bus.table_snapshot("TestTable");
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[LEFT_TARGET], 110.0);
        assert_eq!(bus.table_names(), vec!["TestTable".to_string()]);
    }

    #[test]
    fn test_overwrite_keeps_other_entries() {
        let bus = MemoryBus::new();
        bus.set_numbers("t", &[(CENTER_X, 1.0), (DISTANCE_TARGET, 2.0)]).unwrap();
        bus.set_number("t", CENTER_X, 3.0).unwrap();

        assert_eq!(bus.get_number("t", CENTER_X), Some(3.0));
        assert_eq!(bus.get_number("t", DISTANCE_TARGET), Some(2.0));
    }

    #[test]
    fn test_empty_names_rejected() {
        let bus = MemoryBus::new();
        assert!(bus.set_number("", CENTER_X, 1.0).is_err());
        assert!(bus.set_number("t", "", 1.0).is_err());
        assert!(bus.table_names().is_empty());
    }

    #[test]
    fn test_subscribe_receives_group() {
        let bus = MemoryBus::new();
        let mut rx = bus.subscribe();

        bus.set_numbers("t", &[(CENTER_X, 5.0), (DISTANCE_TARGET, 6.0)]).unwrap();

        let update = rx.try_recv().unwrap();
        assert_eq!(update.table, "t");
        assert_eq!(update.values.len(), 2);
        assert_eq!(update.get(CENTER_X), Some(5.0));
        assert_eq!(update.get(LEFT_TARGET), None);
    }

    #[test]
    fn test_write_without_subscribers() {
        let bus = MemoryBus::default();
        assert!(bus.set_number("t", CENTER_X, 1.0).is_ok());
    }
}
