//! Matches the client reference of an imported row against existing clients.

use std::collections::{HashMap, HashSet};

use db::models::client::ClientOption;
use uuid::Uuid;

use super::csv_records::{CsvRow, field};

/// Columns that may identify a row's client, in lookup order
pub const CLIENT_COLUMNS: [&str; 3] = ["clientId", "clientName", "client"];

/// In-memory view of the clients table taken once per import
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    by_name: HashMap<String, Uuid>,
    ids: HashSet<Uuid>,
}

impl ClientSnapshot {
    pub fn from_options(options: impl IntoIterator<Item = ClientOption>) -> Self {
        let mut snapshot = Self::default();
        for option in options {
            snapshot.insert(option.id, option.client_name);
        }
        snapshot
    }

    /// Names are not unique in storage; the first client seen under a name keeps it.
    pub fn insert(&mut self, id: Uuid, client_name: String) {
        self.by_name
            .entry(client_name.to_lowercase())
            .or_insert(id);
        self.ids.insert(id);
    }

    pub fn resolve_name(&self, client_name: &str) -> Option<Uuid> {
        self.by_name.get(&client_name.to_lowercase()).copied()
    }

    pub fn contains_id(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMatch {
    Resolved(Uuid),
    /// Name given but unknown; the row waits for the client to be created
    NewClient(String),
    /// No usable id or name on the row
    Missing,
}

/// Resolve a row's client: a known `clientId` wins, then `clientName`, then `client`.
pub fn resolve_client(row: &CsvRow, snapshot: &ClientSnapshot) -> ClientMatch {
    let known_id = field(row, "clientId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .filter(|id| snapshot.contains_id(id));
    if let Some(id) = known_id {
        return ClientMatch::Resolved(id);
    }

    match field(row, "clientName").or_else(|| field(row, "client")) {
        Some(name) => match snapshot.resolve_name(name) {
            Some(id) => ClientMatch::Resolved(id),
            None => ClientMatch::NewClient(name.to_string()),
        },
        None => ClientMatch::Missing,
    }
}

/// Distinct unknown client names in first-seen order. Spellings that differ
/// only by case collapse into the first one.
#[derive(Debug, Clone, Default)]
pub struct NewClientCandidates {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl NewClientCandidates {
    pub fn record(&mut self, client_name: &str) {
        if self.seen.insert(client_name.to_lowercase()) {
            self.names.push(client_name.to_string());
        }
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}
