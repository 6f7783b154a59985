//! Whole-tree persistence: the entire application state is serialized to a
//! single JSON blob on every mutation and rehydrated once at startup (plus
//! opportunistically when another writer touches the file).

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use log::info;
use serde::{Deserialize, Serialize};

use crate::models::{
    AttendanceRecord, KanbanColumn, LeaveRequest, Log, Message, Notification, Task, User, UserRole,
};

/// Bumped whenever the blob layout changes; `migrate` patches older blobs up.
pub const SCHEMA_VERSION: u32 = 2;

/// The whole state tree. Every collection defaults to empty so that blobs
/// written by older versions still rehydrate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub columns: Vec<KanbanColumn>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(default)]
    pub leaves: Vec<LeaveRequest>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub dark_mode: bool,
}

pub fn default_columns() -> Vec<KanbanColumn> {
    vec![
        KanbanColumn { id: "TODO".to_string(), title: "To Do".to_string() },
        KanbanColumn { id: "PROCESSING".to_string(), title: "Processing".to_string() },
        KanbanColumn { id: "DONE".to_string(), title: "Done".to_string() },
    ]
}

/// Initial state for a fresh deployment: the three demo accounts and the
/// default board.
pub fn seed() -> AppData {
    let now = chrono::Utc::now();
    let owner = User {
        id: "admin-1".to_string(),
        username: "admin".to_string(),
        email: "admin@company.com".to_string(),
        password: "admin".to_string(),
        needs_password_change: false,
        role: UserRole::Owner,
        avatar: None,
        is_online: false,
        department: Some("Management".to_string()),
        last_active_at: Some(now),
        job_title: Some("CEO".to_string()),
        phone: None,
        address: None,
        salary: None,
        joined_at: "2023-01-01T09:00:00Z".parse().ok(),
        documents: Vec::new(),
    };
    let administrator = User {
        id: "admin-2".to_string(),
        username: "manager".to_string(),
        email: "manager@company.com".to_string(),
        password: "manager".to_string(),
        needs_password_change: false,
        role: UserRole::Administrator,
        avatar: None,
        is_online: false,
        department: Some("Operations".to_string()),
        last_active_at: Some(now),
        job_title: Some("Operations Manager".to_string()),
        phone: None,
        address: None,
        salary: None,
        joined_at: "2023-02-15T09:00:00Z".parse().ok(),
        documents: Vec::new(),
    };
    let employee = User {
        id: "emp-1".to_string(),
        username: "john_doe".to_string(),
        email: "john@company.com".to_string(),
        password: "123".to_string(),
        // Forced rotation on first login for the demo account.
        needs_password_change: true,
        role: UserRole::Employee,
        avatar: None,
        is_online: false,
        department: Some("Engineering".to_string()),
        last_active_at: None,
        job_title: Some("Software Engineer".to_string()),
        phone: Some("555-0123".to_string()),
        address: Some("123 Tech Lane, Silicon Valley".to_string()),
        salary: Some(85000.0),
        joined_at: "2023-03-10T09:00:00Z".parse().ok(),
        documents: Vec::new(),
    };

    AppData {
        version: SCHEMA_VERSION,
        users: vec![owner, administrator, employee],
        tasks: Vec::new(),
        columns: default_columns(),
        messages: Vec::new(),
        logs: Vec::new(),
        leaves: Vec::new(),
        notifications: Vec::new(),
        attendance: Vec::new(),
        dark_mode: false,
    }
}

/// Patches a rehydrated blob up to the current schema. Missing collections
/// already defaulted to empty during deserialization; the board must never
/// end up without columns, so that one gets an explicit backfill.
pub fn migrate(mut data: AppData) -> AppData {
    if data.columns.is_empty() {
        data.columns = default_columns();
    }
    if data.version < SCHEMA_VERSION {
        info!("migrating state blob from v{} to v{}", data.version, SCHEMA_VERSION);
        data.version = SCHEMA_VERSION;
    }
    data
}

pub fn load(path: &Path) -> io::Result<AppData> {
    let raw = fs::read_to_string(path)?;
    let data: AppData = serde_json::from_str(&raw)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(migrate(data))
}

pub fn save(data: &AppData, path: &Path) -> io::Result<()> {
    let raw = serde_json::to_string(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, raw)
}

/// Modification stamp used to detect writes from another process.
pub fn disk_stamp(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_are_backfilled_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"version":1,"users":[],"tasks":[]}"#).unwrap();

        let data = load(&path).unwrap();
        assert_eq!(data.columns, default_columns());
        assert_eq!(data.version, SCHEMA_VERSION);
        assert!(data.messages.is_empty());
    }

    #[test]
    fn blob_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let data = seed();
        save(&data, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.users.len(), 3);
        assert_eq!(loaded.columns, data.columns);
        assert_eq!(loaded.users[2].username, "john_doe");
        assert!(loaded.users[2].needs_password_change);
    }
}
