//! The application store: one process-wide state tree guarded by a mutex,
//! mutated only through the action methods below. Every action either fully
//! applies its next state or leaves the tree untouched, and each applied
//! mutation is flushed wholesale to the persistence blob before returning.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use chrono::{Duration, NaiveDate, Utc};
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, AttendanceStatus, ChecklistItem, EmployeeDocument, KanbanColumn,
    LeaveRequest, LeaveStatus, LeaveType, Log, Message, Notification, NotificationKind,
    SubmissionType, Task, TaskPriority, TaskSubmission, User, UserRole, BROADCAST_CHANNEL,
};
use crate::persistence::{self, AppData};

/// Heartbeats older than this refresh `last_active_at`.
const HEARTBEAT_STALE_SECS: i64 = 30;
/// Online users idle longer than this are flipped offline by the sweep.
const INACTIVITY_THRESHOLD_SECS: i64 = 2 * 60;
/// Retention windows applied by the startup cleanup.
const LOG_RETENTION_DAYS: i64 = 7;
const MESSAGE_RETENTION_DAYS: i64 = 30;

const MIN_PASSWORD_LEN: usize = 4;

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

struct Inner {
    data: AppData,
    disk_stamp: Option<SystemTime>,
}

pub struct Store {
    path: PathBuf,
    inner: Mutex<Inner>,
}

/* -------------------------------------------------------------------------- */
/* Action inputs                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub salary: Option<f64>,
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub salary: Option<f64>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewSubmission {
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub content: String,
    pub name: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeave {
    #[serde(rename = "type")]
    pub kind: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    pub user_id: String,
    pub date: NaiveDate,
    pub check_in: chrono::DateTime<Utc>,
    pub check_out: Option<chrono::DateTime<Utc>>,
    pub status: AttendanceStatus,
}

/* -------------------------------------------------------------------------- */
/* Side-effect helpers                                                        */
/* -------------------------------------------------------------------------- */

fn push_log(data: &mut AppData, action: &str, details: String, user_id: &str) {
    data.logs.insert(
        0,
        Log {
            id: generate_id(),
            action: action.to_string(),
            details,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        },
    );
}

fn notify(
    data: &mut AppData,
    user_id: &str,
    title: &str,
    message: String,
    kind: NotificationKind,
    link: Option<&str>,
) {
    data.notifications.insert(
        0,
        Notification {
            id: generate_id(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message,
            kind,
            is_read: false,
            timestamp: Utc::now(),
            link: link.map(|l| l.to_string()),
        },
    );
}

/// Fans one notification out to every owner and administrator.
fn notify_privileged(
    data: &mut AppData,
    title: &str,
    message: String,
    kind: NotificationKind,
    link: Option<&str>,
) {
    let targets: Vec<String> = data
        .users
        .iter()
        .filter(|u| u.role.is_privileged())
        .map(|u| u.id.clone())
        .collect();
    for id in targets {
        notify(data, &id, title, message.clone(), kind, link);
    }
}

fn username_of(data: &AppData, id: &str) -> String {
    data.users
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.username.clone())
        .unwrap_or_else(|| id.to_string())
}

impl Store {
    /// Rehydrates the state blob at `path`, or seeds a fresh tree when no
    /// blob exists yet.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Store> {
        let path = path.into();
        let data = if path.exists() {
            persistence::load(&path)?
        } else {
            let seeded = persistence::seed();
            persistence::save(&seeded, &path)?;
            info!("seeded fresh state at {}", path.display());
            seeded
        };
        let disk_stamp = persistence::disk_stamp(&path);
        Ok(Store { path, inner: Mutex::new(Inner { data, disk_stamp }) })
    }

    fn read<T>(&self, f: impl FnOnce(&AppData) -> T) -> T {
        let inner = self.inner.lock().unwrap();
        f(&inner.data)
    }

    /// Applies a mutation and flushes the blob when the closure reports a
    /// change. Write failures are logged, never fatal.
    fn mutate_if<T>(&self, f: impl FnOnce(&mut AppData) -> (T, bool)) -> T {
        let mut inner = self.inner.lock().unwrap();
        let (out, changed) = f(&mut inner.data);
        if changed {
            if let Err(e) = persistence::save(&inner.data, &self.path) {
                warn!("failed to persist state to {}: {}", self.path.display(), e);
            }
            inner.disk_stamp = persistence::disk_stamp(&self.path);
        }
        out
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut AppData) -> T) -> T {
        self.mutate_if(|data| (f(data), true))
    }

    /// Re-reads the blob when another process wrote it since our last
    /// load/save. Whole-object last-writer-wins, no merge.
    pub fn reload_if_changed(&self) {
        let mut inner = self.inner.lock().unwrap();
        let stamp = persistence::disk_stamp(&self.path);
        if stamp != inner.disk_stamp {
            match persistence::load(&self.path) {
                Ok(data) => {
                    inner.data = data;
                    inner.disk_stamp = stamp;
                    info!("state reloaded after external write");
                }
                Err(e) => warn!("could not reload state blob: {}", e),
            }
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Identity & session                                                     */
    /* ---------------------------------------------------------------------- */

    /// Exact plaintext triple match. The caller reports failure generically
    /// so usernames cannot be enumerated.
    pub fn login(&self, username: &str, password: &str, role: UserRole) -> Option<User> {
        self.mutate_if(|data| {
            let now = Utc::now();
            let found = data
                .users
                .iter_mut()
                .find(|u| u.username == username && u.role == role && u.password == password);
            match found {
                Some(user) => {
                    user.is_online = true;
                    user.last_active_at = Some(now);
                    let user = user.clone();
                    push_log(data, "LOGIN", format!("{} logged in.", user.username), &user.id);
                    (Some(user), true)
                }
                None => (None, false),
            }
        })
    }

    pub fn logout(&self, user_id: &str) -> bool {
        self.mutate_if(|data| {
            match data.users.iter_mut().find(|u| u.id == user_id) {
                Some(user) => {
                    user.is_online = false;
                    let username = user.username.clone();
                    push_log(data, "LOGOUT", format!("{} logged out.", username), user_id);
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Minimum length is enforced here rather than at the caller so the
    /// invariant holds regardless of which surface invokes it.
    pub fn change_password(&self, user_id: &str, new_password: &str) -> bool {
        if new_password.len() < MIN_PASSWORD_LEN {
            return false;
        }
        self.mutate_if(|data| {
            match data.users.iter_mut().find(|u| u.id == user_id) {
                Some(user) => {
                    user.password = new_password.to_string();
                    user.needs_password_change = false;
                    let username = user.username.clone();
                    push_log(
                        data,
                        "PASSWORD_CHANGE",
                        format!("{} changed their password.", username),
                        user_id,
                    );
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Session heartbeat: refreshes presence when the last stamp is stale or
    /// the user is marked offline.
    pub fn update_presence(&self, user_id: &str) {
        self.mutate_if(|data| {
            let now = Utc::now();
            if let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) {
                let stale = match user.last_active_at {
                    Some(t) => now - t > Duration::seconds(HEARTBEAT_STALE_SECS),
                    None => true,
                };
                if stale || !user.is_online {
                    user.is_online = true;
                    user.last_active_at = Some(now);
                    return ((), true);
                }
            }
            ((), false)
        })
    }

    /// Presence decay sweep: any online user idle past the threshold goes
    /// offline. Runs on a background interval.
    pub fn check_inactive_users(&self) {
        self.mutate_if(|data| {
            let now = Utc::now();
            let mut changed = false;
            for user in data.users.iter_mut().filter(|u| u.is_online) {
                let idle = match user.last_active_at {
                    Some(t) => now - t > Duration::seconds(INACTIVITY_THRESHOLD_SECS),
                    None => true,
                };
                if idle {
                    user.is_online = false;
                    changed = true;
                }
            }
            ((), changed)
        })
    }

    /// Age-based eviction of logs and messages, run once at session start.
    pub fn cleanup_old_data(&self) {
        self.mutate_if(|data| {
            let log_cutoff = Utc::now() - Duration::days(LOG_RETENTION_DAYS);
            let msg_cutoff = Utc::now() - Duration::days(MESSAGE_RETENTION_DAYS);
            let before = data.logs.len() + data.messages.len();
            data.logs.retain(|l| l.timestamp > log_cutoff);
            data.messages.retain(|m| m.timestamp > msg_cutoff);
            let evicted = before - data.logs.len() - data.messages.len();
            if evicted > 0 {
                info!("evicted {} aged-out entries", evicted);
            }
            ((), evicted > 0)
        })
    }

    pub fn add_user(&self, actor: &str, input: NewUser) -> User {
        self.mutate(|data| {
            let new_user = User {
                id: generate_id(),
                username: input.username,
                email: input.email,
                password: input.password,
                needs_password_change: true,
                role: input.role,
                avatar: input.avatar,
                is_online: false,
                department: input.department,
                last_active_at: None,
                job_title: input.job_title,
                phone: input.phone,
                address: input.address,
                salary: input.salary,
                joined_at: Some(Utc::now()),
                documents: Vec::new(),
            };
            push_log(
                data,
                "ADD_USER",
                format!("User {} was created.", new_user.username),
                actor,
            );
            data.messages.push(Message {
                id: generate_id(),
                sender_id: actor.to_string(),
                receiver_id: new_user.id.clone(),
                content: "Welcome to the team! Feel free to ask any questions.".to_string(),
                timestamp: Utc::now(),
                read_by: vec![actor.to_string()],
            });
            data.users.push(new_user.clone());
            new_user
        })
    }

    pub fn remove_user(&self, actor: &str, id: &str) -> bool {
        self.mutate_if(|data| {
            let Some(user) = data.users.iter().find(|u| u.id == id) else {
                return (false, false);
            };
            let username = user.username.clone();
            data.users.retain(|u| u.id != id);
            push_log(data, "REMOVE_USER", format!("User {} was removed.", username), actor);
            (true, true)
        })
    }

    /// Shallow profile merge. Role is immutable after creation, so it is not
    /// part of `UserUpdate`. Salary and department changes are audited.
    pub fn update_user(&self, actor: &str, id: &str, input: UserUpdate) -> Option<User> {
        self.mutate_if(|data| {
            let Some(user) = data.users.iter_mut().find(|u| u.id == id) else {
                return (None, false);
            };

            let mut changes: Vec<String> = Vec::new();
            if let Some(salary) = input.salary {
                if user.salary != Some(salary) {
                    changes.push(format!("salary to {}", salary));
                }
            }
            if let Some(department) = &input.department {
                if user.department.as_deref() != Some(department) {
                    changes.push(format!("department to {}", department));
                }
            }

            if let Some(username) = input.username {
                user.username = username;
            }
            if let Some(email) = input.email {
                user.email = email;
            }
            if let Some(department) = input.department {
                user.department = Some(department);
            }
            if let Some(job_title) = input.job_title {
                user.job_title = Some(job_title);
            }
            if let Some(phone) = input.phone {
                user.phone = Some(phone);
            }
            if let Some(address) = input.address {
                user.address = Some(address);
            }
            if let Some(salary) = input.salary {
                user.salary = Some(salary);
            }
            if let Some(avatar) = input.avatar {
                user.avatar = Some(avatar);
            }

            let updated = user.clone();
            if !changes.is_empty() {
                push_log(
                    data,
                    "UPDATE_USER",
                    format!("Updated {}'s {}.", updated.username, changes.join(", ")),
                    actor,
                );
            }
            (Some(updated), true)
        })
    }

    pub fn add_document(
        &self,
        actor: &str,
        user_id: &str,
        input: NewDocument,
    ) -> Option<EmployeeDocument> {
        self.mutate_if(|data| {
            let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) else {
                return (None, false);
            };
            let doc = EmployeeDocument {
                id: generate_id(),
                name: input.name,
                kind: input.kind,
                url: input.url,
                uploaded_at: Utc::now(),
            };
            user.documents.push(doc.clone());
            let username = user.username.clone();
            push_log(
                data,
                "UPLOAD_DOCUMENT",
                format!("Uploaded document \"{}\" for {}.", doc.name, username),
                actor,
            );
            (Some(doc), true)
        })
    }

    pub fn remove_document(&self, actor: &str, user_id: &str, doc_id: &str) -> bool {
        self.mutate_if(|data| {
            let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) else {
                return (false, false);
            };
            let Some(doc) = user.documents.iter().find(|d| d.id == doc_id) else {
                return (false, false);
            };
            let doc_name = doc.name.clone();
            let username = user.username.clone();
            user.documents.retain(|d| d.id != doc_id);
            push_log(
                data,
                "REMOVE_DOCUMENT",
                format!("Removed document \"{}\" from {}.", doc_name, username),
                actor,
            );
            (true, true)
        })
    }

    pub fn toggle_dark_mode(&self) -> bool {
        self.mutate(|data| {
            data.dark_mode = !data.dark_mode;
            data.dark_mode
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Reads                                                                  */
    /* ---------------------------------------------------------------------- */

    pub fn users(&self) -> Vec<User> {
        self.read(|data| data.users.clone())
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.read(|data| data.users.iter().find(|u| u.id == id).cloned())
    }

    pub fn logs(&self) -> Vec<Log> {
        self.read(|data| data.logs.clone())
    }

    pub fn columns(&self) -> Vec<KanbanColumn> {
        self.read(|data| data.columns.clone())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.read(|data| data.tasks.clone())
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.read(|data| data.tasks.iter().find(|t| t.id == id).cloned())
    }

    pub fn leaves(&self) -> Vec<LeaveRequest> {
        self.read(|data| data.leaves.clone())
    }

    pub fn attendance(&self) -> Vec<AttendanceRecord> {
        self.read(|data| data.attendance.clone())
    }

    /// Full snapshot for the export surface.
    pub fn snapshot(&self) -> AppData {
        self.read(|data| data.clone())
    }

    /// Direct thread between two users, or the broadcast thread when `peer`
    /// is the broadcast sentinel. Chronological order.
    pub fn conversation(&self, user_id: &str, peer_id: &str) -> Vec<Message> {
        self.read(|data| {
            data.messages
                .iter()
                .filter(|m| {
                    if peer_id == BROADCAST_CHANNEL {
                        m.receiver_id == BROADCAST_CHANNEL
                    } else {
                        (m.sender_id == user_id && m.receiver_id == peer_id)
                            || (m.sender_id == peer_id && m.receiver_id == user_id)
                    }
                })
                .cloned()
                .collect()
        })
    }

    pub fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        self.read(|data| {
            data.notifications.iter().filter(|n| n.user_id == user_id).cloned().collect()
        })
    }

    /// Unread count is derived, never stored.
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.read(|data| {
            data.notifications.iter().filter(|n| n.user_id == user_id && !n.is_read).count()
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Notifications                                                          */
    /* ---------------------------------------------------------------------- */

    pub fn mark_notification_read(&self, id: &str) -> bool {
        self.mutate_if(|data| {
            match data.notifications.iter_mut().find(|n| n.id == id) {
                Some(n) if !n.is_read => {
                    n.is_read = true;
                    (true, true)
                }
                Some(_) => (true, false),
                None => (false, false),
            }
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) {
        self.mutate_if(|data| {
            let mut changed = false;
            for n in data.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.is_read) {
                n.is_read = true;
                changed = true;
            }
            ((), changed)
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Board configuration                                                    */
    /* ---------------------------------------------------------------------- */

    pub fn add_column(&self, title: &str) -> KanbanColumn {
        self.mutate(|data| {
            let column = KanbanColumn { id: generate_id(), title: title.to_string() };
            data.columns.push(column.clone());
            column
        })
    }

    pub fn update_column(&self, id: &str, title: &str) -> bool {
        self.mutate_if(|data| {
            match data.columns.iter_mut().find(|c| c.id == id) {
                Some(column) => {
                    column.title = title.to_string();
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Deleting a column that still holds tasks is a guarded no-op: the
    /// caller must move or delete those tasks first.
    pub fn delete_column(&self, id: &str) -> Result<(), &'static str> {
        self.mutate_if(|data| {
            if !data.columns.iter().any(|c| c.id == id) {
                return (Err("Column not found"), false);
            }
            if data.tasks.iter().any(|t| t.status == id) {
                return (Err("Column still has tasks assigned"), false);
            }
            data.columns.retain(|c| c.id != id);
            (Ok(()), true)
        })
    }

    /// Full reorder replace, used by drag-and-drop reordering.
    pub fn set_columns(&self, columns: Vec<KanbanColumn>) {
        self.mutate(|data| {
            data.columns = columns;
        });
    }

    /* ---------------------------------------------------------------------- */
    /* Task engine                                                            */
    /* ---------------------------------------------------------------------- */

    pub fn add_task(&self, actor: &str, input: NewTask) -> Task {
        self.mutate(|data| {
            let status = input
                .status
                .filter(|s| data.columns.iter().any(|c| &c.id == s))
                .or_else(|| data.columns.first().map(|c| c.id.clone()))
                .unwrap_or_default();
            let now = Utc::now();
            let task = Task {
                id: generate_id(),
                title: input.title,
                description: input.description,
                status,
                priority: input.priority.unwrap_or(TaskPriority::Medium),
                assignee_id: input.assignee_id,
                created_by: actor.to_string(),
                created_at: now,
                updated_at: now,
                completed_at: None,
                completion_notes: None,
                checklist: Vec::new(),
                submissions: Vec::new(),
            };
            push_log(data, "TASK_CREATED", format!("Task \"{}\" created.", task.title), actor);
            if let Some(assignee) = task.assignee_id.clone() {
                notify(
                    data,
                    &assignee,
                    "New Task Assigned",
                    format!("You have been assigned: {}", task.title),
                    NotificationKind::Info,
                    Some("/tasks"),
                );
            }
            data.tasks.push(task.clone());
            task
        })
    }

    /// Moves a task between columns. Entering the terminal column stamps
    /// `completed_at` and fans a completion notice out to the privileged
    /// roles; leaving it clears the stamp again.
    pub fn update_task_status(
        &self,
        actor: &str,
        task_id: &str,
        status: &str,
        notes: Option<String>,
    ) -> Result<Task, &'static str> {
        self.mutate_if(|data| {
            if !data.columns.iter().any(|c| c.id == status) {
                return (Err("Unknown column"), false);
            }
            let is_terminal = data.columns.last().map(|c| c.id == status).unwrap_or(false);
            let Some(task) = data.tasks.iter_mut().find(|t| t.id == task_id) else {
                return (Err("Task not found"), false);
            };

            task.status = status.to_string();
            task.updated_at = Utc::now();
            if let Some(notes) = notes {
                task.completion_notes = Some(notes);
            }
            task.completed_at = if is_terminal { Some(Utc::now()) } else { None };
            let task = task.clone();

            push_log(
                data,
                "TASK_MOVED",
                format!("Task \"{}\" moved to {}.", task.title, status),
                actor,
            );
            if is_terminal {
                let actor_name = username_of(data, actor);
                notify_privileged(
                    data,
                    "Task Completed",
                    format!("{} completed task: {}", actor_name, task.title),
                    NotificationKind::Success,
                    Some("/tasks"),
                );
            }
            (Ok(task), true)
        })
    }

    pub fn update_task(&self, actor: &str, task_id: &str, input: TaskUpdate) -> Option<Task> {
        self.mutate_if(|data| {
            let Some(task) = data.tasks.iter_mut().find(|t| t.id == task_id) else {
                return (None, false);
            };
            if let Some(title) = input.title {
                task.title = title;
            }
            if let Some(description) = input.description {
                task.description = description;
            }
            if let Some(priority) = input.priority {
                task.priority = priority;
            }
            if let Some(assignee_id) = input.assignee_id {
                task.assignee_id = Some(assignee_id);
            }
            task.updated_at = Utc::now();
            let task = task.clone();
            push_log(data, "TASK_UPDATED", format!("Task \"{}\" updated.", task.title), actor);
            (Some(task), true)
        })
    }

    /// Appends an immutable submission. A submission against a task still in
    /// the intake column auto-advances it to the second column (when the
    /// board has at least two).
    pub fn add_task_submission(
        &self,
        actor: &str,
        task_id: &str,
        input: NewSubmission,
    ) -> Option<Task> {
        self.mutate_if(|data| {
            let next_status = match (data.columns.first(), data.columns.get(1)) {
                (Some(first), Some(second)) => {
                    let intake = first.id.clone();
                    Some((intake, second.id.clone()))
                }
                _ => None,
            };
            let Some(task) = data.tasks.iter_mut().find(|t| t.id == task_id) else {
                return (None, false);
            };

            if let Some((intake, second)) = next_status {
                if task.status == intake {
                    task.status = second;
                }
            }
            let submission = TaskSubmission {
                id: generate_id(),
                kind: input.kind,
                content: input.content,
                name: input.name,
                language: input.language,
                submitted_at: Utc::now(),
            };
            let kind_label = submission.kind.label();
            task.submissions.push(submission);
            task.updated_at = Utc::now();
            let task = task.clone();

            push_log(
                data,
                "SUBMISSION_ADDED",
                format!("Submission added to task \"{}\".", task.title),
                actor,
            );
            let actor_name = username_of(data, actor);
            notify_privileged(
                data,
                "New Work Submission",
                format!("{} added a {} submission to: {}", actor_name, kind_label, task.title),
                NotificationKind::Info,
                Some("/tasks"),
            );
            (Some(task), true)
        })
    }

    pub fn delete_task(&self, actor: &str, task_id: &str) -> bool {
        self.mutate_if(|data| {
            let Some(task) = data.tasks.iter().find(|t| t.id == task_id) else {
                return (false, false);
            };
            let title = task.title.clone();
            data.tasks.retain(|t| t.id != task_id);
            push_log(data, "TASK_DELETED", format!("Task \"{}\" deleted.", title), actor);
            (true, true)
        })
    }

    pub fn add_checklist_item(&self, task_id: &str, text: &str) -> Option<ChecklistItem> {
        self.mutate_if(|data| {
            let Some(task) = data.tasks.iter_mut().find(|t| t.id == task_id) else {
                return (None, false);
            };
            let item =
                ChecklistItem { id: generate_id(), text: text.to_string(), is_completed: false };
            task.checklist.push(item.clone());
            (Some(item), true)
        })
    }

    pub fn toggle_checklist_item(&self, task_id: &str, item_id: &str) -> bool {
        self.mutate_if(|data| {
            let item = data
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .and_then(|t| t.checklist.iter_mut().find(|i| i.id == item_id));
            match item {
                Some(item) => {
                    item.is_completed = !item.is_completed;
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    pub fn remove_checklist_item(&self, task_id: &str, item_id: &str) -> bool {
        self.mutate_if(|data| {
            let Some(task) = data.tasks.iter_mut().find(|t| t.id == task_id) else {
                return (false, false);
            };
            let before = task.checklist.len();
            task.checklist.retain(|i| i.id != item_id);
            let removed = task.checklist.len() != before;
            (removed, removed)
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Messaging                                                              */
    /* ---------------------------------------------------------------------- */

    /// Posting to the broadcast channel is restricted to owners and
    /// administrators here in the store, not just at the UI.
    pub fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, &'static str> {
        self.mutate_if(|data| {
            let Some(sender) = data.users.iter().find(|u| u.id == sender_id) else {
                return (Err("Unknown sender"), false);
            };
            if receiver_id == BROADCAST_CHANNEL && !sender.role.is_privileged() {
                return (Err("Only owners and administrators may post to the broadcast channel"), false);
            }
            let sender_name = sender.username.clone();

            let message = Message {
                id: generate_id(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                content: content.to_string(),
                timestamp: Utc::now(),
                read_by: vec![sender_id.to_string()],
            };
            data.messages.push(message.clone());

            if receiver_id != BROADCAST_CHANNEL {
                notify(
                    data,
                    receiver_id,
                    "New Message",
                    format!("New message from {}", sender_name),
                    NotificationKind::Info,
                    Some("/chat"),
                );
            }
            (Ok(message), true)
        })
    }

    /// Adds `reader_id` to the read set of every message from `sender_id`
    /// addressed to `receiver_id` or to the broadcast channel. Idempotent,
    /// with a no-op fast path that avoids a pointless blob write.
    pub fn mark_messages_read(&self, reader_id: &str, sender_id: &str, receiver_id: &str) {
        self.mutate_if(|data| {
            let mut changed = false;
            for m in data.messages.iter_mut() {
                let relevant = m.sender_id == sender_id
                    && (m.receiver_id == receiver_id || m.receiver_id == BROADCAST_CHANNEL);
                if relevant && !m.read_by.iter().any(|r| r == reader_id) {
                    m.read_by.push(reader_id.to_string());
                    changed = true;
                }
            }
            ((), changed)
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Leave workflow                                                         */
    /* ---------------------------------------------------------------------- */

    pub fn add_leave_request(&self, user_id: &str, input: NewLeave) -> LeaveRequest {
        self.mutate(|data| {
            let request = LeaveRequest {
                id: generate_id(),
                user_id: user_id.to_string(),
                kind: input.kind,
                start_date: input.start_date,
                end_date: input.end_date,
                status: LeaveStatus::Pending,
                reason: input.reason,
            };
            data.leaves.push(request.clone());
            let requester = username_of(data, user_id);
            notify_privileged(
                data,
                "New Leave Request",
                format!("{} requested {} leave", requester, request.kind.label()),
                NotificationKind::Warning,
                Some("/leaves"),
            );
            request
        })
    }

    /// One-way transition: PENDING may become APPROVED or REJECTED, and a
    /// decided request never changes again.
    pub fn update_leave_status(
        &self,
        id: &str,
        status: LeaveStatus,
    ) -> Result<LeaveRequest, &'static str> {
        if status == LeaveStatus::Pending {
            return Err("Leave requests cannot return to pending");
        }
        self.mutate_if(|data| {
            let Some(leave) = data.leaves.iter_mut().find(|l| l.id == id) else {
                return (Err("Leave request not found"), false);
            };
            if leave.status != LeaveStatus::Pending {
                return (Err("Leave request already decided"), false);
            }
            leave.status = status;
            let leave = leave.clone();

            let (title, message, kind) = match status {
                LeaveStatus::Approved => (
                    "Leave Request APPROVED",
                    "Your leave request has been approved.".to_string(),
                    NotificationKind::Success,
                ),
                _ => (
                    "Leave Request REJECTED",
                    "Your leave request has been rejected.".to_string(),
                    NotificationKind::Error,
                ),
            };
            let requester = leave.user_id.clone();
            notify(data, &requester, title, message, kind, Some("/profile"));
            (Ok(leave), true)
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Attendance                                                             */
    /* ---------------------------------------------------------------------- */

    /// Idempotent per (user, day): a second clock-in the same day is a no-op.
    pub fn clock_in(&self, user_id: &str) -> Option<AttendanceRecord> {
        self.mutate_if(|data| {
            let today = Utc::now().date_naive();
            if data.attendance.iter().any(|a| a.user_id == user_id && a.date == today) {
                return (None, false);
            }
            let now = Utc::now();
            let record = AttendanceRecord {
                id: generate_id(),
                user_id: user_id.to_string(),
                date: today,
                check_in: now,
                check_out: None,
                status: AttendanceStatus::Present,
            };
            data.attendance.insert(0, record.clone());
            push_log(
                data,
                "CLOCK_IN",
                format!("User clocked in at {}.", now.format("%H:%M")),
                user_id,
            );
            (Some(record), true)
        })
    }

    /// Clocking out without a matching clock-in for the day is rejected.
    /// Re-clocking out overwrites the previous stamp.
    pub fn clock_out(&self, user_id: &str) -> Option<AttendanceRecord> {
        self.mutate_if(|data| {
            let today = Utc::now().date_naive();
            let now = Utc::now();
            let Some(record) =
                data.attendance.iter_mut().find(|a| a.user_id == user_id && a.date == today)
            else {
                return (None, false);
            };
            record.check_out = Some(now);
            let record = record.clone();
            push_log(
                data,
                "CLOCK_OUT",
                format!("User clocked out at {}.", now.format("%H:%M")),
                user_id,
            );
            (Some(record), true)
        })
    }

    /// Manual entry, used by administrators to correct history.
    pub fn add_attendance_record(&self, input: NewAttendance) -> AttendanceRecord {
        self.mutate(|data| {
            let record = AttendanceRecord {
                id: generate_id(),
                user_id: input.user_id,
                date: input.date,
                check_in: input.check_in,
                check_out: input.check_out,
                status: input.status,
            };
            data.attendance.insert(0, record.clone());
            record
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (Store, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("state.json")).unwrap();
        (store, dir)
    }

    fn sample_task(store: &Store) -> Task {
        store.add_task(
            "admin-1",
            NewTask {
                title: "Write report".to_string(),
                description: "Quarterly numbers".to_string(),
                status: None,
                priority: None,
                assignee_id: None,
            },
        )
    }

    #[test]
    fn clock_in_is_idempotent_per_day() {
        let (store, _dir) = test_store();
        assert!(store.clock_in("emp-1").is_some());
        assert!(store.clock_in("emp-1").is_none());

        let today = Utc::now().date_naive();
        let records: Vec<_> = store
            .attendance()
            .into_iter()
            .filter(|a| a.user_id == "emp-1" && a.date == today)
            .collect();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn clock_out_requires_a_clock_in() {
        let (store, _dir) = test_store();
        assert!(store.clock_out("emp-1").is_none());
        assert!(store.attendance().is_empty());

        store.clock_in("emp-1");
        let record = store.clock_out("emp-1").unwrap();
        assert!(record.check_out.is_some());
    }

    #[test]
    fn terminal_column_stamps_completion_and_fans_out() {
        let (store, _dir) = test_store();
        let task = sample_task(&store);
        assert_eq!(task.status, "TODO");
        assert!(task.completed_at.is_none());

        let done = store
            .update_task_status("emp-1", &task.id, "DONE", Some("shipped".to_string()))
            .unwrap();
        assert_eq!(done.status, "DONE");
        assert!(done.completed_at.is_some());
        assert_eq!(done.completion_notes.as_deref(), Some("shipped"));

        // One SUCCESS notice per privileged user.
        for admin in ["admin-1", "admin-2"] {
            let notices: Vec<_> = store
                .notifications_for(admin)
                .into_iter()
                .filter(|n| n.title == "Task Completed")
                .collect();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].kind, NotificationKind::Success);
        }
        assert!(store
            .notifications_for("emp-1")
            .iter()
            .all(|n| n.title != "Task Completed"));

        // Moving back out of the terminal column clears the stamp.
        let reopened = store.update_task_status("emp-1", &task.id, "PROCESSING", None).unwrap();
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn status_must_reference_an_existing_column() {
        let (store, _dir) = test_store();
        let task = sample_task(&store);
        assert!(store.update_task_status("admin-1", &task.id, "NOPE", None).is_err());
        assert_eq!(store.task(&task.id).unwrap().status, "TODO");
    }

    #[test]
    fn read_receipts_only_grow() {
        let (store, _dir) = test_store();
        let msg = store.send_message("admin-1", BROADCAST_CHANNEL, "All hands at 3pm").unwrap();
        assert_eq!(msg.read_by, vec!["admin-1".to_string()]);

        store.mark_messages_read("emp-1", "admin-1", BROADCAST_CHANNEL);
        store.mark_messages_read("emp-1", "admin-1", BROADCAST_CHANNEL);
        store.mark_messages_read("admin-2", "admin-1", BROADCAST_CHANNEL);

        let thread = store.conversation("emp-1", BROADCAST_CHANNEL);
        assert_eq!(thread.len(), 1);
        let read_by = &thread[0].read_by;
        assert_eq!(read_by.len(), 3);
        assert!(read_by.contains(&"admin-1".to_string()));
        assert!(read_by.contains(&"emp-1".to_string()));
        assert!(read_by.contains(&"admin-2".to_string()));
    }

    #[test]
    fn broadcast_posting_is_role_gated_in_the_store() {
        let (store, _dir) = test_store();
        assert!(store.send_message("emp-1", BROADCAST_CHANNEL, "hi all").is_err());
        assert!(store.conversation("emp-1", BROADCAST_CHANNEL).is_empty());

        assert!(store.send_message("admin-2", BROADCAST_CHANNEL, "hi all").is_ok());
    }

    #[test]
    fn direct_message_notifies_the_receiver() {
        let (store, _dir) = test_store();
        store.send_message("admin-1", "emp-1", "ping").unwrap();
        let notices = store.notifications_for("emp-1");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "New Message");
        assert_eq!(store.unread_count("emp-1"), 1);

        store.mark_all_notifications_read("emp-1");
        assert_eq!(store.unread_count("emp-1"), 0);
    }

    #[test]
    fn referenced_column_cannot_be_deleted() {
        let (store, _dir) = test_store();
        let task = sample_task(&store);
        assert_eq!(task.status, "TODO");

        assert!(store.delete_column("TODO").is_err());
        assert_eq!(store.columns().len(), 3);
        assert_eq!(store.task(&task.id).unwrap().status, "TODO");

        let spare = store.add_column("Blocked");
        assert!(store.delete_column(&spare.id).is_ok());
        assert_eq!(store.columns().len(), 3);
    }

    #[test]
    fn leave_request_fans_out_and_decision_notifies_requester() {
        let (store, _dir) = test_store();
        let request = store.add_leave_request(
            "emp-1",
            NewLeave {
                kind: LeaveType::Vacation,
                start_date: "2026-09-01".parse().unwrap(),
                end_date: "2026-09-05".parse().unwrap(),
                reason: "Family trip".to_string(),
            },
        );
        assert_eq!(request.status, LeaveStatus::Pending);

        for admin in ["admin-1", "admin-2"] {
            let notices: Vec<_> = store
                .notifications_for(admin)
                .into_iter()
                .filter(|n| n.title == "New Leave Request")
                .collect();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].kind, NotificationKind::Warning);
        }

        let decided = store.update_leave_status(&request.id, LeaveStatus::Approved).unwrap();
        assert_eq!(decided.status, LeaveStatus::Approved);
        let notices: Vec<_> = store
            .notifications_for("emp-1")
            .into_iter()
            .filter(|n| n.title.starts_with("Leave Request"))
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NotificationKind::Success);

        // Decisions are one-way.
        assert!(store.update_leave_status(&request.id, LeaveStatus::Rejected).is_err());
        assert!(store.update_leave_status(&request.id, LeaveStatus::Pending).is_err());
    }

    #[test]
    fn forced_password_rotation_scenario() {
        let (store, _dir) = test_store();
        let user = store.login("john_doe", "123", UserRole::Employee).unwrap();
        assert!(user.needs_password_change);
        assert!(user.is_online);

        // Wrong role is a generic failure even with correct credentials.
        assert!(store.login("john_doe", "123", UserRole::Owner).is_none());

        assert!(!store.change_password(&user.id, "abc"));
        assert!(store.change_password(&user.id, "abcd"));

        let updated = store.user(&user.id).unwrap();
        assert!(!updated.needs_password_change);
        assert_eq!(updated.password, "abcd");
        assert!(store.login("john_doe", "123", UserRole::Employee).is_none());
        assert!(store.login("john_doe", "abcd", UserRole::Employee).is_some());
    }

    #[test]
    fn first_submission_auto_advances_from_intake() {
        let (store, _dir) = test_store();
        let task = sample_task(&store);

        let updated = store
            .add_task_submission(
                "emp-1",
                &task.id,
                NewSubmission {
                    kind: SubmissionType::Text,
                    content: "draft attached".to_string(),
                    name: None,
                    language: None,
                },
            )
            .unwrap();
        assert_eq!(updated.status, "PROCESSING");
        assert_eq!(updated.submissions.len(), 1);

        // A later submission leaves the status alone.
        let again = store
            .add_task_submission(
                "emp-1",
                &task.id,
                NewSubmission {
                    kind: SubmissionType::Link,
                    content: "https://example.com".to_string(),
                    name: None,
                    language: None,
                },
            )
            .unwrap();
        assert_eq!(again.status, "PROCESSING");
        assert_eq!(again.submissions.len(), 2);
    }

    #[test]
    fn assignment_notifies_the_assignee() {
        let (store, _dir) = test_store();
        store.add_task(
            "admin-1",
            NewTask {
                title: "Fix login page".to_string(),
                description: String::new(),
                status: None,
                priority: Some(TaskPriority::High),
                assignee_id: Some("emp-1".to_string()),
            },
        );
        let notices = store.notifications_for("emp-1");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "New Task Assigned");
    }

    #[test]
    fn inactivity_sweep_flips_idle_users_offline() {
        let (store, _dir) = test_store();
        store.login("john_doe", "123", UserRole::Employee).unwrap();
        store.mutate(|data| {
            let user = data.users.iter_mut().find(|u| u.id == "emp-1").unwrap();
            user.last_active_at = Some(Utc::now() - Duration::seconds(180));
        });

        store.check_inactive_users();
        assert!(!store.user("emp-1").unwrap().is_online);
    }

    #[test]
    fn heartbeat_refreshes_stale_presence() {
        let (store, _dir) = test_store();
        store.login("john_doe", "123", UserRole::Employee).unwrap();
        store.mutate(|data| {
            let user = data.users.iter_mut().find(|u| u.id == "emp-1").unwrap();
            user.is_online = false;
            user.last_active_at = Some(Utc::now() - Duration::seconds(120));
        });

        store.update_presence("emp-1");
        let user = store.user("emp-1").unwrap();
        assert!(user.is_online);
        assert!(Utc::now() - user.last_active_at.unwrap() < Duration::seconds(5));
    }

    #[test]
    fn cleanup_evicts_aged_logs_and_messages() {
        let (store, _dir) = test_store();
        store.send_message("admin-1", "emp-1", "recent").unwrap();
        store.mutate(|data| {
            push_log(data, "LOGIN", "ancient entry".to_string(), "emp-1");
            data.logs[0].timestamp = Utc::now() - Duration::days(8);
            data.messages.push(Message {
                id: generate_id(),
                sender_id: "admin-1".to_string(),
                receiver_id: "emp-1".to_string(),
                content: "ancient".to_string(),
                timestamp: Utc::now() - Duration::days(31),
                read_by: vec!["admin-1".to_string()],
            });
        });

        store.cleanup_old_data();
        assert!(store.logs().iter().all(|l| l.details != "ancient entry"));
        let thread = store.conversation("admin-1", "emp-1");
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].content, "recent");
    }

    #[test]
    fn external_write_wins_on_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let tab_a = Store::open(&path).unwrap();
        let tab_b = Store::open(&path).unwrap();

        let request = tab_b.add_leave_request(
            "emp-1",
            NewLeave {
                kind: LeaveType::Sick,
                start_date: "2026-08-26".parse().unwrap(),
                end_date: "2026-08-27".parse().unwrap(),
                reason: "Flu".to_string(),
            },
        );
        std::thread::sleep(std::time::Duration::from_millis(20));
        tab_a.reload_if_changed();
        tab_a.update_leave_status(&request.id, LeaveStatus::Approved).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        tab_b.reload_if_changed();
        let leaves = tab_b.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].status, LeaveStatus::Approved);
    }

    #[test]
    fn removing_a_user_keeps_the_rest_intact() {
        let (store, _dir) = test_store();
        let created = store.add_user(
            "admin-1",
            NewUser {
                username: "jane".to_string(),
                email: "jane@company.com".to_string(),
                password: "temp1234".to_string(),
                role: UserRole::Employee,
                department: Some("Design".to_string()),
                job_title: None,
                phone: None,
                address: None,
                salary: None,
                avatar: None,
            },
        );
        assert!(created.needs_password_change);
        // Welcome message seeds the read set with its sender.
        let welcome = store.conversation("admin-1", &created.id);
        assert_eq!(welcome.len(), 1);
        assert!(welcome[0].read_by.contains(&"admin-1".to_string()));

        assert!(store.remove_user("admin-1", &created.id));
        assert!(!store.remove_user("admin-1", &created.id));
        assert_eq!(store.users().len(), 3);
    }

    #[test]
    fn profile_updates_audit_salary_and_department() {
        let (store, _dir) = test_store();
        store
            .update_user(
                "admin-1",
                "emp-1",
                UserUpdate {
                    salary: Some(90000.0),
                    department: Some("Platform".to_string()),
                    ..UserUpdate::default()
                },
            )
            .unwrap();

        let log = &store.logs()[0];
        assert_eq!(log.action, "UPDATE_USER");
        assert!(log.details.contains("salary to 90000"));
        assert!(log.details.contains("department to Platform"));
    }

    #[test]
    fn checklist_completeness_is_derived() {
        let (store, _dir) = test_store();
        let task = sample_task(&store);
        assert!(!store.task(&task.id).unwrap().checklist_complete());

        let item = store.add_checklist_item(&task.id, "collect figures").unwrap();
        assert!(!store.task(&task.id).unwrap().checklist_complete());

        assert!(store.toggle_checklist_item(&task.id, &item.id));
        assert!(store.task(&task.id).unwrap().checklist_complete());

        assert!(store.remove_checklist_item(&task.id, &item.id));
        assert!(!store.task(&task.id).unwrap().checklist_complete());
    }
}
