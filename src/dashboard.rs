// Derived dashboard summary. Everything here is computed from a snapshot of
// the store on each request; nothing is cached or stored.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::{LeaveStatus, TaskPriority};

/// GET /dashboard
pub async fn get_dashboard(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let state = data.store.snapshot();

    let terminal_column = state.columns.last().map(|c| c.id.clone()).unwrap_or_default();

    // Tasks per column, in board order.
    let by_column: Vec<serde_json::Value> = state
        .columns
        .iter()
        .map(|c| {
            let count = state.tasks.iter().filter(|t| t.status == c.id).count();
            serde_json::json!({ "columnId": c.id, "title": c.title, "count": count })
        })
        .collect();

    // Priority distribution over open tasks only.
    let (mut high, mut medium, mut low) = (0, 0, 0);
    for t in state.tasks.iter().filter(|t| t.status != terminal_column) {
        match t.priority {
            TaskPriority::High => high += 1,
            TaskPriority::Medium => medium += 1,
            TaskPriority::Low => low += 1,
        }
    }

    let completed = state.tasks.iter().filter(|t| t.status == terminal_column).count();
    let online_users = state.users.iter().filter(|u| u.is_online).count();
    let pending_leaves =
        state.leaves.iter().filter(|l| l.status == LeaveStatus::Pending).count();
    let today = Utc::now().date_naive();
    let present_today = state.attendance.iter().filter(|a| a.date == today).count();

    HttpResponse::Ok().json(serde_json::json!({
        "taskSummary": {
            "totalTasks": state.tasks.len(),
            "completedTasks": completed,
            "openTasks": state.tasks.len() - completed,
            "byColumn": by_column,
        },
        "priority": { "high": high, "medium": medium, "low": low },
        "team": {
            "totalUsers": state.users.len(),
            "onlineUsers": online_users,
        },
        "pendingLeaves": pending_leaves,
        "presentToday": present_today,
    }))
}
