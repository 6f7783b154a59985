// One-way export surfaces: full-state JSON backup and the employee roster
// as CSV. There is deliberately no import path for either.

use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::app_state::AppState;
use crate::auth::current_user;

fn is_privileged(data: &AppState, user_id: &str) -> bool {
    data.store.user(user_id).map(|u| u.role.is_privileged()).unwrap_or(false)
}

/// GET /export/state — the whole state tree as a downloadable JSON backup.
pub async fn export_state(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Only owners and administrators may export data");
    }
    let snapshot = data.store.snapshot();
    HttpResponse::Ok()
        .insert_header(("Content-Disposition", "attachment; filename=\"employee_flow_backup.json\""))
        .json(snapshot)
}

/// GET /export/employees.csv — the roster sheet.
pub async fn export_employees_csv(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Only owners and administrators may export data");
    }

    let mut lines = vec!["ID,Username,Email,Role,Department,Status,Last Active".to_string()];
    for user in data.store.users() {
        let status = if user.is_online { "Online" } else { "Offline" };
        let last_active = user
            .last_active_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Never".to_string());
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            user.id,
            user.username,
            user.email,
            format!("{:?}", user.role).to_uppercase(),
            user.department.unwrap_or_default(),
            status,
            last_active,
        ));
    }

    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(("Content-Disposition", "attachment; filename=\"employees_list.csv\""))
        .body(lines.join("\n"))
}
