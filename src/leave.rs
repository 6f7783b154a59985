// Leave workflow: request, then a one-way approve/reject decision.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::LeaveStatus;
use crate::store::NewLeave;

#[derive(Debug, Deserialize)]
pub struct DecideLeaveRequest {
    pub status: LeaveStatus,
}

/// GET /leaves — privileged roles see everything, employees see their own.
pub async fn list_leaves(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let privileged =
        data.store.user(&current).map(|u| u.role.is_privileged()).unwrap_or(false);
    let mut leaves = data.store.leaves();
    if !privileged {
        leaves.retain(|l| l.user_id == current);
    }
    HttpResponse::Ok().json(leaves)
}

/// POST /leaves
pub async fn create_leave_request(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewLeave>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let request = data.store.add_leave_request(&current, payload.into_inner());
    HttpResponse::Ok().json(request)
}

/// PUT /leaves/{leave_id}/status
pub async fn decide_leave_request(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<DecideLeaveRequest>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let privileged =
        data.store.user(&current).map(|u| u.role.is_privileged()).unwrap_or(false);
    if !privileged {
        return HttpResponse::Unauthorized()
            .body("Only owners and administrators may decide leave requests");
    }
    match data.store.update_leave_status(&path.into_inner(), payload.status) {
        Ok(request) => HttpResponse::Ok().json(request),
        Err("Leave request not found") => HttpResponse::NotFound().body("Leave request not found"),
        Err(msg) => HttpResponse::BadRequest().body(msg),
    }
}
