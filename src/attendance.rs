// Attendance handlers: daily clock-in/out plus manual corrections.

use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::NewAttendance;

/// GET /attendance — privileged roles see everything, employees their own.
pub async fn list_attendance(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let privileged =
        data.store.user(&current).map(|u| u.role.is_privileged()).unwrap_or(false);
    let mut records = data.store.attendance();
    if !privileged {
        records.retain(|r| r.user_id == current);
    }
    HttpResponse::Ok().json(records)
}

/// POST /attendance/clock_in — idempotent per calendar day.
pub async fn clock_in(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    match data.store.clock_in(&current) {
        Some(record) => HttpResponse::Ok().json(record),
        None => HttpResponse::Conflict().body("Already clocked in today"),
    }
}

/// POST /attendance/clock_out — rejected without a matching clock-in.
pub async fn clock_out(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    match data.store.clock_out(&current) {
        Some(record) => HttpResponse::Ok().json(record),
        None => HttpResponse::Conflict().body("No clock-in recorded for today"),
    }
}

/// POST /attendance — manual entry, privileged only.
pub async fn add_record(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewAttendance>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let privileged =
        data.store.user(&current).map(|u| u.role.is_privileged()).unwrap_or(false);
    if !privileged {
        return HttpResponse::Unauthorized()
            .body("Only owners and administrators may edit attendance");
    }
    HttpResponse::Ok().json(data.store.add_attendance_record(payload.into_inner()))
}
