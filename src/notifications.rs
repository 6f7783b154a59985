// Notification center: inbox reads and acknowledgements. Creation happens
// only inside store actions as side effects.

use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::app_state::AppState;
use crate::auth::current_user;

/// GET /notifications
pub async fn list_notifications(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    HttpResponse::Ok().json(data.store.notifications_for(&current))
}

/// GET /notifications/unread_count
pub async fn unread_count(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    HttpResponse::Ok().json(serde_json::json!({ "count": data.store.unread_count(&current) }))
}

/// POST /notifications/{notification_id}/read
pub async fn mark_read(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    if data.store.mark_notification_read(&path.into_inner()) {
        HttpResponse::Ok().body("Notification marked read")
    } else {
        HttpResponse::NotFound().body("Notification not found")
    }
}

/// POST /notifications/read_all — scoped to the authenticated user.
pub async fn mark_all_read(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    data.store.mark_all_notifications_read(&current);
    HttpResponse::Ok().body("All notifications marked read")
}
