// Audit log read surface. Entries are written by store actions; this module
// only exposes them to the privileged roles.

use actix_web::{web, HttpRequest, HttpResponse, Responder};

use crate::app_state::AppState;
use crate::auth::current_user;

/// GET /logs — newest first, windowed by the retention sweep.
pub async fn list_logs(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let privileged =
        data.store.user(&current).map(|u| u.role.is_privileged()).unwrap_or(false);
    if !privileged {
        return HttpResponse::Unauthorized()
            .body("Only owners and administrators may view the audit log");
    }
    HttpResponse::Ok().json(data.store.logs())
}
