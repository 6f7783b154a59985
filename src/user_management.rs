use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::info;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::{NewDocument, NewUser, UserUpdate};

fn is_privileged(data: &AppState, user_id: &str) -> bool {
    data.store.user(user_id).map(|u| u.role.is_privileged()).unwrap_or(false)
}

/// Plaintext credential sheet offered for download after account creation.
fn credentials_sheet(username: &str, email: &str, password: &str, role: &str) -> String {
    format!(
        "EMPLOYEEFLOW - NEW USER CREDENTIALS\n\
         ===================================\n\
         Date Created: {}\n\
         \n\
         First Name/Username: {}\n\
         Email:               {}\n\
         Password:            {}\n\
         Role:                {}\n\
         \n\
         * IMPORTANT: Please change your password upon first login.",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        username,
        email,
        password,
        role,
    )
}

pub async fn list_users(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    HttpResponse::Ok().json(data.store.users())
}

pub async fn get_user_by_id(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    match data.store.user(&path.into_inner()) {
        Some(user) => HttpResponse::Ok().json(user),
        None => HttpResponse::NotFound().body("User not found"),
    }
}

/// POST /users
/// Creates an account with a forced password rotation on first login and
/// returns the one-time credential sheet alongside the new record.
pub async fn create_user(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewUser>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Only owners and administrators may add users");
    }

    let payload = payload.into_inner();
    let sheet = credentials_sheet(
        &payload.username,
        &payload.email,
        &payload.password,
        &format!("{:?}", payload.role).to_uppercase(),
    );
    let user = data.store.add_user(&current, payload);
    info!("User created: {}", user.id);
    HttpResponse::Ok().json(serde_json::json!({ "user": user, "credentialsSheet": sheet }))
}

/// PUT /users/{id} — self-service profile edits or privileged roster edits.
pub async fn update_user(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UserUpdate>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let id = path.into_inner();
    if current != id && !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Cannot edit another user's profile");
    }
    match data.store.update_user(&current, &id, payload.into_inner()) {
        Some(user) => HttpResponse::Ok().json(user),
        None => HttpResponse::NotFound().body("User not found"),
    }
}

pub async fn remove_user(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Only owners and administrators may remove users");
    }
    if data.store.remove_user(&current, &path.into_inner()) {
        HttpResponse::Ok().body("User removed")
    } else {
        HttpResponse::NotFound().body("User not found")
    }
}

/// POST /users/{id}/documents — the blob arrives as a data URL; any image
/// downscaling already happened on the client before upload.
pub async fn add_document(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewDocument>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let user_id = path.into_inner();
    if current != user_id && !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Cannot upload for another user");
    }
    match data.store.add_document(&current, &user_id, payload.into_inner()) {
        Some(doc) => HttpResponse::Ok().json(doc),
        None => HttpResponse::NotFound().body("User not found"),
    }
}

pub async fn remove_document(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let (user_id, doc_id) = path.into_inner();
    if current != user_id && !is_privileged(&data, &current) {
        return HttpResponse::Unauthorized().body("Cannot remove another user's documents");
    }
    if data.store.remove_document(&current, &user_id, &doc_id) {
        HttpResponse::Ok().body("Document removed")
    } else {
        HttpResponse::NotFound().body("Document not found")
    }
}

/// PUT /preferences/dark_mode — shared UI preference, flipped as a whole.
pub async fn toggle_dark_mode(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let dark_mode = data.store.toggle_dark_mode();
    HttpResponse::Ok().json(serde_json::json!({ "darkMode": dark_mode }))
}
