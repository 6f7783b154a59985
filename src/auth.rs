use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::info;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::UserRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

// JWT Creation
pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims { sub: user_id.to_string(), exp: expiration.timestamp() as usize };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// The authenticated user id the middleware stashed in request extensions.
pub fn current_user(req: &HttpRequest) -> Option<String> {
    req.extensions().get::<String>().cloned()
}

// Login Endpoint
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginRequest>,
) -> impl Responder {
    match data.store.login(&login_info.username, &login_info.password, login_info.role) {
        Some(user) => {
            let token = match create_jwt(&user.id, &data.config.jwt_secret) {
                Ok(t) => t,
                Err(e) => {
                    return HttpResponse::InternalServerError()
                        .body(format!("Error creating token: {}", e))
                }
            };
            info!("User {} logged in", user.username);
            HttpResponse::Ok().json(serde_json::json!({ "token": token, "user": user }))
        }
        // One generic message for every failure cause.
        None => HttpResponse::Unauthorized().body("Invalid credentials"),
    }
}

// Logout Endpoint
pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    data.store.logout(&current);
    HttpResponse::Ok().json(serde_json::json!({ "status": "Logged out" }))
}

// Change Password Endpoint (also clears a forced-rotation flag)
pub async fn change_password(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<ChangePasswordRequest>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if payload.new_password != payload.confirm_password {
        return HttpResponse::BadRequest().body("Passwords do not match");
    }
    if data.store.change_password(&current, &payload.new_password) {
        HttpResponse::Ok().json(serde_json::json!({ "status": "Password changed" }))
    } else {
        HttpResponse::BadRequest().body("Password must be at least 4 characters")
    }
}

/// Session heartbeat, called by the client on an interval while active.
pub async fn heartbeat(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    data.store.update_presence(&current);
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
