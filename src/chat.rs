// Messaging handlers: direct threads plus the company-wide broadcast
// channel, with per-recipient read tracking.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadQuery {
    /// Thread key: the broadcast sentinel, or absent for the direct thread.
    pub thread: Option<String>,
}

/// GET /messages/{peer_id}
/// The direct thread with `peer_id`, or the broadcast thread when the peer
/// is the broadcast sentinel.
pub async fn get_conversation(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    HttpResponse::Ok().json(data.store.conversation(&current, &path.into_inner()))
}

/// POST /messages
pub async fn send_message(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<SendMessageRequest>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    match data.store.send_message(&current, &payload.receiver_id, &payload.content) {
        Ok(message) => HttpResponse::Ok().json(message),
        Err("Unknown sender") => HttpResponse::Unauthorized().body("Unknown sender"),
        Err(msg) => HttpResponse::Forbidden().body(msg),
    }
}

/// POST /messages/{sender_id}/read
/// Acks everything from `sender_id` in the addressed thread. Idempotent.
pub async fn mark_messages_read(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<MarkReadQuery>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let sender_id = path.into_inner();
    let thread = query.thread.clone().unwrap_or_else(|| current.clone());
    data.store.mark_messages_read(&current, &sender_id, &thread);
    HttpResponse::Ok().body("Messages marked read")
}
