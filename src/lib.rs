pub mod ai_assistant;
pub mod app_state;
pub mod attendance;
pub mod audit;
pub mod auth;
pub mod board;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod leave;
pub mod models;
pub mod notifications;
pub mod persistence;
pub mod store;
pub mod tasks;
pub mod user_management;

use std::env;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, HttpMessage, HttpResponse,
};
use futures::future::{ok, Ready};

use crate::auth::validate_jwt;

#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present;
        // handlers decide per-route whether a session is required.
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim().to_string();
                    let secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
                    match validate_jwt(&token, &secret) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims.sub);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .body(format!("Invalid token: {}", e))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

/// Full route table, shared between the binary and the integration tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(auth::login))
            .route("/logout", web::post().to(auth::logout))
            .route("/change_password", web::post().to(auth::change_password)),
    )
    .service(web::scope("/presence").route("/heartbeat", web::post().to(auth::heartbeat)))
    // USERS
    .service(
        web::scope("/users")
            .route("", web::get().to(user_management::list_users))
            .route("", web::post().to(user_management::create_user))
            .route("/{user_id}", web::get().to(user_management::get_user_by_id))
            .route("/{user_id}", web::put().to(user_management::update_user))
            .route("/{user_id}", web::delete().to(user_management::remove_user))
            .route("/{user_id}/documents", web::post().to(user_management::add_document))
            .route(
                "/{user_id}/documents/{doc_id}",
                web::delete().to(user_management::remove_document),
            ),
    )
    // BOARD
    .service(
        web::scope("/columns")
            .route("", web::get().to(board::list_columns))
            .route("", web::post().to(board::create_column))
            .route("", web::put().to(board::set_columns))
            .route("/{column_id}", web::put().to(board::update_column))
            .route("/{column_id}", web::delete().to(board::delete_column)),
    )
    // TASKS
    .service(
        web::scope("/tasks")
            .route("", web::get().to(tasks::list_tasks))
            .route("", web::post().to(tasks::create_task))
            .route("/{task_id}", web::get().to(tasks::get_task))
            .route("/{task_id}", web::put().to(tasks::update_task))
            .route("/{task_id}", web::delete().to(tasks::delete_task))
            .route("/{task_id}/status", web::put().to(tasks::update_task_status))
            .route("/{task_id}/submissions", web::post().to(tasks::add_submission))
            .route("/{task_id}/checklist", web::post().to(tasks::add_checklist_item))
            .route(
                "/{task_id}/checklist/{item_id}",
                web::put().to(tasks::toggle_checklist_item),
            )
            .route(
                "/{task_id}/checklist/{item_id}",
                web::delete().to(tasks::remove_checklist_item),
            ),
    )
    // MESSAGES
    .service(
        web::scope("/messages")
            .route("", web::post().to(chat::send_message))
            .route("/{peer_id}", web::get().to(chat::get_conversation))
            .route("/{sender_id}/read", web::post().to(chat::mark_messages_read)),
    )
    // NOTIFICATIONS
    .service(
        web::scope("/notifications")
            .route("", web::get().to(notifications::list_notifications))
            .route("/unread_count", web::get().to(notifications::unread_count))
            .route("/read_all", web::post().to(notifications::mark_all_read))
            .route("/{notification_id}/read", web::post().to(notifications::mark_read)),
    )
    // LEAVES
    .service(
        web::scope("/leaves")
            .route("", web::get().to(leave::list_leaves))
            .route("", web::post().to(leave::create_leave_request))
            .route("/{leave_id}/status", web::put().to(leave::decide_leave_request)),
    )
    // ATTENDANCE
    .service(
        web::scope("/attendance")
            .route("", web::get().to(attendance::list_attendance))
            .route("", web::post().to(attendance::add_record))
            .route("/clock_in", web::post().to(attendance::clock_in))
            .route("/clock_out", web::post().to(attendance::clock_out)),
    )
    // EXPORTS
    .service(
        web::scope("/export")
            .route("/state", web::get().to(export::export_state))
            .route("/employees.csv", web::get().to(export::export_employees_csv)),
    )
    .route("/logs", web::get().to(audit::list_logs))
    .route("/dashboard", web::get().to(dashboard::get_dashboard))
    .route("/assistant", web::post().to(ai_assistant::ask_assistant))
    .route("/preferences/dark_mode", web::put().to(user_management::toggle_dark_mode));
}
