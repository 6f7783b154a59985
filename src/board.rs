// Board configuration: the ordered pipeline of kanban columns.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::info;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::KanbanColumn;

#[derive(Debug, Deserialize)]
pub struct ColumnRequest {
    pub title: String,
}

/// GET /columns
pub async fn list_columns(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    HttpResponse::Ok().json(data.store.columns())
}

/// POST /columns
pub async fn create_column(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<ColumnRequest>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let column = data.store.add_column(&payload.title);
    info!("Column created: {}", column.id);
    HttpResponse::Ok().json(column)
}

/// PUT /columns/{column_id}
pub async fn update_column(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ColumnRequest>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    if data.store.update_column(&path.into_inner(), &payload.title) {
        HttpResponse::Ok().body("Column updated")
    } else {
        HttpResponse::NotFound().body("Column not found")
    }
}

/// DELETE /columns/{column_id}
/// Guarded: a column that still holds tasks cannot be removed.
pub async fn delete_column(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    match data.store.delete_column(&path.into_inner()) {
        Ok(()) => HttpResponse::Ok().body("Column deleted"),
        Err("Column not found") => HttpResponse::NotFound().body("Column not found"),
        Err(msg) => HttpResponse::Conflict().body(msg),
    }
}

/// PUT /columns — full reorder replace from drag-and-drop.
pub async fn set_columns(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<Vec<KanbanColumn>>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    data.store.set_columns(payload.into_inner());
    HttpResponse::Ok().json(data.store.columns())
}
