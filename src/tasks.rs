// Task engine handlers: CRUD, status moves, submissions and checklists.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::info;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::store::{NewSubmission, NewTask, TaskUpdate};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChecklistItemRequest {
    pub text: String,
}

/// GET /tasks
pub async fn list_tasks(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    HttpResponse::Ok().json(data.store.tasks())
}

/// GET /tasks/{task_id}
pub async fn get_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    match data.store.task(&path.into_inner()) {
        Some(task) => HttpResponse::Ok().json(task),
        None => HttpResponse::NotFound().body("Task not found"),
    }
}

/// POST /tasks
/// New tasks land in the intake column unless a valid status is supplied;
/// an assignee gets notified as a side effect.
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<NewTask>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let task = data.store.add_task(&current, payload.into_inner());
    info!("Task created: {}", task.id);
    HttpResponse::Ok().json(task)
}

/// PUT /tasks/{task_id}
pub async fn update_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<TaskUpdate>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    match data.store.update_task(&current, &path.into_inner(), payload.into_inner()) {
        Some(task) => HttpResponse::Ok().json(task),
        None => HttpResponse::NotFound().body("Task not found"),
    }
}

/// PUT /tasks/{task_id}/status
pub async fn update_task_status(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateStatusRequest>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let payload = payload.into_inner();
    match data.store.update_task_status(&current, &path.into_inner(), &payload.status, payload.notes)
    {
        Ok(task) => HttpResponse::Ok().json(task),
        Err("Task not found") => HttpResponse::NotFound().body("Task not found"),
        Err(msg) => HttpResponse::BadRequest().body(msg),
    }
}

/// DELETE /tasks/{task_id}
pub async fn delete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    if data.store.delete_task(&current, &path.into_inner()) {
        HttpResponse::Ok().body("Task deleted")
    } else {
        HttpResponse::NotFound().body("Task not found or already deleted")
    }
}

/// POST /tasks/{task_id}/submissions
pub async fn add_submission(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<NewSubmission>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    match data.store.add_task_submission(&current, &path.into_inner(), payload.into_inner()) {
        Some(task) => HttpResponse::Ok().json(task),
        None => HttpResponse::NotFound().body("Task not found"),
    }
}

/// POST /tasks/{task_id}/checklist
pub async fn add_checklist_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ChecklistItemRequest>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    match data.store.add_checklist_item(&path.into_inner(), &payload.text) {
        Some(item) => HttpResponse::Ok().json(item),
        None => HttpResponse::NotFound().body("Task not found"),
    }
}

/// PUT /tasks/{task_id}/checklist/{item_id}
pub async fn toggle_checklist_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let (task_id, item_id) = path.into_inner();
    if data.store.toggle_checklist_item(&task_id, &item_id) {
        HttpResponse::Ok().body("Checklist item toggled")
    } else {
        HttpResponse::NotFound().body("Checklist item not found")
    }
}

/// DELETE /tasks/{task_id}/checklist/{item_id}
pub async fn remove_checklist_item(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    if current_user(&req).is_none() {
        return HttpResponse::Unauthorized().body("Unauthorized");
    }
    let (task_id, item_id) = path.into_inner();
    if data.store.remove_checklist_item(&task_id, &item_id) {
        HttpResponse::Ok().body("Checklist item removed")
    } else {
        HttpResponse::NotFound().body("Checklist item not found")
    }
}
