// AI advisory endpoint. The upstream model is a black box: prompt plus a
// context bundle in, free text out, with fixed fallback messages when the
// credential is missing or the call fails. No retry, no caching.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::models::User;

const OFFLINE_MESSAGE: &str = "AI Assistant is currently offline (Missing API Key).";
const ERROR_MESSAGE: &str = "I encountered an error processing your request.";
const EMPTY_MESSAGE: &str = "I couldn't generate a response.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub prompt: String,
    pub page_context: Option<String>,
    /// Set while an employee profile is being viewed.
    pub employee_id: Option<String>,
}

fn employee_section(emp: &User) -> String {
    let salary = match emp.salary {
        Some(s) => format!("${}", s),
        None => "Confidential".to_string(),
    };
    format!(
        "\nCURRENTLY VIEWING PROFILE OF:\n\
         - Name: {}\n\
         - Role: {:?}\n\
         - Department: {}\n\
         - Job Title: {}\n\
         - Email: {}\n\
         - Status: {}\n\
         - Salary: {}\n\
         If the user asks about this employee, provide insights based on this data.",
        emp.username,
        emp.role,
        emp.department.as_deref().unwrap_or("N/A"),
        emp.job_title.as_deref().unwrap_or("N/A"),
        emp.email,
        if emp.is_online { "Online" } else { "Offline" },
        salary,
    )
}

/// POST /assistant
pub async fn ask_assistant(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<AssistantRequest>,
) -> impl Responder {
    let Some(current) = current_user(&req) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };
    let Some(user) = data.store.user(&current) else {
        return HttpResponse::Unauthorized().body("Unauthorized");
    };

    let Some(api_key) = data.config.gemini_api_key.clone() else {
        return HttpResponse::Ok().json(serde_json::json!({ "reply": OFFLINE_MESSAGE }));
    };

    // Context bundle: who is asking and what they still have open.
    let terminal_column = data.store.columns().last().map(|c| c.id.clone()).unwrap_or_default();
    let open_tasks: Vec<String> = data
        .store
        .tasks()
        .into_iter()
        .filter(|t| {
            t.status != terminal_column
                && (t.assignee_id.as_deref() == Some(current.as_str()) || t.created_by == current)
        })
        .map(|t| t.title)
        .collect();

    let mut context_prompt = format!(
        "You are an intelligent enterprise assistant for 'EmployeeFlow'.\n\
         \n\
         Current User:\n\
         - Name: {}\n\
         - Role: {:?}\n\
         - Department: {}\n\
         \n\
         Pending Tasks: {}",
        user.username,
        user.role,
        user.department.as_deref().unwrap_or("N/A"),
        open_tasks.join(", "),
    );

    match payload.page_context.as_deref() {
        Some("EMPLOYEE_PROFILE") => {
            if let Some(emp) = payload.employee_id.as_deref().and_then(|id| data.store.user(id)) {
                context_prompt.push_str(&employee_section(&emp));
            }
        }
        Some("DASHBOARD") => {
            context_prompt
                .push_str("\nYou are on the Dashboard. Provide high-level summaries and productivity tips.");
        }
        _ => {}
    }
    context_prompt.push_str("\n\nProvide helpful, professional, and concise advice.");

    let url = format!("{}?key={}", data.config.gemini_endpoint.trim_end_matches('/'), api_key);
    let body = serde_json::json!({
        "contents": [
            { "role": "user", "parts": [{ "text": context_prompt }] },
            { "role": "user", "parts": [{ "text": payload.prompt }] }
        ],
        "systemInstruction": {
            "parts": [{ "text": "You are a helpful office assistant. Keep responses professional and concise." }]
        }
    });

    match data.http_client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<serde_json::Value>().await {
            Ok(v) => {
                let reply = v["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or(EMPTY_MESSAGE)
                    .to_string();
                HttpResponse::Ok().json(serde_json::json!({ "reply": reply }))
            }
            Err(e) => {
                error!("AI response parse error: {}", e);
                HttpResponse::Ok().json(serde_json::json!({ "reply": ERROR_MESSAGE }))
            }
        },
        Ok(resp) => {
            error!("AI service error: {}", resp.status());
            HttpResponse::Ok().json(serde_json::json!({ "reply": ERROR_MESSAGE }))
        }
        Err(e) => {
            error!("AI service unreachable: {}", e);
            HttpResponse::Ok().json(serde_json::json!({ "reply": ERROR_MESSAGE }))
        }
    }
}
