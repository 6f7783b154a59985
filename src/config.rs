use std::env;

#[derive(Clone)]
pub struct Config {
    pub storage_path: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub frontend_origin: String,
    pub gemini_api_key: Option<String>,
    pub gemini_endpoint: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "employee_flow_state.json".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            // Absence of the key is handled gracefully: the assistant answers
            // with a fixed offline message instead of failing.
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_endpoint: env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
                    .to_string()
            }),
        }
    }
}
