use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use employee_flow::app_state::AppState;
use employee_flow::config::Config;
use employee_flow::store::Store;
use employee_flow::{routes, Authentication};

/// Presence decay and external-write pickup run on this cadence.
const SWEEP_INTERVAL_SECS: u64 = 60;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let store = Arc::new(Store::open(&config.storage_path)?);

    // Age out stale logs and messages once per session start.
    store.cleanup_old_data();

    // Background sweep: inactivity decay plus cross-process blob pickup.
    let sweep_store = store.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sweep_store.reload_if_changed();
            sweep_store.check_inactive_users();
        }
    });

    let http_client = reqwest::Client::new();
    let frontend_origin = config.frontend_origin.clone();
    let bind_addr = config.bind_addr.clone();

    println!("Server running at http://{}", bind_addr);
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                store: store.clone(),
                config: config.clone(),
                http_client: http_client.clone(),
            }))
            .configure(routes)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
