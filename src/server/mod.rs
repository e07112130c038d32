pub mod handlers;

use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use crate::expand::Expander;

/// Shared handler state: the expansion pipeline behind an `Arc`, one
/// instance for the whole server. Requests share nothing else.
pub struct AppState {
    pub expander: Arc<Expander>,
}

/// Bind and run the HTTP server until shutdown.
pub async fn run(expander: Arc<Expander>, port: u16) -> std::io::Result<()> {
    let state = web::Data::new(AppState { expander });

    log::info!("Routes: GET / | GET /api/health | POST /api/generate-image");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(handlers::index))
            .route("/api", web::get().to(handlers::index))
            .route("/api/health", web::get().to(handlers::health))
            .route(
                "/api/generate-image",
                web::post().to(handlers::generate_image),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
