use axum::Router;
use tower_http::cors::CorsLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::{EnvFilter, fmt};
use whisperbox::{AppState, auth, db, email::Mailer, messages};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let db_url = dotenv::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://whisperbox.db?mode=rwc".to_owned());
    let db_pool = db::connect(&db_url).await.unwrap();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    let app_state = AppState {
        db_pool,
        mailer: Mailer::from_env(),
    };

    let app = Router::new()
        .nest("/api", auth::router().merge(messages::router()))
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::permissive());

    let addr = format!(
        "0.0.0.0:{}",
        dotenv::var("PORT").unwrap_or_else(|_| "8080".to_owned())
    );
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
