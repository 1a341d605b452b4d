use crate::config::AppConfig;
use crate::startup::AppState;
use axum::{
    Router,
    extract::Extension,
    http::{
        Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::EnvFilter;

#[macro_use]
extern crate tracing;

mod auth;
mod config;
mod db;
mod error;
mod polls;
mod scheduling;
mod sse;
mod startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;

    let pool = db::init_db(&config.database_url, config.max_connections).await?;
    info!("{}", db::get_pool_stats(&pool).await?);

    let session_store = SqliteStore::new(pool.clone());
    session_store.migrate().await?;

    let app_state = AppState::new(pool);
    let app = build_router(
        app_state,
        session_store,
        config.secure_cookies,
        config.session_idle_secs,
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router<S>(app_state: AppState, session_store: S, secure: bool, idle_secs: i64) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/voters", get(auth::list_voters).post(auth::register_voter))
        .route("/login/:voter_id", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me/votes", get(polls::my_votes))
        .route("/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/polls/events", get(sse::all_polls_sse))
        .route(
            "/polls/:poll_id",
            get(polls::get_poll)
                .put(polls::edit_poll)
                .delete(polls::delete_poll),
        )
        .route("/polls/:poll_id/close", post(polls::close_poll))
        .route("/polls/:poll_id/ballot", get(polls::get_ballot))
        .route("/polls/:poll_id/vote", post(polls::vote_on_poll))
        .route("/polls/:poll_id/results", get(polls::get_results))
        .route(
            "/polls/:poll_id/messages",
            get(polls::list_messages).post(polls::post_message),
        )
        .route("/polls/:poll_id/events", get(sse::poll_updates_sse))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT]),
        )
        .layer(
            SessionManagerLayer::new(session_store)
                .with_name("meetpoll")
                .with_same_site(SameSite::Lax)
                .with_secure(secure)
                .with_expiry(Expiry::OnInactivity(Duration::seconds(idle_secs))),
        )
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
