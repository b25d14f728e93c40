use axum::{
    routing::{get, post},
    Router,
};
use playhall::player::repository::InMemoryPlayerRepository;
// use playhall::player::repository::PostgresPlayerRepository; // For production
use playhall::render::EventRenderer;
use playhall::{game, games, matchmaking, AppState, SessionDirectory};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playhall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting playhall game platform");

    let catalog = Arc::new(games::standard_catalog());

    // Create shared application state with dependency injection
    // Easy to switch between implementations:
    let players = Arc::new(InMemoryPlayerRepository::new(catalog.clone()));

    // For production with PostgreSQL:
    // let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // let pool = sqlx::PgPool::connect(&database_url).await.expect("Failed to connect to database");
    // let players = Arc::new(PostgresPlayerRepository::new(pool, catalog.clone()));

    let renderer = Arc::new(EventRenderer::new());
    let directory = Arc::new(SessionDirectory::new());
    let app_state = AppState::new(catalog, players, renderer, directory);

    // build our application
    let app = Router::new()
        .route("/", get(|| async { "playhall" }))
        .route("/lobbies", post(matchmaking::handlers::create_lobby))
        .route("/lobbies/:id", get(matchmaking::handlers::get_lobby))
        .route("/lobbies/:id/join", post(matchmaking::handlers::join_lobby))
        .route(
            "/lobbies/:id/leave",
            post(matchmaking::handlers::leave_lobby),
        )
        .route(
            "/lobbies/:id/invite/accept",
            post(matchmaking::handlers::accept_invite),
        )
        .route("/lobbies/:id/kick", post(matchmaking::handlers::kick_player))
        .route("/lobbies/:id/ban", post(matchmaking::handlers::ban_player))
        .route(
            "/lobbies/:id/start",
            post(matchmaking::handlers::start_lobby),
        )
        .route("/games/:id", get(game::handlers::get_game))
        .route("/games/:id/move", post(game::handlers::command_move))
        .route("/games/:id/button", post(game::handlers::button_move))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // run our app with hyper, listening globally on port 3000
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
