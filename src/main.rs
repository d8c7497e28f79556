use chrono::Utc;
use eventbase::config::Config;
use eventbase::db::{self, Db};
use eventbase::models::Event;
use eventbase::state::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn seed_database_if_empty(db: &Db) {
    let count = match db::count_events(db).await {
        Ok(count) => count,
        Err(err) => {
            tracing::warn!(error = %err, "could not check event count; skipping seed");
            return;
        }
    };
    if count > 0 {
        return;
    }

    tracing::info!("events collection is empty, seeding a sample event");
    let now = Utc::now();
    let sample = Event {
        id: None,
        slug: String::new(),
        title: "Rust Berlin Meetup".to_string(),
        description: "Monthly meetup of the Berlin Rust community".to_string(),
        overview: "Two talks, lightning rounds, and open hacking afterwards".to_string(),
        image: "https://cdn.eventbase.dev/images/rust-berlin.png".to_string(),
        venue: "c-base".to_string(),
        location: "Berlin, Germany".to_string(),
        date: "October 7, 2025".to_string(),
        time: "6:30 pm".to_string(),
        mode: "in-person".to_string(),
        audience: "developers".to_string(),
        agenda: vec![
            "Doors open".to_string(),
            "Talks".to_string(),
            "Open hacking".to_string(),
        ],
        organizer: "Rust Berlin".to_string(),
        tags: vec!["rust".to_string(), "meetup".to_string(), "berlin".to_string()],
        created_at: now,
        updated_at: now,
    };
    match db::insert_event(db, &sample).await {
        Ok(event) => tracing::info!(slug = %event.slug, "seeded sample event"),
        Err(err) => tracing::warn!(error = %err, "failed to seed sample event"),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let db = Arc::new(Db::new(&config));

    // Connection establishment is lazy; startup failures here are logged and
    // retried on first use instead of killing the process.
    if let Err(err) = db.ensure_indexes().await {
        tracing::warn!(error = %err, "could not ensure indexes at startup");
    }
    seed_database_if_empty(&db).await;

    let app = eventbase::app(AppState { db: db.clone() });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    tracing::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Ok(db) = Arc::try_unwrap(db) {
        db.shutdown().await;
    }
}
