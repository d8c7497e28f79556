use crate::config::Config;
use crate::error::AppError;
use crate::models::{Booking, Event};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    Client, Database, IndexModel,
    bson::{doc, oid::ObjectId},
    options::{ClientOptions, IndexOptions},
};
use std::time::Duration;
use tokio::sync::OnceCell;

const EVENTS: &str = "events";
const BOOKINGS: &str = "bookings";

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared connection provider. Construction does no I/O; the first call to
/// [`Db::get`] connects, and every later call reuses the cached handle.
pub struct Db {
    uri: String,
    name: String,
    handle: OnceCell<Client>,
}

impl Db {
    pub fn new(config: &Config) -> Db {
        Db {
            uri: config.mongodb_uri.clone(),
            name: config.database_name.clone(),
            handle: OnceCell::new(),
        }
    }

    /// Returns a database handle, connecting lazily on first use. Concurrent
    /// first callers share a single in-flight attempt; a failed attempt
    /// leaves the cell empty so the next call retries.
    pub async fn get(&self) -> Result<Database, AppError> {
        let client = self.handle.get_or_try_init(|| self.connect()).await?;
        Ok(client.database(&self.name))
    }

    async fn connect(&self) -> Result<Client, AppError> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|err| AppError::Config(err.to_string()))?;
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        let client = Client::with_options(options).map_err(AppError::Connection)?;

        // The driver connects lazily; a ping both forces the connection and
        // confirms the server is actually reachable.
        let reply = client
            .database(&self.name)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(AppError::Connection)?;
        let ok = reply
            .get_f64("ok")
            .or_else(|_| reply.get_i32("ok").map(f64::from))
            .unwrap_or(0.0);
        if ok != 1.0 {
            return Err(AppError::ConnectionNotReady);
        }

        tracing::info!(database = %self.name, "connected to MongoDB");
        Ok(client)
    }

    /// Creates the unique slug index and the booking event_id index.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let database = self.get().await?;
        let slug_index = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        database
            .collection::<Event>(EVENTS)
            .create_index(slug_index, None)
            .await?;
        let booking_index = IndexModel::builder().keys(doc! { "event_id": 1 }).build();
        database
            .collection::<Booking>(BOOKINGS)
            .create_index(booking_index, None)
            .await?;
        Ok(())
    }

    pub async fn shutdown(self) {
        if let Some(client) = self.handle.into_inner() {
            client.shutdown().await;
        }
    }
}

/// Looks an event up by slug. The input is trimmed and lowercased before the
/// exact match; stored slugs are always lowercase, so lookup is effectively
/// case-insensitive. Not-found is `Ok(None)`, never an error.
pub async fn find_event_by_slug(db: &Db, slug: &str) -> Result<Option<Event>, AppError> {
    let database = db.get().await?;
    let sanitized = slug.trim().to_lowercase();
    let event = database
        .collection::<Event>(EVENTS)
        .find_one(doc! { "slug": sanitized }, None)
        .await?;
    Ok(event)
}

/// All other events sharing at least one tag with the event behind `slug`.
/// An unresolved slug, an empty result, and any internal failure all come
/// back as an empty list.
pub async fn find_similar_events_by_slug(db: &Db, slug: &str) -> Vec<Event> {
    match similar_events(db, slug).await {
        Ok(events) => events,
        Err(err) => {
            tracing::debug!(error = ?err, slug, "similar events lookup failed");
            Vec::new()
        }
    }
}

async fn similar_events(db: &Db, slug: &str) -> Result<Vec<Event>, AppError> {
    let database = db.get().await?;
    let events = database.collection::<Event>(EVENTS);
    let Some(event) = events
        .find_one(doc! { "slug": slug.trim().to_lowercase() }, None)
        .await?
    else {
        return Ok(Vec::new());
    };
    let filter = doc! { "_id": { "$ne": event.id }, "tags": { "$in": event.tags.clone() } };
    let cursor = events.find(filter, None).await?;
    let similar = cursor.try_collect().await?;
    Ok(similar)
}

pub async fn count_events(db: &Db) -> Result<u64, AppError> {
    let database = db.get().await?;
    let count = database
        .collection::<Event>(EVENTS)
        .count_documents(None, None)
        .await?;
    Ok(count)
}

pub async fn event_exists(db: &Db, id: ObjectId) -> Result<bool, AppError> {
    let database = db.get().await?;
    let count = database
        .collection::<Event>(EVENTS)
        .count_documents(doc! { "_id": id }, None)
        .await?;
    Ok(count > 0)
}

/// Write path for events: normalize, stamp timestamps, insert. Slug
/// uniqueness is enforced by the index and surfaces as a storage error.
pub async fn insert_event(db: &Db, event: &Event) -> Result<Event, AppError> {
    let mut doc = event.normalized(None)?;
    let now = Utc::now();
    doc.created_at = now;
    doc.updated_at = now;
    let database = db.get().await?;
    let result = database
        .collection::<Event>(EVENTS)
        .insert_one(&doc, None)
        .await?;
    doc.id = result.inserted_id.as_object_id();
    Ok(doc)
}

/// Re-normalizes against the stored document (so unchanged fields keep their
/// stored form and manual slugs survive), preserves `created_at`, refreshes
/// `updated_at`, and replaces the document.
pub async fn update_event(db: &Db, event: &Event) -> Result<Event, AppError> {
    let id = event
        .id
        .ok_or_else(|| AppError::BadRequest("event is missing an id".to_string()))?;
    let database = db.get().await?;
    let events = database.collection::<Event>(EVENTS);
    let previous = events
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or(AppError::EventMissing(id))?;
    let mut doc = event.normalized(Some(&previous))?;
    doc.id = Some(id);
    doc.created_at = previous.created_at;
    doc.updated_at = Utc::now();
    events.replace_one(doc! { "_id": id }, &doc, None).await?;
    Ok(doc)
}

/// Write path for bookings: normalize the email, then confirm the referenced
/// event exists before inserting. The check runs once, at write time only;
/// deleting the event afterwards leaves the booking orphaned.
pub async fn insert_booking(db: &Db, booking: &Booking) -> Result<Booking, AppError> {
    let mut doc = booking.normalized()?;
    let exists = event_exists(db, doc.event_id).await.map_err(|err| match err {
        AppError::Db(source) => AppError::ReferenceCheck(source),
        other => other,
    })?;
    if !exists {
        return Err(AppError::EventMissing(doc.event_id));
    }
    let now = Utc::now();
    doc.created_at = now;
    doc.updated_at = now;
    let database = db.get().await?;
    let result = database
        .collection::<Booking>(BOOKINGS)
        .insert_one(&doc, None)
        .await?;
    doc.id = result.inserted_id.as_object_id();
    Ok(doc)
}
