//! MongoDB-backed queue
//!
//! Each queue is a collection. Dequeue deletes the oldest document by its
//! `enqueued_at` BSON timestamp, with `_id` breaking ties between messages
//! enqueued in the same millisecond. Order across producers is only as good
//! as their clocks.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tokio::sync::OnceCell;

use crate::application::ports::outbound::{QueueError, QueuePort};
use crate::domain::value_objects::{MessageId, QueueMessage, ServiceSettings};
use crate::infrastructure::config::{keys, ConfigurationError};

const DEFAULT_DATABASE: &str = "FibonatixQueue";
const APP_NAME: &str = "fibonatix-queue";
const SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

pub struct MongoQueue {
    connection_string: String,
    password: String,
    client: OnceCell<Client>,
    closed: AtomicBool,
}

impl MongoQueue {
    /// Create a queue handle. The driver client is built on first use, so
    /// only the URI scheme is checked here.
    pub fn new(settings: &ServiceSettings) -> Result<Self, ConfigurationError> {
        let connection_string = settings.connection_string().trim();
        if !SCHEMES.iter().any(|s| connection_string.starts_with(s)) {
            return Err(ConfigurationError::Invalid {
                key: keys::CONNECTION_STRING,
                value: "<redacted>".to_string(),
                reason: "MongoDB connection strings must start with mongodb:// or mongodb+srv://"
                    .to_string(),
            });
        }

        Ok(Self {
            connection_string: connection_string.to_string(),
            password: settings.password().to_string(),
            client: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    async fn client(&self) -> Result<&Client, QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Connection("MongoDB queue is shut down".to_string()));
        }
        self.client
            .get_or_try_init(|| async {
                let mut options = ClientOptions::parse(&self.connection_string).await?;
                if !self.password.is_empty() {
                    let mut credential = options.credential.take().unwrap_or_default();
                    credential.password = Some(self.password.clone());
                    options.credential = Some(credential);
                }
                options.app_name.get_or_insert_with(|| APP_NAME.to_string());

                let client = Client::with_options(options)?;
                tracing::info!("MongoDB client initialized");
                Ok::<_, mongodb::error::Error>(client)
            })
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))
    }

    async fn collection(&self, queue: &str) -> Result<Collection<Document>, QueueError> {
        let client = self.client().await?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));
        Ok(database.collection(queue))
    }
}

#[async_trait]
impl QueuePort for MongoQueue {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<QueueMessage, QueueError> {
        let message = QueueMessage::new(payload);
        self.collection(queue)
            .await?
            .insert_one(to_document(&message))
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        tracing::debug!("Enqueued message {} on {}", message.id, queue);
        Ok(message)
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError> {
        let document = self
            .collection(queue)
            .await?
            .find_one_and_delete(doc! {})
            .sort(dequeue_order())
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        document.as_ref().map(from_document).transpose()
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        let count = self
            .collection(queue)
            .await?
            .count_documents(doc! {})
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;
        Ok(count as usize)
    }

    async fn health_check(&self) -> Result<bool, QueueError> {
        self.client()
            .await?
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;
        Ok(true)
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(client) = self.client.get() {
            client.clone().shutdown().await;
        }
        tracing::info!("MongoDB queue shut down");
    }
}

fn dequeue_order() -> Document {
    doc! { "enqueued_at": 1, "_id": 1 }
}

fn to_document(message: &QueueMessage) -> Document {
    doc! {
        "message_id": message.id.to_string(),
        "payload": message.payload.as_str(),
        "enqueued_at": bson::DateTime::from_millis(message.enqueued_at.timestamp_millis()),
    }
}

fn from_document(document: &Document) -> Result<QueueMessage, QueueError> {
    let field = |name: &str| {
        document
            .get_str(name)
            .map_err(|e| QueueError::Serialization(format!("{name}: {e}")))
    };

    let id = field("message_id")?
        .parse::<MessageId>()
        .map_err(|e| QueueError::Serialization(format!("message_id: {e}")))?;
    let millis = document
        .get_datetime("enqueued_at")
        .map_err(|e| QueueError::Serialization(format!("enqueued_at: {e}")))?
        .timestamp_millis();
    let enqueued_at: DateTime<Utc> = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| QueueError::Serialization("enqueued_at: out of range".to_string()))?;

    Ok(QueueMessage {
        id,
        payload: field("payload")?.to_string(),
        enqueued_at,
    })
}
