//! Redis-backed queue
//!
//! Each queue is a Redis list under `queue:{name}`. Messages are pushed on
//! the left and popped on the right, giving FIFO order. The connection is
//! opened on first use and released on shutdown; a shut down queue refuses
//! further commands instead of reconnecting.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ConnectionInfo, IntoConnectionInfo};
use tokio::sync::Mutex;

use crate::application::ports::outbound::{QueueError, QueuePort};
use crate::domain::value_objects::{QueueMessage, ServiceSettings};
use crate::infrastructure::config::{keys, parse_bool, ConfigurationError};

const DEFAULT_PORT: u16 = 6379;
const KEY_PREFIX: &str = "queue:";

pub struct RedisQueue {
    client: Client,
    connection: Mutex<Option<ConnectionManager>>,
    closed: AtomicBool,
}

impl RedisQueue {
    /// Create a queue handle. Only the connection string is validated here.
    pub fn new(settings: &ServiceSettings) -> Result<Self, ConfigurationError> {
        let info = connection_info(settings.connection_string(), settings.password())?;
        let client = Client::open(info).map_err(|e| invalid_connection_string(e.to_string()))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, QueueError> {
        let mut slot = self.connection.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Connection("Redis queue is shut down".to_string()));
        }
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }

        let manager = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;
        tracing::info!("Connected to Redis");
        *slot = Some(manager.clone());
        Ok(manager)
    }
}

#[async_trait]
impl QueuePort for RedisQueue {
    async fn enqueue(&self, queue: &str, payload: &str) -> Result<QueueMessage, QueueError> {
        let message = QueueMessage::new(payload);
        let body =
            serde_json::to_string(&message).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let mut conn = self.connection().await?;
        conn.lpush::<_, _, ()>(list_key(queue), body)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        tracing::debug!("Enqueued message {} on {}", message.id, queue);
        Ok(message)
    }

    async fn dequeue(&self, queue: &str) -> Result<Option<QueueMessage>, QueueError> {
        let mut conn = self.connection().await?;
        let body: Option<String> = conn
            .rpop(list_key(queue), None)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;

        body.map(|b| serde_json::from_str::<QueueMessage>(&b))
            .transpose()
            .map_err(|e| QueueError::Serialization(e.to_string()))
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        conn.llen(list_key(queue))
            .await
            .map_err(|e| QueueError::Command(e.to_string()))
    }

    async fn health_check(&self) -> Result<bool, QueueError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::Command(e.to_string()))?;
        Ok(pong == "PONG")
    }

    async fn shutdown(&self) {
        let mut slot = self.connection.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        // The socket closes once in-flight commands drop their clones.
        if slot.take().is_some() {
            tracing::info!("Redis connection released");
        }
        tracing::info!("Redis queue shut down");
    }
}

fn list_key(queue: &str) -> String {
    format!("{KEY_PREFIX}{queue}")
}

fn invalid_connection_string(reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        key: keys::CONNECTION_STRING,
        value: "<redacted>".to_string(),
        reason: reason.into(),
    }
}

/// Accepts a `redis://`/`rediss://` URL or `host[:port][,option=value...]`.
/// A non-empty configured password overrides any embedded one.
fn connection_info(
    connection_string: &str,
    password: &str,
) -> Result<ConnectionInfo, ConfigurationError> {
    let (url, embedded_password) = if connection_string.contains("://") {
        (connection_string.trim().to_string(), None)
    } else {
        url_from_options(connection_string)?
    };

    let mut info = url
        .as_str()
        .into_connection_info()
        .map_err(|e| invalid_connection_string(e.to_string()))?;

    if let Some(embedded) = embedded_password {
        info.redis.password = Some(embedded);
    }
    if !password.is_empty() {
        info.redis.password = Some(password.to_string());
    }

    Ok(info)
}

fn url_from_options(value: &str) -> Result<(String, Option<String>), ConfigurationError> {
    let mut endpoint = None;
    let mut password = None;
    let mut tls = false;
    let mut database = 0i64;

    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((option, setting)) => match option.trim().to_ascii_lowercase().as_str() {
                "password" => password = Some(setting.trim().to_string()),
                "ssl" => {
                    tls = parse_bool(setting)
                        .ok_or_else(|| invalid_connection_string("ssl must be true or false"))?;
                }
                "defaultdatabase" => {
                    database = setting.trim().parse().map_err(|_| {
                        invalid_connection_string("defaultDatabase must be an integer")
                    })?;
                }
                other => tracing::debug!("Ignoring Redis option {}", other),
            },
            None if endpoint.is_none() => endpoint = Some(part),
            None => tracing::warn!("Only the first Redis endpoint is used, ignoring {}", part),
        }
    }

    let endpoint = endpoint.ok_or_else(|| invalid_connection_string("no Redis endpoint"))?;
    let (host, port) = match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| invalid_connection_string("Redis port must be a number"))?;
            (host, port)
        }
        _ => (endpoint, DEFAULT_PORT),
    };

    let scheme = if tls { "rediss" } else { "redis" };
    Ok((format!("{scheme}://{host}:{port}/{database}"), password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::PlainSettings;
    use redis::ConnectionAddr;

    fn plain(connection_string: &str, password: &str) -> ServiceSettings {
        ServiceSettings::Plain(PlainSettings {
            connection_string: connection_string.to_string(),
            password: password.to_string(),
        })
    }

    #[test]
    fn test_url_connection_string() {
        let info = connection_info("redis://cache.local:6380/3", "").unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6380) if host == "cache.local"));
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password, None);
    }

    #[test]
    fn test_options_connection_string() {
        let info =
            connection_info("cache.local:6380,password=embedded,defaultDatabase=2,abortConnect=false", "")
                .unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6380) if host == "cache.local"));
        assert_eq!(info.redis.db, 2);
        assert_eq!(info.redis.password.as_deref(), Some("embedded"));
    }

    #[test]
    fn test_bare_host_uses_default_port() {
        let info = connection_info("cs1", "").unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6379) if host == "cs1"));
    }

    #[test]
    fn test_configured_password_wins() {
        let info = connection_info("cache.local,password=embedded", "configured").unwrap();
        assert_eq!(info.redis.password.as_deref(), Some("configured"));
    }

    #[test]
    fn test_bad_port_is_configuration_error() {
        let err = connection_info("cache.local:notaport", "").unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { key: "ConnectionString", .. }));
    }

    #[test]
    fn test_empty_options_have_no_endpoint() {
        let err = connection_info(",password=x", "").unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { key: "ConnectionString", .. }));
    }

    #[test]
    fn test_construction_does_not_connect() {
        // Nothing listens on this port; creating the handle must still succeed.
        let queue = RedisQueue::new(&plain("127.0.0.1:1", "p1"));
        assert!(queue.is_ok());
    }

    #[test]
    fn test_errors_do_not_echo_connection_string() {
        let err = connection_info("secret-host:bad", "").unwrap_err();
        assert!(!err.to_string().contains("secret-host"));
    }

    #[test]
    fn test_list_key() {
        assert_eq!(list_key("orders"), "queue:orders");
    }

    #[test]
    fn test_ssl_option_selects_tls() {
        let info = connection_info(
            "fibo.redis.cache.windows.net:6380,password=x,ssl=True,abortConnect=False",
            "",
        )
        .unwrap();
        assert!(matches!(
            info.addr,
            ConnectionAddr::TcpTls { ref host, port: 6380, .. } if host == "fibo.redis.cache.windows.net"
        ));
    }

    #[test]
    fn test_tls_url_builds_client() {
        let queue = RedisQueue::new(&plain("rediss://fibo.redis.cache.windows.net:6380", "p1"));
        assert!(queue.is_ok());
    }

    #[test]
    fn test_unparseable_ssl_option_is_rejected() {
        for value in ["cache.local,ssl=yes", "cache.local,ssl=1", "cache.local,ssl="] {
            let err = connection_info(value, "").unwrap_err();
            assert!(
                matches!(err, ConfigurationError::Invalid { key: "ConnectionString", ref reason, .. }
                    if reason.contains("ssl")),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_ssl_false_stays_plaintext() {
        let info = connection_info("cache.local,ssl=false", "").unwrap();
        assert!(matches!(info.addr, ConnectionAddr::Tcp(ref host, 6379) if host == "cache.local"));
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let queue = RedisQueue::new(&plain("127.0.0.1:1", "")).unwrap();
        queue.shutdown().await;

        assert!(matches!(
            queue.enqueue("orders", "{}").await,
            Err(QueueError::Connection(_))
        ));
        assert!(matches!(queue.dequeue("orders").await, Err(QueueError::Connection(_))));
        assert!(matches!(queue.depth("orders").await, Err(QueueError::Connection(_))));
        assert!(matches!(queue.health_check().await, Err(QueueError::Connection(_))));
    }
}
