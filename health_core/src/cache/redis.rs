//! Redis client shared by the dashboard probes
//!
//! The connection is established on first use and reused afterwards. A failed
//! connect is not cached, so the next probe retries it. A cached connection
//! that turns out to be dropped is discarded and the command is retried once
//! on a fresh connection.

use crate::cache::CacheStore;
use crate::config::RedisConfig;
use crate::error::{AppError, Result};
use redis::{aio::MultiplexedConnection, Client, Cmd, FromRedisValue, RedisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone)]
pub struct RedisManager {
    client: Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
    connection_timeout: Duration,
}

impl RedisManager {
    /// Validates the URL without connecting.
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client configured");

        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
            connection_timeout: config.connection_timeout(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Opening multiplexed Redis connection");
        let conn = tokio::time::timeout(
            self.connection_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            AppError::Cache(format!(
                "Connection timed out after {}ms",
                self.connection_timeout.as_millis()
            ))
        })?
        .map_err(AppError::from)?;

        *cached = Some(conn.clone());
        Ok(conn)
    }

    async fn discard_connection(&self) {
        self.connection.lock().await.take();
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> Result<T> {
        let mut conn = self.connection().await?;

        match cmd.query_async(&mut conn).await {
            Ok(value) => Ok(value),
            Err(e) if is_dropped(&e) => {
                debug!("Redis connection dropped, reconnecting: {}", e);
                self.discard_connection().await;

                let mut conn = self.connection().await?;
                Ok(cmd.query_async(&mut conn).await?)
            }
            Err(e) => Err(AppError::from(e)),
        }
    }
}

fn is_dropped(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped()
}

#[async_trait::async_trait]
impl CacheStore for RedisManager {
    async fn ping(&self) -> Result<()> {
        let pong: String = self.query(&redis::cmd("PING")).await?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::Cache(format!("Unexpected PING reply: {}", pong)))
        }
    }

    async fn info(&self, section: &str) -> Result<String> {
        let mut cmd = redis::cmd("INFO");
        cmd.arg(section);
        self.query(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn read_line(buf: &[u8], pos: usize) -> Option<(&str, usize)> {
        let end = buf.get(pos..)?.windows(2).position(|w| w == b"\r\n")? + pos;
        Some((std::str::from_utf8(&buf[pos..end]).ok()?, end + 2))
    }

    /// Parses one RESP array command, returning its arguments and the bytes used.
    fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
        let (header, mut pos) = read_line(buf, 0)?;
        let count: usize = header.strip_prefix('*')?.parse().ok()?;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let (len_line, next) = read_line(buf, pos)?;
            let len: usize = len_line.strip_prefix('$')?.parse().ok()?;
            if buf.len() < next + len + 2 {
                return None;
            }
            args.push(String::from_utf8_lossy(&buf[next..next + len]).into_owned());
            pos = next + len + 2;
        }

        Some((args, pos))
    }

    /// Answers PING with PONG and anything else with OK. With `close_after_ping`
    /// the socket is closed right after the first PONG.
    async fn serve_session(mut socket: TcpStream, close_after_ping: bool) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            while let Some((args, used)) = parse_command(&buf) {
                buf.drain(..used);
                let is_ping = args.first().is_some_and(|c| c.eq_ignore_ascii_case("PING"));
                let reply: &[u8] = if is_ping { b"+PONG\r\n" } else { b"+OK\r\n" };
                if socket.write_all(reply).await.is_err() {
                    return;
                }
                if is_ping && close_after_ping {
                    return;
                }
            }

            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Fake Redis whose first connection is closed after one PING.
    async fn spawn_flaky_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
                tokio::spawn(serve_session(socket, first));
            }
        });

        (format!("redis://{}", addr), accepted)
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = RedisConfig {
            url: "not a redis url".to_string(),
            ..RedisConfig::default()
        };
        assert!(matches!(RedisManager::new(&config), Err(AppError::Cache(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_error() {
        // Port 1 is reserved and nothing listens on it.
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connection_timeout_seconds: 1,
        };
        let manager = RedisManager::new(&config).unwrap();

        assert!(manager.ping().await.is_err());
        assert!(manager.info("clients").await.is_err());
    }

    #[tokio::test]
    async fn test_reconnects_after_connection_dropped() {
        let (url, accepted) = spawn_flaky_server().await;
        let manager = RedisManager::new(&RedisConfig {
            url,
            connection_timeout_seconds: 1,
        })
        .unwrap();

        manager.ping().await.unwrap();

        // Let the client notice the closed socket.
        tokio::time::sleep(Duration::from_millis(50)).await;

        for _ in 0..3 {
            manager.ping().await.unwrap();
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_parse_command_waits_for_full_frame() {
        let frame = b"*2\r\n$4\r\nINFO\r\n$7\r\nclients\r\n";
        assert!(parse_command(&frame[..10]).is_none());

        let (args, used) = parse_command(frame).unwrap();
        assert_eq!(args, vec!["INFO".to_string(), "clients".to_string()]);
        assert_eq!(used, frame.len());
    }
}
