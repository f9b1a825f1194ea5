//! Worker service
//!
//! Runs on each worker host, accepting coordinator connections. A session
//! starts with the one-time broadcast (threshold + object set, retained for
//! the whole session), then alternates: receive one picture, search it with
//! the engine, send one result. Terminate ends the session and releases the
//! retained object set.
//!
//! A worker holds at most one assigned picture at a time; all concurrency is
//! inside the engine's per-picture object fan-out. The search runs on a
//! blocking thread so the service's IO stays responsive while the engine
//! occupies its pool. After a session the service waits for the next
//! coordinator connection.

use crate::config::SearchConfig;
use crate::distributed::protocol::*;
use crate::engine::SearchEngine;
use crate::matcher::create_matcher;
use crate::problem::ObjectPattern;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

/// Worker service
pub struct WorkerService {
    /// Port to listen on
    listen_port: u16,

    /// Worker identifier (hostname), carried in every result
    node_id: String,

    /// Search engine tuning
    search: SearchConfig,
}

impl WorkerService {
    pub fn new(listen_port: u16, search: SearchConfig) -> Result<Self> {
        let node_id = get_node_id();

        Ok(Self {
            listen_port,
            node_id,
            search,
        })
    }

    /// Listen for coordinator connections, one session at a time.
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.listen_port);
        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind worker service")?;

        println!("Worker service listening on port {}", self.listen_port);
        println!("Node ID: {}", self.node_id);
        println!(
            "Search pool: {} tasks, {} devices",
            self.search.threads, self.search.devices
        );
        println!("Waiting for coordinator connection...");

        loop {
            let (mut stream, addr) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            println!("Coordinator connected from: {}", addr);

            if let Err(e) = self.handle_session(&mut stream).await {
                eprintln!("Session failed: {:#}", e);
            }

            println!("Session complete. Waiting for next coordinator...");
        }
    }

    /// Handle one coordinator session over any duplex stream.
    pub async fn handle_session<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // The session must open with the broadcast; nothing can be searched
        // before the object set is retained.
        let broadcast = match read_message(stream).await? {
            Message::Broadcast(b) => b,
            other => anyhow::bail!("Expected broadcast, got {:?}", other),
        };

        if broadcast.protocol_version != PROTOCOL_VERSION {
            let error = ErrorMessage {
                node_id: self.node_id.clone(),
                error: format!(
                    "Protocol version mismatch: coordinator={}, worker={}",
                    broadcast.protocol_version, PROTOCOL_VERSION
                ),
            };
            write_message(stream, &Message::Error(error)).await?;
            anyhow::bail!("Protocol version mismatch");
        }

        println!(
            "Retained {} objects, threshold {:.6}",
            broadcast.objects.len(),
            broadcast.threshold
        );

        let objects: Arc<Vec<ObjectPattern>> = Arc::new(broadcast.objects);
        let threshold = broadcast.threshold;

        let matcher = create_matcher(self.search.matcher);
        let engine = Arc::new(SearchEngine::new(
            matcher,
            self.search.threads,
            self.search.devices,
        )?);

        let mut completed = 0u64;
        loop {
            match read_message(stream).await? {
                Message::Assign(assign) => {
                    // The single in-flight picture; dropped when its result
                    // has been produced.
                    let picture = assign.picture;
                    let engine = Arc::clone(&engine);
                    let objects = Arc::clone(&objects);

                    let started = Instant::now();
                    let result = tokio::task::spawn_blocking(move || {
                        engine.search(&picture, &objects, threshold)
                    })
                    .await
                    .context("Search task panicked")?;
                    let search_ns = started.elapsed().as_nanos() as u64;

                    let reply = ResultMessage {
                        node_id: self.node_id.clone(),
                        result,
                        search_ns,
                    };
                    write_message(stream, &Message::Result(reply)).await?;
                    completed += 1;
                }
                Message::Terminate => break,
                other => anyhow::bail!("Unexpected message: {:?}", other),
            }
        }

        println!("Terminated after {} pictures", completed);
        Ok(())
    }
}

/// Worker identifier (hostname, falling back to "unknown")
fn get_node_id() -> String {
    if let Ok(name) = hostname::get() {
        if let Ok(name_str) = name.into_string() {
            return name_str;
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherKind;
    use crate::problem::Picture;

    fn service() -> WorkerService {
        WorkerService::new(
            0,
            SearchConfig {
                threads: 2,
                devices: 1,
                matcher: MatcherKind::Cpu,
            },
        )
        .unwrap()
    }

    async fn send(stream: &mut (impl AsyncWrite + Unpin), msg: Message) {
        write_message(stream, &msg).await.unwrap();
    }

    async fn recv(stream: &mut (impl AsyncRead + Unpin)) -> Message {
        read_message(stream).await.unwrap()
    }

    #[tokio::test]
    async fn test_session_broadcast_assign_result_terminate() {
        let (mut coordinator_side, mut worker_side) = tokio::io::duplex(64 * 1024);

        let service = service();
        let session =
            tokio::spawn(async move { service.handle_session(&mut worker_side).await });

        send(
            &mut coordinator_side,
            Message::Broadcast(BroadcastMessage {
                protocol_version: PROTOCOL_VERSION,
                threshold: 0.0,
                objects: vec![ObjectPattern {
                    id: 2,
                    size: 2,
                    cells: vec![0; 4],
                }],
            }),
        )
        .await;

        // All-zero 3x3 picture: the all-zero 2x2 object matches at the origin.
        send(
            &mut coordinator_side,
            Message::Assign(AssignMessage {
                picture: Picture {
                    id: 5,
                    size: 3,
                    cells: vec![0; 9],
                },
            }),
        )
        .await;

        match recv(&mut coordinator_side).await {
            Message::Result(r) => {
                assert_eq!(r.result.picture_id, 5);
                let loc = r.result.location.expect("expected a match");
                assert_eq!((loc.object_id, loc.row, loc.col), (2, 0, 0));
                assert!(!r.node_id.is_empty());
            }
            other => panic!("Expected result, got {:?}", other),
        }

        send(&mut coordinator_side, Message::Terminate).await;
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_session_with_no_objects_reports_no_match() {
        let (mut coordinator_side, mut worker_side) = tokio::io::duplex(64 * 1024);

        let service = service();
        let session =
            tokio::spawn(async move { service.handle_session(&mut worker_side).await });

        send(
            &mut coordinator_side,
            Message::Broadcast(BroadcastMessage {
                protocol_version: PROTOCOL_VERSION,
                threshold: 0.5,
                objects: Vec::new(),
            }),
        )
        .await;

        send(
            &mut coordinator_side,
            Message::Assign(AssignMessage {
                picture: Picture {
                    id: 9,
                    size: 1,
                    cells: vec![4],
                },
            }),
        )
        .await;

        match recv(&mut coordinator_side).await {
            Message::Result(r) => {
                assert_eq!(r.result.picture_id, 9);
                assert!(r.result.location.is_none());
            }
            other => panic!("Expected result, got {:?}", other),
        }

        send(&mut coordinator_side, Message::Terminate).await;
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_version_mismatch_is_reported_and_aborts_session() {
        let (mut coordinator_side, mut worker_side) = tokio::io::duplex(64 * 1024);

        let service = service();
        let session =
            tokio::spawn(async move { service.handle_session(&mut worker_side).await });

        send(
            &mut coordinator_side,
            Message::Broadcast(BroadcastMessage {
                protocol_version: PROTOCOL_VERSION + 1,
                threshold: 0.0,
                objects: Vec::new(),
            }),
        )
        .await;

        match recv(&mut coordinator_side).await {
            Message::Error(err) => assert!(err.error.contains("version mismatch")),
            other => panic!("Expected error, got {:?}", other),
        }

        assert!(session.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_picture_before_broadcast_is_rejected() {
        let (mut coordinator_side, mut worker_side) = tokio::io::duplex(64 * 1024);

        let service = service();
        let session =
            tokio::spawn(async move { service.handle_session(&mut worker_side).await });

        send(
            &mut coordinator_side,
            Message::Assign(AssignMessage {
                picture: Picture {
                    id: 1,
                    size: 1,
                    cells: vec![0],
                },
            }),
        )
        .await;

        assert!(session.await.unwrap().is_err());
    }
}
