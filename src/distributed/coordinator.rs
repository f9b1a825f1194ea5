//! Run coordinator
//!
//! The coordinator owns the global picture backlog and drives the run:
//!
//! - Loads the problem and opens the result sink before any assignment
//! - Connects to every worker and broadcasts the threshold and object set
//! - Primes each worker with one picture in backlog order
//! - Waits source-agnostically: whichever worker reports first is handed the
//!   next unassigned picture, so a fast worker pulls more work than a slow
//!   one (dynamic load balancing for heterogeneous per-picture cost)
//! - Persists each result immediately, in arrival order
//! - Sends Terminate once the backlog is empty and drains to zero active
//!   workers, then prints the run summary and the total-time line
//!
//! Output line order therefore reflects completion order, not backlog order,
//! and differs across runs. Any transport failure aborts the whole run:
//! fail-fast, no retry, no partial-result recovery beyond already-flushed
//! lines.

use crate::config::Config;
use crate::distributed::protocol::*;
use crate::output::{json, text, ResultWriter};
use crate::problem::{loader, Picture};
use crate::stats::RunStats;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Coordinator for one run
#[derive(Debug)]
pub struct Coordinator {
    config: Arc<Config>,

    /// Worker service addresses (host:port)
    worker_addresses: Vec<String>,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, worker_addresses: Vec<String>) -> Result<Self> {
        if worker_addresses.is_empty() {
            anyhow::bail!("At least one worker is required");
        }

        Ok(Self {
            config,
            worker_addresses,
        })
    }

    /// Run the whole workload to completion.
    pub async fn run(self) -> Result<()> {
        let started = Instant::now();

        // Load the problem before touching the network; a malformed input
        // aborts with no connections opened.
        let problem = loader::load_problem(&self.config.input)
            .with_context(|| format!("Input parse error: {}", self.config.input.display()))?;

        println!(
            "Loaded problem: {} pictures, {} objects, threshold {:.6}",
            problem.pictures.len(),
            problem.objects.len(),
            problem.threshold
        );
        if self.config.runtime.debug {
            problem.print_summary();
        }

        // The sink is open before scheduling begins so results can be
        // persisted the moment they arrive.
        let mut sink = ResultWriter::create(&self.config.output)?;

        println!();
        println!("Connecting to {} workers...", self.worker_addresses.len());

        let mut connections = Vec::new();
        for (idx, addr) in self.worker_addresses.iter().enumerate() {
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("Failed to connect to worker {} ({})", idx, addr))?;
            println!("  Connected to worker {} ({})", idx, addr);
            connections.push(stream);
        }

        // One-time broadcast: every worker retains the threshold and the
        // complete object set before any picture is assigned.
        let broadcast = BroadcastMessage {
            protocol_version: PROTOCOL_VERSION,
            threshold: problem.threshold,
            objects: problem.objects.clone(),
        };
        for (idx, stream) in connections.iter_mut().enumerate() {
            write_message(stream, &Message::Broadcast(broadcast.clone()))
                .await
                .with_context(|| format!("Failed to send broadcast to worker {}", idx))?;
        }
        println!(
            "Broadcast {} objects to all workers",
            problem.objects.len()
        );

        // Source-agnostic wait: each connection gets its own reader task
        // feeding one channel, so the coordinator reacts to whichever worker
        // reports first.
        let mut writers: Vec<OwnedWriteHalf> = Vec::with_capacity(connections.len());
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<Message>)>();
        for (idx, stream) in connections.into_iter().enumerate() {
            let (mut read_half, write_half) = stream.into_split();
            writers.push(write_half);

            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    match read_message(&mut read_half).await {
                        Ok(msg) => {
                            if tx.send((idx, Ok(msg))).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send((idx, Err(err)));
                            break;
                        }
                    }
                }
            });
        }
        drop(tx);

        // Prime phase: one picture per worker in backlog order. A worker the
        // backlog cannot supply is terminated right away so the run still
        // drains to zero active workers.
        let mut backlog = problem.pictures.into_iter();
        let mut terminated = vec![false; writers.len()];
        let mut active = writers.len();
        for idx in 0..writers.len() {
            match backlog.next() {
                Some(picture) => {
                    self.assign(&mut writers[idx], idx, picture).await?;
                }
                None => {
                    self.terminate(&mut writers[idx], idx).await?;
                    terminated[idx] = true;
                    active -= 1;
                }
            }
        }

        let mut stats = RunStats::new()?;

        // Steady state: persist each result as it arrives, then hand the
        // reporting worker the next picture or terminate it.
        while active > 0 {
            let (idx, msg) = rx
                .recv()
                .await
                .context("All worker connections closed before completion")?;

            // A terminated worker owes us nothing more; its connection
            // winding down (EOF on the reader task) is not a run failure.
            if terminated[idx] {
                continue;
            }

            let msg =
                msg.with_context(|| format!("Transport failure on worker {}", idx))?;

            match msg {
                Message::Result(result_msg) => {
                    sink.write_result(&result_msg.result)?;
                    stats.record(&result_msg);

                    if self.config.runtime.debug {
                        eprintln!(
                            "DEBUG: picture {} from worker {} ({}) in {}µs",
                            result_msg.result.picture_id,
                            idx,
                            result_msg.node_id,
                            result_msg.search_ns / 1_000
                        );
                    }

                    match backlog.next() {
                        Some(picture) => {
                            self.assign(&mut writers[idx], idx, picture).await?;
                        }
                        None => {
                            self.terminate(&mut writers[idx], idx).await?;
                            terminated[idx] = true;
                            active -= 1;
                        }
                    }
                }
                Message::Error(err) => {
                    anyhow::bail!(
                        "Worker {} ({}) reported error: {}",
                        idx,
                        err.node_id,
                        err.error
                    );
                }
                other => {
                    anyhow::bail!("Unexpected message from worker {}: {:?}", idx, other);
                }
            }
        }

        sink.finish()?;

        let elapsed = started.elapsed();

        println!();
        text::print_run_summary(&stats, elapsed, self.worker_addresses.len());

        if let Some(ref json_path) = self.config.json_summary {
            json::write_summary(json_path, &stats, elapsed, self.worker_addresses.len())?;
            println!("JSON summary written to: {}", json_path.display());
        }

        println!("Results written to: {}", self.config.output.display());
        println!("TotalTime = {:.6} seconds", elapsed.as_secs_f64());

        Ok(())
    }

    async fn assign(
        &self,
        writer: &mut OwnedWriteHalf,
        idx: usize,
        picture: Picture,
    ) -> Result<()> {
        let picture_id = picture.id;
        write_message(writer, &Message::Assign(AssignMessage { picture }))
            .await
            .with_context(|| {
                format!("Failed to assign picture {} to worker {}", picture_id, idx)
            })
    }

    async fn terminate(&self, writer: &mut OwnedWriteHalf, idx: usize) -> Result<()> {
        write_message(writer, &Message::Terminate)
            .await
            .with_context(|| format!("Failed to send terminate to worker {}", idx))
    }
}
