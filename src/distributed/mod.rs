//! Distributed scheduling
//!
//! One coordinator process owns the picture backlog and result collection;
//! one or more worker-service processes each run the per-picture search.
//! Communication is message passing over TCP (see `protocol`); there is no
//! shared memory across process boundaries.

pub mod coordinator;
pub mod protocol;
pub mod worker_service;

pub use coordinator::Coordinator;
pub use worker_service::WorkerService;
