//! # cf-engine
//!
//! Experiment orchestration for the ChromaFlow mixing rig: a single worker
//! loop that owns the actuator and sensor for the duration of a run, drives
//! one or both optimization strategies against them, and reports progress
//! through non-blocking queues consumed by a separate polling task.

mod cancel;
mod orchestrator;
mod report;

pub use cancel::CancelToken;
pub use orchestrator::{Orchestrator, RunMode};
pub use report::{
    report_channels, spawn_consumer, MemorySink, ReportQueues, ReportReceivers, ReportSink,
    TracingSink, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY,
};
