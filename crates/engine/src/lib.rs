//! Admission side of the bot: the global ingestion queue and the engine
//! that feeds it.
//!
//! Every inbound event passes through one [`queue::TaskQueue`], which
//! serializes turn handling at the configured concurrency and paces task
//! starts. [`pipeline::Engine`] owns the queue plus the operational surface
//! around it: the blacklist, the human-takeover notice, and the idle-session
//! sweep.

pub mod pipeline;
pub mod queue;

pub use {
    pipeline::{Engine, EngineSettings},
    queue::{QueueSettings, Task, TaskQueue},
};
