//! Cognitive Bandwidth Router — decides whether an incoming AI-agent or
//! monitoring task should interrupt a human immediately, be queued for
//! batched review, be auto-resolved, or parked, as a joint function of
//! task urgency, model confidence, and a real-time estimate of operator
//! attention load.
pub mod attention;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod event_bus;
pub mod model;
pub mod policy;
pub mod providers;
pub mod service;
pub mod sink;
pub mod telemetry;
pub mod workflow;

pub use error::{Result, RouterError};
pub use model::{Rationale, SensitivityTag, Strategy, TaskIntent, WorkItem};
pub use policy::RoutingPolicy;
pub use service::RouterService;
