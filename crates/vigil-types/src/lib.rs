//! Core types for the Vigil observability runtime.
//!
//! This crate is the leaf of the workspace: the telemetry data model and
//! the unified error model, with no dependency on the plugin contracts or
//! the runtime.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  vigil-types   : DataPoint, Analysis, AgentResponse,│
//! │                  FrameworkError          ◄── HERE   │
//! │  vigil-plugin  : plugin contracts + lifecycle       │
//! │  vigil-runtime : registry, factory, engine, health  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data flow
//!
//! Collectors emit batches of [`DataPoint`]s; analyzers may condense a
//! batch into an [`Analysis`]; agents answer queries with an
//! [`AgentResponse`]. Every fallible operation in the workspace reports a
//! structured [`FrameworkError`].

mod agent;
mod analysis;
mod data;
mod error;

pub use agent::{AgentAction, AgentResponse};
pub use analysis::{Analysis, AnalysisKind, Severity};
pub use data::DataPoint;
pub use error::{ErrorKind, FrameworkError};
