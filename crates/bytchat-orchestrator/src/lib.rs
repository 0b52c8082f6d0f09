// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request orchestration for the Bytchat gateway.
//!
//! [`RequestOrchestrator::handle_query`] runs a query through context
//! retrieval, prompt assembly, model routing, and then one of two delivery
//! paths:
//!
//! - **metered**: tracked owners with metrics enabled are admitted against
//!   their quota, answered with a buffered call, billed, and sent one fragment;
//! - **streaming**: everyone else gets the provider's fragments as they
//!   arrive, unbilled.
//!
//! A failed metered call falls back to the streaming path once. Build with the
//! `prometheus` feature to record pipeline counters.

pub mod context;
pub mod orchestrator;
pub mod prompt;
pub mod stage;
mod telemetry;

pub use context::NoContext;
pub use orchestrator::{AnswerStream, PipelineSettings, RequestOrchestrator};
pub use stage::{DeliveryPath, RequestStage};
