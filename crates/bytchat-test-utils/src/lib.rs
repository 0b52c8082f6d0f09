// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Bytchat integration tests.
//!
//! Mock adapters and an in-memory harness for fast, deterministic tests
//! without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted provider with call counters
//! - [`MockRetriever`] - fixed context chunks
//! - [`StaticBotDirectory`] - bots from a map, or a failing backend
//! - [`TestHarness`] - in-memory database plus quota ledger

pub mod directory;
pub mod harness;
pub mod mock_provider;
pub mod mock_retriever;

pub use directory::StaticBotDirectory;
pub use harness::TestHarness;
pub use mock_provider::MockProvider;
pub use mock_retriever::MockRetriever;
