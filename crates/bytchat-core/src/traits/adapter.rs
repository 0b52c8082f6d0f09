// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all vendor adapters implement.

use async_trait::async_trait;

use crate::error::BytchatError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle, and health for a vendor adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, BytchatError>;

    /// Releases any held resources.
    async fn shutdown(&self) -> Result<(), BytchatError>;
}
