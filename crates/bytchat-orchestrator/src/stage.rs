// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request pipeline stages.

use strum::Display;

/// Where a request currently is in the pipeline.
///
/// Stages run in declaration order; `AdmitCheck` and `RecordUsage` only run
/// on the metered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestStage {
    RetrieveContext,
    BuildPrompt,
    SelectModel,
    AdmitCheck,
    CallProvider,
    RecordUsage,
    Emit,
}

/// Which delivery path a request took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeliveryPath {
    /// Buffered call, usage recorded, answer emitted as one fragment.
    Metered,
    /// Fragment-by-fragment, never billed.
    Streaming,
}

impl DeliveryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPath::Metered => "metered",
            DeliveryPath::Streaming => "streaming",
        }
    }
}
