// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context retrieval for the Bytchat gateway.
//!
//! Scores a tenant's ingested document chunks against the embedded query and
//! returns the best matches as plain text for prompt augmentation.

pub mod retriever;
pub mod store;
pub mod vector;

pub use retriever::VectorRetriever;
pub use store::{ChunkStore, StoredChunk};
pub use vector::{blob_to_vec, cosine_similarity, vec_to_blob, EmbeddingDecodeError};
