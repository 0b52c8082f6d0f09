// SPDX-FileCopyrightText: 2026 Bytchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding BLOB codec and similarity scoring.

use thiserror::Error;

/// Reasons a stored embedding cannot be scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingDecodeError {
    #[error("blob length {0} is not a multiple of 4")]
    Misaligned(usize),
    #[error("embedding is empty")]
    Empty,
    #[error("embedding contains a non-finite value at index {0}")]
    NonFinite(usize),
}

/// Encode a vector as little-endian f32 bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a little-endian f32 BLOB, rejecting anything that cannot be scored.
pub fn blob_to_vec(blob: &[u8]) -> Result<Vec<f32>, EmbeddingDecodeError> {
    if blob.is_empty() {
        return Err(EmbeddingDecodeError::Empty);
    }
    if blob.len() % 4 != 0 {
        return Err(EmbeddingDecodeError::Misaligned(blob.len()));
    }
    let vec: Vec<f32> = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    match vec.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EmbeddingDecodeError::NonFinite(index)),
        None => Ok(vec),
    }
}

/// Cosine similarity, or `None` when dimensions differ or a vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trip() {
        let original = vec![0.1_f32, -0.5, 1.0, 42.0];
        let blob = vec_to_blob(&original);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob_to_vec(&blob).unwrap(), original);
    }

    #[test]
    fn corrupted_blobs_are_rejected() {
        assert_eq!(blob_to_vec(&[1, 2, 3]), Err(EmbeddingDecodeError::Misaligned(3)));
        assert_eq!(blob_to_vec(&[]), Err(EmbeddingDecodeError::Empty));
        let nan = vec_to_blob(&[1.0, f32::NAN]);
        assert_eq!(blob_to_vec(&nan), Err(EmbeddingDecodeError::NonFinite(1)));
    }

    #[test]
    fn cosine_is_scale_invariant() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_rejects_mismatch_and_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), None);
    }
}
