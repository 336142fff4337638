// ============================================================
// Layer 4 - Tokenisation
// ============================================================
// Text records in, token id records out. Every record is
// truncated to MAX_LENGTH tokens and the text is dropped.
// Padding is not applied here; collation pads per batch.

use anyhow::Result;
use tokenizers::{TruncationParams, TruncationStrategy};

use crate::data::dataset::{TextDataset, TokenizedDataset, TokenizedRecord};
use crate::infra::tokenizer_store::PreparedTokenizer;

/// Upper bound on tokens per record.
pub const MAX_LENGTH: usize = 128;

pub fn tokenize_dataset(dataset: TextDataset, prepared: &PreparedTokenizer) -> Result<TokenizedDataset> {
    let mut tokenizer = prepared.tokenizer().clone();
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_LENGTH,
            strategy:   TruncationStrategy::LongestFirst,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Cannot configure truncation: {e}"))?;

    let mut truncated = 0usize;
    let mut records = Vec::with_capacity(dataset.len());
    for record in dataset.records() {
        let enc = tokenizer
            .encode(record.text.as_str(), true)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        if !enc.get_overflowing().is_empty() {
            truncated += 1;
        }
        records.push(TokenizedRecord { input_ids: enc.get_ids().to_vec() });
    }

    tracing::info!(
        "Tokenised {} records (max_length={}, {} truncated)",
        records.len(),
        MAX_LENGTH,
        truncated
    );
    Ok(TokenizedDataset::new(records, prepared.pad_id()))
}
