// ============================================================
// Layer 4 - Causal LM Collation
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TokenizedRecord>
// into input/target tensors for next-token prediction.
//
// Records have different lengths, so every batch is padded to
// its longest record with the pad id. Then:
//
//   padded:  [t0, t1, t2, t3, PAD]
//   inputs:  [t0, t1, t2, t3]       (drop last)
//   targets: [t1, t2, t3, PAD]      (drop first)
//
// Targets equal to the pad id are ignored by the loss, so padding
// never contributes to training. No tokens are masked out of the
// inputs (causal objective, not masked language modelling).
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::TokenizedRecord;

#[derive(Debug, Clone)]
pub struct CausalLmBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub inputs:  Tensor<B, 2, Int>,
    /// [batch_size, seq_len], inputs shifted left by one
    pub targets: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct CausalLmBatcher<B: Backend> {
    device: B::Device,
    pad_id: u32,
}

impl<B: Backend> CausalLmBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

/// Flat row-major inputs and targets plus the per-row length.
#[derive(Debug, PartialEq, Eq)]
pub struct Collated {
    pub inputs:  Vec<i32>,
    pub targets: Vec<i32>,
    pub seq_len: usize,
}

pub fn collate(items: &[TokenizedRecord], pad_id: u32) -> Collated {
    let longest = items.iter().map(|r| r.input_ids.len()).max().unwrap_or(0);
    let seq_len = longest.saturating_sub(1);

    let mut inputs  = Vec::with_capacity(items.len() * seq_len);
    let mut targets = Vec::with_capacity(items.len() * seq_len);

    for item in items {
        let padded: Vec<i32> = item
            .input_ids
            .iter()
            .copied()
            .chain(std::iter::repeat(pad_id))
            .take(longest)
            .map(|id| id as i32)
            .collect();
        if longest > 0 {
            inputs.extend_from_slice(&padded[..seq_len]);
            targets.extend_from_slice(&padded[1..]);
        }
    }

    Collated { inputs, targets, seq_len }
}

impl<B: Backend> Batcher<TokenizedRecord, CausalLmBatch<B>> for CausalLmBatcher<B> {
    fn batch(&self, items: Vec<TokenizedRecord>) -> CausalLmBatch<B> {
        let batch_size = items.len();
        let collated   = collate(&items, self.pad_id);

        let inputs = Tensor::<B, 1, Int>::from_ints(collated.inputs.as_slice(), &self.device)
            .reshape([batch_size, collated.seq_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(collated.targets.as_slice(), &self.device)
            .reshape([batch_size, collated.seq_len]);

        CausalLmBatch { inputs, targets }
    }
}
