// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// What's in this layer:
//
//   model.rs     - GPT-style decoder-only language model:
//                  token + learned position embeddings,
//                  pre-norm blocks with causal self-attention
//                  and a GELU feed-forward, untied LM head.
//                  Also reads the registry's config.json.
//
//   trainer.rs   - The training loop: forward pass, next-token
//                  loss, backward pass, optimiser step with a
//                  linear learning-rate schedule, per-step
//                  logging and step-based checkpoints.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Radford et al. (2019) Language Models are
//            Unsupervised Multitask Learners

/// Decoder-only causal language model
pub mod model;

/// Training loop with step checkpoints
pub mod trainer;
