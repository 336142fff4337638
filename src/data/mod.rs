// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// This layer handles everything from a raw text file
// all the way to tensor batches.
//
// The pipeline flows in this order:
//
//   data.txt (or a directory of *.txt)
//       │
//       ▼
//   TextLineLoader    → one record per line
//       │
//       ▼
//   tokenize_dataset  → token ids, truncated at 128
//       │
//       ▼
//   CausalLmDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   CausalLmBatcher   → pads per batch, shifts targets by one
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads line-oriented text datasets
pub mod loader;

/// Text, tokenized and trainable dataset types
pub mod dataset;

/// Tokenisation with truncation
pub mod tokenize;

/// Implements Burn's Batcher trait for next-token batches
pub mod batcher;
