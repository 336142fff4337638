// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Concrete implementations of everything that touches the
// outside world:
//
//   checkpoint.rs      - weights via Burn's CompactRecorder,
//                        checkpoint-N rotation, JSON side files
//   pretrained.rs      - GPT-2 model.safetensors into CausalLm
//   tokenizer_store.rs - loads tokenizer.json, aliases pad to
//                        eos when needed, saves it back out
//   metrics.rs         - per-step loss CSV
//   registry.rs        - pretrained files from a local dir or
//                        the HuggingFace Hub
//   process.rs         - std::process runner for the menu
//   workflow.rs        - reqwest GET to the workflow endpoint
//   console.rs         - coloured output and line input
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pretrained GPT-2 weight import
pub mod pretrained;

/// Tokenizer loading, pad token resolution and saving
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

/// Local and HuggingFace Hub model registries
pub mod registry;

/// Child process runner
pub mod process;

/// HTTP workflow trigger
pub mod workflow;

/// Styled console
pub mod console;
