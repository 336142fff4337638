// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs, enums and traits. No burn types, no network,
// and the only file access is reading the YAML config.
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// The YAML document that drives a training run
pub mod config;

// The closed set of menu actions
pub mod menu;

// Capability traits implemented by the infra layer
pub mod traits;
