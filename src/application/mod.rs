// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (running the menu or a training run).
//
// Rules for this layer:
//   - No ML math or model code here
//   - Console output only through the injected Console
//   - Side effects only through the Layer 3 traits
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The interactive menu loop
pub mod menu_use_case;

// The training workflow
pub mod train_use_case;
