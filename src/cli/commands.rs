// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `menu` (the default) and `train`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for unknown flags
//   - type conversion (string -> PathBuf, bool)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::domain::config::DEFAULT_CONFIG_PATH;
use crate::infra::workflow::DEFAULT_WORKFLOW_URL;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the interactive menu (default)
    Menu(MenuArgs),

    /// Run one training pass from a YAML config
    Train(TrainArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct MenuArgs {
    /// Config handed to the training run started from the menu
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Endpoint called by "Run Workflow"
    #[arg(long, env = "COMPASS_WORKFLOW_URL", default_value = DEFAULT_WORKFLOW_URL)]
    pub workflow_url: String,

    /// Print without ANSI colours
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// YAML training config
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Print without ANSI colours
    #[arg(long)]
    pub no_color: bool,
}
