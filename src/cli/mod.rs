// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, builds the concrete console, runner and trigger, and
// hands them to Layer 2.
//
//   career-compass            -> interactive menu
//   career-compass menu       -> interactive menu
//   career-compass train      -> one training run (what menu
//                                choice 1 spawns)
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use burn::backend::{wgpu::WgpuDevice, Autodiff, Wgpu};
use clap::Parser;
use std::io;

use crate::application::{menu_use_case::MenuController, train_use_case::TrainUseCase};
use crate::domain::traits::CommandSpec;
use crate::infra::{
    console::{Console, Role, Theme},
    process::SystemProcessRunner,
    workflow::HttpWorkflowTrigger,
};
use commands::{Commands, MenuArgs, TrainArgs};

/// Backend for real training runs; tests use NdArray instead.
type TrainBackend = Autodiff<Wgpu>;

#[derive(Parser, Debug)]
#[command(
    name = "career-compass",
    version,
    about = "Career Compass: launch model training and trigger the job-matching workflow.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub menu: MenuArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            None                        => run_menu(self.menu),
            Some(Commands::Menu(args))  => run_menu(args),
            Some(Commands::Train(args)) => run_train(args),
        }
    }
}

fn theme(no_color: bool) -> Theme {
    if no_color { Theme::plain() } else { Theme::default() }
}

fn run_menu(args: MenuArgs) -> Result<()> {
    let exe = std::env::current_exe().context("Cannot locate the running executable")?;
    let train_command = CommandSpec::new(exe)
        .arg("train")
        .arg("--config")
        .arg(args.config.as_os_str());
    let trigger = HttpWorkflowTrigger::new(args.workflow_url)?;

    let console = Console::new(theme(args.no_color), io::stdin().lock(), io::stdout());
    let mut controller = MenuController::new(
        console,
        Box::new(SystemProcessRunner),
        Box::new(trigger),
        train_command,
    );
    controller.run()?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training with config '{}'", args.config.display());

    let summary = TrainUseCase::new(&args.config).execute::<TrainBackend>(WgpuDevice::default())?;

    let mut console = Console::new(theme(args.no_color), io::empty(), io::stdout());
    console.print(
        Role::Success,
        &format!(
            "Training completed! {} samples from {} records, {} steps, final loss {:.4}. Model saved to {}",
            summary.samples,
            summary.records,
            summary.steps,
            summary.final_loss,
            summary.output_dir.display()
        ),
    )?;
    Ok(())
}
