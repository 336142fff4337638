// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// plus the JSON side files a trained model directory carries.
//
// Layout of an output directory:
//   out/
//     model.mpk              final weights
//     config.json            architecture (registry format)
//     tokenizer.json         written by TokenizerStore
//     tokenizer_config.json  written by TokenizerStore
//     training_args.json     hyperparameters of the run
//     trainer_log.csv        per-step loss (MetricsLogger)
//     checkpoint-10/
//       model.mpk
//       trainer_state.json
//     checkpoint-20/ ...
//
// Only the newest `save_total_limit` checkpoint-* directories
// are kept. The final directory is itself loadable as a local
// pretrained model.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::model::CausalLm;

/// File stem of saved weights; the recorder adds `.mpk`.
pub const WEIGHTS_STEM: &str = "model";
pub const WEIGHTS_FILE: &str = "model.mpk";

const CHECKPOINT_PREFIX: &str = "checkpoint-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainerState {
    pub global_step: usize,
    pub epoch:       usize,
    pub loss:        f64,
}

pub struct CheckpointManager {
    dir:         PathBuf,
    total_limit: usize,
}

impl CheckpointManager {
    /// Creates `dir` (like `mkdir -p`) if needed.
    pub fn new(dir: impl Into<PathBuf>, total_limit: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir, total_limit })
    }

    /// Save final weights to `{dir}/model.mpk`.
    pub fn save_model<B: Backend>(&self, model: &CausalLm<B>) -> Result<PathBuf> {
        record_model(model, &self.dir)?;
        Ok(self.dir.join(WEIGHTS_FILE))
    }

    /// Save a numbered checkpoint, then drop the oldest ones past the limit.
    pub fn save_checkpoint<B: Backend>(&self, model: &CausalLm<B>, state: &TrainerState) -> Result<()> {
        let ckpt_dir = self.dir.join(format!("{CHECKPOINT_PREFIX}{}", state.global_step));
        fs::create_dir_all(&ckpt_dir)
            .with_context(|| format!("Cannot create '{}'", ckpt_dir.display()))?;

        record_model(model, &ckpt_dir)?;
        write_json(&ckpt_dir.join("trainer_state.json"), state)?;
        tracing::info!("Saved checkpoint '{}'", ckpt_dir.display());

        self.rotate()
    }

    /// Write any serialisable value as pretty JSON into the output directory.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        write_json(&self.dir.join(name), value)
    }

    /// Existing checkpoints, oldest first.
    pub fn checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            let step = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(CHECKPOINT_PREFIX))
                .and_then(|s| s.parse::<usize>().ok());
            if let (Some(step), true) = (step, path.is_dir()) {
                found.push((step, path));
            }
        }
        found.sort_by_key(|(step, _)| *step);
        Ok(found)
    }

    fn rotate(&self) -> Result<()> {
        let checkpoints = self.checkpoints()?;
        let excess = checkpoints.len().saturating_sub(self.total_limit);
        for (step, path) in checkpoints.into_iter().take(excess) {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Cannot delete '{}'", path.display()))?;
            tracing::debug!("Deleted checkpoint {} (limit {})", step, self.total_limit);
        }
        Ok(())
    }

    /// Restore weights saved by `save_model` into `model`.
    /// The architecture must match the one that was saved.
    pub fn load_weights<B: Backend>(
        model:  CausalLm<B>,
        path:   &Path,
        device: &B::Device,
    ) -> Result<CausalLm<B>> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .with_context(|| format!("Cannot load weights '{}'", path.display()))?;
        tracing::info!("Loaded weights from '{}'", path.display());
        Ok(model.load_record(record))
    }
}

fn record_model<B: Backend>(model: &CausalLm<B>, dir: &Path) -> Result<()> {
    let path = dir.join(WEIGHTS_STEM);
    CompactRecorder::new()
        .record(model.clone().into_record(), path.clone())
        .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Cannot write '{}'", path.display()))
}
