// ============================================================
// Layer 3 - Training Configuration
// ============================================================
// The YAML document that drives one training run.
//
// Only the keys the pipeline actually reads are modelled here.
// serde ignores everything else, so the same file can carry
// settings for other trainers without breaking this one.
//
// A referenced key that is missing surfaces as a serde_yaml
// error naming the field, e.g.
//   "training: missing field `save_steps` at line 2 column 3"
//
// Reference: serde_yaml crate documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Default location of the training configuration, relative to the
/// working directory of the process.
pub const DEFAULT_CONFIG_PATH: &str = "oumi_train.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingConfig {
    pub model:    ModelSection,
    pub training: TrainingSection,
    pub data:     DataSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSection {
    /// Registry id (e.g. "gpt2") or a local directory
    pub model_name: String,

    #[serde(default)]
    pub trust_remote_code: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingSection {
    pub output_dir:                  String,
    pub num_train_epochs:            usize,
    pub per_device_train_batch_size: usize,
    pub learning_rate:               f64,
    /// Checkpoint interval in optimizer steps
    pub save_steps:                  usize,
    pub dataloader_num_workers:      usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    pub train: DatasetSplit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSplit {
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,

    pub dataset_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
}

impl TrainingConfig {
    /// Read and parse the configuration file.
    ///
    /// The underlying `std::io::Error` is kept in the error chain so
    /// callers can tell a missing file apart from a malformed one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The dataset the pipeline trains on: always the first entry.
    pub fn primary_dataset(&self) -> Result<&DatasetEntry> {
        self.data
            .train
            .datasets
            .first()
            .context("data.train.datasets[0]: no dataset configured")
    }
}
