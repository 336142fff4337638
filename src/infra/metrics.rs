// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records the training loss to a CSV file after every logged
// optimizer step.
//
// Output file: <output_dir>/trainer_log.csv
//
//   step,epoch,loss,learning_rate
//   1,1,2.812300,5.000000e-5
//   2,1,2.790100,2.500000e-5
//
// The header is written once; later runs against the same
// output directory append below it.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "step,epoch,loss,learning_rate";

/// One logged optimizer step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepMetrics {
    /// Global step, starting at 1
    pub step:          usize,
    /// Epoch the step belongs to, starting at 1
    pub epoch:         usize,
    pub loss:          f64,
    /// Learning rate used for this step
    pub learning_rate: f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("trainer_log.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{},{},{:.6},{:.6e}", m.step, m.epoch, m.loss, m.learning_rate)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
