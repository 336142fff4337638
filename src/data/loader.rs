// ============================================================
// Layer 4 - Text Loader
// ============================================================
// Loads a line-oriented text dataset: one record per line.
//
// `dataset_path` may point at:
//   - a single file   -> every line of that file
//   - a directory     -> every *.txt file in it, in file-name order
//
// Empty lines are kept as (empty) records. They tokenise to
// nothing and are dropped later when training samples are built.
//
// Reference: Rust Book §12 (Reading a File)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::dataset::{TextDataset, TextRecord};

pub struct TextLineLoader {
    path: PathBuf,
}

impl TextLineLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<TextDataset> {
        let files = if self.path.is_dir() {
            list_text_files(&self.path)?
        } else {
            vec![self.path.clone()]
        };

        let mut records = Vec::new();
        for file in &files {
            let text = fs::read_to_string(file)
                .with_context(|| format!("Cannot read dataset file '{}'", file.display()))?;
            let before = records.len();
            records.extend(text.lines().map(TextRecord::new));
            tracing::debug!("Read {} lines from '{}'", records.len() - before, file.display());
        }

        tracing::info!("Loaded {} records from '{}'", records.len(), self.path.display());
        Ok(TextDataset::new(records))
    }
}

fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("txt") {
            files.push(path);
        } else {
            tracing::debug!("Skipping '{}'", path.display());
        }
    }
    files.sort();
    Ok(files)
}
