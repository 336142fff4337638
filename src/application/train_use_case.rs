// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the YAML config       (Layer 3 - domain)
//   Step 2: Load the text dataset      (Layer 4 - data)
//   Step 3: Resolve tokenizer + model  (Layer 6 - infra)
//   Step 4: Tokenise, max 128 tokens   (Layer 4 - data)
//   Step 5: Build training arguments   (Layer 5 - ml)
//   Step 6: Run training loop          (Layer 5 - ml)
//   Step 7: Save model + tokenizer     (Layer 6 - infra)
//
// The config is read before anything else, so a missing file
// fails without touching the registry.
//
// Starting weights, first match wins:
//   model.mpk          a directory written by an earlier run
//   model.safetensors  pretrained GPT-2 weights (hub or local)
//   neither            fresh initialisation, with a warning
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use std::path::{Path, PathBuf};

use crate::data::{loader::TextLineLoader, tokenize::{tokenize_dataset, MAX_LENGTH}};
use crate::domain::{config::TrainingConfig, traits::ModelRegistry};
use crate::infra::{
    checkpoint::{CheckpointManager, WEIGHTS_FILE},
    pretrained::{load_gpt2_weights, SAFETENSORS_FILE},
    registry::{fetch_required, registry_for},
    tokenizer_store::{TokenizerStore, TOKENIZER_CONFIG_FILE, TOKENIZER_FILE},
};
use crate::ml::{
    model::ArchitectureConfig,
    trainer::{Trainer, TrainingArguments},
};

pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const TRAINING_ARGS_FILE: &str = "training_args.json";

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub records:    usize,
    pub samples:    usize,
    pub steps:      usize,
    pub final_loss: f64,
    pub output_dir: PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config_path: PathBuf,
    registry:    Option<Box<dyn ModelRegistry>>,
}

impl TrainUseCase {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self { config_path: config_path.into(), registry: None }
    }

    /// Resolve models through `registry` instead of picking one from the
    /// model id.
    #[cfg(test)]
    pub fn with_registry(mut self, registry: Box<dyn ModelRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Execute the full training pipeline end to end
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        // ── Step 1: Configuration ─────────────────────────────────────────────
        let config = TrainingConfig::load(&self.config_path)?;
        tracing::info!("Loaded config '{}'", self.config_path.display());

        // ── Step 2: Dataset ───────────────────────────────────────────────────
        let dataset_entry = config.primary_dataset()?;
        let dataset = TextLineLoader::new(&dataset_entry.dataset_path).load()?;
        let records = dataset.len();
        if dataset.is_empty() {
            tracing::warn!("Dataset '{}' has no records", dataset_entry.dataset_path);
        }

        // ── Step 3: Tokenizer and model ───────────────────────────────────────
        let model_id = config.model.model_name.as_str();
        if config.model.trust_remote_code {
            tracing::debug!("trust_remote_code has no effect for '{}'", model_id);
        }
        let owned_registry;
        let registry: &dyn ModelRegistry = match &self.registry {
            Some(r) => &**r,
            None => {
                owned_registry = registry_for(model_id)?;
                &*owned_registry
            }
        };

        let tokenizer_path = fetch_required(registry, model_id, TOKENIZER_FILE)?;
        let tokenizer_cfg  = registry.fetch(model_id, TOKENIZER_CONFIG_FILE)?;
        let arch_path      = fetch_required(registry, model_id, MODEL_CONFIG_FILE)?;
        // Only a directory written by an earlier run can hold model.mpk.
        let saved_weights = if Path::new(model_id).is_dir() {
            registry.fetch(model_id, WEIGHTS_FILE)?
        } else {
            None
        };
        let pretrained_weights = match saved_weights {
            Some(_) => None,
            None => registry.fetch(model_id, SAFETENSORS_FILE)?,
        };

        let tokenizer = TokenizerStore::load(&tokenizer_path, tokenizer_cfg.as_deref())?;
        tracing::info!(
            "Tokenizer: {} tokens, pad '{}' (id {}), eos {:?}",
            tokenizer.vocab_size(), tokenizer.pad_token(), tokenizer.pad_id(), tokenizer.eos_token()
        );
        let mut arch  = ArchitectureConfig::from_file(&arch_path)?;
        let model_cfg = arch.to_model_config(tokenizer.vocab_size());
        arch.vocab_size = model_cfg.vocab_size;

        anyhow::ensure!(
            model_cfg.max_positions >= MAX_LENGTH,
            "Model '{}' supports {} positions, fewer than the {} token maximum",
            model_id, model_cfg.max_positions, MAX_LENGTH
        );

        let mut model = model_cfg.init::<B>(&device);
        if let Some(path) = &saved_weights {
            model = CheckpointManager::load_weights(model, path, &device)?;
        } else if let Some(path) = &pretrained_weights {
            model = load_gpt2_weights(model, path, &device)?;
        } else {
            tracing::warn!(
                "Model '{}' ships no {} or {}; training from freshly initialised weights",
                model_id, WEIGHTS_FILE, SAFETENSORS_FILE
            );
        }

        // ── Step 4: Tokenise ──────────────────────────────────────────────────
        let tokenized = tokenize_dataset(dataset, &tokenizer)?;
        let pad_id    = tokenized.pad_id();
        tracing::debug!("Tokenised {} records", tokenized.len());
        let train_set = tokenized.into_training_set();
        let samples   = train_set.sample_count();

        // ── Step 5: Training arguments ────────────────────────────────────────
        let args = TrainingArguments::from_config(&config.training)?;
        let output_dir = args.output_dir.clone();

        // ── Step 6: Train ─────────────────────────────────────────────────────
        let mut trainer = Trainer::<B>::new(model, args.clone(), pad_id, device)?;
        let outcome = trainer.train(train_set)?;

        // ── Step 7: Save ──────────────────────────────────────────────────────
        let weights = trainer.save_model()?;
        let ckpt = trainer.checkpoints();
        ckpt.save_json(MODEL_CONFIG_FILE, &arch)?;
        ckpt.save_json(TRAINING_ARGS_FILE, &args)?;
        TokenizerStore::save(&tokenizer, &output_dir)?;
        tracing::info!("Saved model to '{}'", weights.display());

        Ok(TrainSummary {
            records,
            samples,
            steps: outcome.global_step,
            final_loss: outcome.final_loss,
            output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::registry::LocalRegistry;
    use crate::test_support::{write_gpt2_safetensors, write_tiny_model, Gpt2Shape, TINY_GPT2};
    use burn::backend::{Autodiff, NdArray};
    use std::{
        cell::{Cell, RefCell},
        fs,
        rc::Rc,
    };

    type B = Autodiff<NdArray>;

    /// Delegates to LocalRegistry and counts every lookup.
    struct CountingRegistry {
        calls: Rc<Cell<usize>>,
    }

    impl ModelRegistry for CountingRegistry {
        fn fetch(&self, model_id: &str, file: &str) -> Result<Option<PathBuf>> {
            self.calls.set(self.calls.get() + 1);
            LocalRegistry.fetch(model_id, file)
        }
    }

    /// Serves every model id from one directory, like a hub mirror,
    /// and records which files were asked for.
    struct MirrorRegistry {
        dir:       PathBuf,
        requested: Rc<RefCell<Vec<String>>>,
    }

    impl ModelRegistry for MirrorRegistry {
        fn fetch(&self, _model_id: &str, file: &str) -> Result<Option<PathBuf>> {
            self.requested.borrow_mut().push(file.to_string());
            let path = self.dir.join(file);
            Ok(path.is_file().then_some(path))
        }
    }

    fn write_config(root: &Path, model: &Path, out: &Path, epochs: usize, save_steps: usize) -> PathBuf {
        let yaml = format!(
            r#"
model:
  model_name: "{model}"
  trust_remote_code: true
training:
  output_dir: "{out}"
  num_train_epochs: {epochs}
  per_device_train_batch_size: 2
  learning_rate: 5.0e-5
  save_steps: {save_steps}
  dataloader_num_workers: 0
  max_steps: 99
data:
  train:
    datasets:
      - dataset_name: text
        dataset_path: "{data}"
        split: train
"#,
            model = model.display(),
            out = out.display(),
            data = root.join("data.txt").display(),
        );
        let path = root.join("oumi_train.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    fn scenario() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let model = root.path().join("tiny-gpt2");
        write_tiny_model(&model, true);
        fs::write(
            root.path().join("data.txt"),
            "the quick brown fox\njumps over the lazy dog\ncareer compass\njob match\n",
        )
        .unwrap();
        let out = root.path().join("out");
        (root, model, out)
    }

    #[test]
    fn missing_config_fails_before_registry_is_used() {
        let calls = Rc::new(Cell::new(0));
        let use_case = TrainUseCase::new("/nonexistent/oumi_train.yaml")
            .with_registry(Box::new(CountingRegistry { calls: calls.clone() }));

        let err = use_case.execute::<B>(Default::default()).unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().expect("io error in chain");
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn scenario_trains_and_writes_model_under_output_dir() {
        let (root, model, out) = scenario();
        let config = write_config(root.path(), &model, &out, 1, 10);

        let summary = TrainUseCase::new(&config).execute::<B>(Default::default()).unwrap();
        assert_eq!(summary.records, 4);
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.steps, 2);
        assert!(summary.final_loss.is_finite());
        assert_eq!(summary.output_dir, out);

        for file in [WEIGHTS_FILE, TOKENIZER_FILE, TOKENIZER_CONFIG_FILE, MODEL_CONFIG_FILE, TRAINING_ARGS_FILE] {
            assert!(out.join(file).is_file(), "missing {file}");
        }

        let saved = TokenizerStore::load(&out.join(TOKENIZER_FILE), None).unwrap();
        assert!(saved.tokenizer().get_padding().is_some());
    }

    #[test]
    fn checkpoints_rotate_to_the_newest_three() {
        let (root, model, out) = scenario();
        let config = write_config(root.path(), &model, &out, 2, 1);

        let summary = TrainUseCase::new(&config).execute::<B>(Default::default()).unwrap();
        assert_eq!(summary.steps, 4);
        assert!(!out.join("checkpoint-1").exists());
        for step in [2, 3, 4] {
            assert!(out.join(format!("checkpoint-{step}")).join(WEIGHTS_FILE).is_file());
        }
    }

    #[test]
    fn hub_model_starts_from_pretrained_weights() {
        let (root, model, out) = scenario();
        write_gpt2_safetensors(&model.join(SAFETENSORS_FILE), TINY_GPT2, "");
        let config = write_config(root.path(), Path::new("gpt2"), &out, 1, 10);

        let requested = Rc::new(RefCell::new(Vec::new()));
        let registry = MirrorRegistry { dir: model, requested: requested.clone() };
        let summary = TrainUseCase::new(&config)
            .with_registry(Box::new(registry))
            .execute::<B>(Default::default())
            .unwrap();

        assert_eq!(summary.steps, 2);
        assert!(requested.borrow().iter().any(|f| f == SAFETENSORS_FILE));
        assert!(!requested.borrow().iter().any(|f| f == WEIGHTS_FILE));
        assert!(out.join(WEIGHTS_FILE).is_file());
    }

    #[test]
    fn mismatched_pretrained_weights_fail_before_training() {
        let (root, model, out) = scenario();
        write_gpt2_safetensors(&model.join(SAFETENSORS_FILE), Gpt2Shape { d: 8, ..TINY_GPT2 }, "");
        let config = write_config(root.path(), &model, &out, 1, 10);

        let err = TrainUseCase::new(&config).execute::<B>(Default::default()).unwrap_err();
        assert!(format!("{err:#}").contains("wte.weight"), "{err:#}");
        assert!(!out.join(WEIGHTS_FILE).exists());
    }

    #[test]
    fn output_directory_can_be_trained_again() {
        let (root, model, out) = scenario();
        let first = write_config(root.path(), &model, &out, 1, 10);
        TrainUseCase::new(&first).execute::<B>(Default::default()).unwrap();

        let again = root.path().join("again");
        fs::create_dir(&again).unwrap();
        fs::copy(root.path().join("data.txt"), again.join("data.txt")).unwrap();
        let second = write_config(&again, &out, &root.path().join("out2"), 1, 10);

        let summary = TrainUseCase::new(&second).execute::<B>(Default::default()).unwrap();
        assert_eq!(summary.steps, 2);
        assert!(root.path().join("out2").join(WEIGHTS_FILE).is_file());
    }
}
