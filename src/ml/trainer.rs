// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Causal LM training with Burn's DataLoader and a stock optimizer.
//
// Per optimizer step:
//   lr    = learning_rate * (total - step) / total   (linear decay)
//   loss  = next-token cross entropy, pad targets ignored
//   grads clipped to a global L2 norm of MAX_GRAD_NORM
//   every LOGGING_STEPS -> tracing + trainer_log.csv
//   every save_steps    -> checkpoint-<step>/ (newest 3 kept)
//
// Training runs to completion on the calling thread. Data-loader
// workers are only spawned when dataloader_num_workers > 0.
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::{bail, ensure, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    optim::{AdamConfig, AdamWConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    batcher::{CausalLmBatch, CausalLmBatcher},
    dataset::CausalLmDataset,
};
use crate::domain::config::TrainingSection;
use crate::infra::{
    checkpoint::{CheckpointManager, TrainerState},
    metrics::{MetricsLogger, StepMetrics},
};
use crate::ml::model::CausalLm;

pub const LOGGING_STEPS: usize = 1;
pub const SAVE_TOTAL_LIMIT: usize = 3;
pub const SHUFFLE_SEED: u64 = 42;
pub const MAX_GRAD_NORM: f32 = 1.0;
pub const ADAM_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    AdamW,
    Adam,
    Sgd,
}

impl OptimizerKind {
    /// `None` selects AdamW.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        let name = name.map(str::to_ascii_lowercase);
        match name.as_deref() {
            None | Some("adamw") | Some("adamw_torch") | Some("adamw_hf") => Ok(Self::AdamW),
            Some("adam") => Ok(Self::Adam),
            Some("sgd") => Ok(Self::Sgd),
            Some(other) => bail!("Unsupported optimizer '{other}' (expected adamw, adam or sgd)"),
        }
    }
}

/// Everything the training loop needs, resolved from the YAML config
/// plus the fixed logging and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingArguments {
    pub output_dir:                  PathBuf,
    pub num_train_epochs:            usize,
    pub per_device_train_batch_size: usize,
    pub learning_rate:               f64,
    pub save_steps:                  usize,
    pub dataloader_num_workers:      usize,
    pub optimizer:                   OptimizerKind,
    pub logging_steps:               usize,
    pub save_total_limit:            usize,
    pub seed:                        u64,
    pub max_grad_norm:               f32,
    pub adam_epsilon:                f32,
}

impl TrainingArguments {
    pub fn from_config(section: &TrainingSection) -> Result<Self> {
        ensure!(
            section.per_device_train_batch_size > 0,
            "training.per_device_train_batch_size must be at least 1"
        );
        Ok(Self {
            output_dir:                  PathBuf::from(&section.output_dir),
            num_train_epochs:            section.num_train_epochs,
            per_device_train_batch_size: section.per_device_train_batch_size,
            learning_rate:               section.learning_rate,
            save_steps:                  section.save_steps,
            dataloader_num_workers:      section.dataloader_num_workers,
            optimizer:                   OptimizerKind::parse(section.optimizer.as_deref())?,
            logging_steps:               LOGGING_STEPS,
            save_total_limit:            SAVE_TOTAL_LIMIT,
            seed:                        SHUFFLE_SEED,
            max_grad_norm:               MAX_GRAD_NORM,
            adam_epsilon:                ADAM_EPSILON,
        })
    }

    fn clipping(&self) -> Option<GradientClippingConfig> {
        (self.max_grad_norm > 0.0).then_some(GradientClippingConfig::Norm(self.max_grad_norm))
    }

    pub fn adamw(&self) -> AdamWConfig {
        AdamWConfig::new()
            .with_weight_decay(0.0)
            .with_epsilon(self.adam_epsilon)
            .with_grad_clipping(self.clipping())
    }

    pub fn adam(&self) -> AdamConfig {
        AdamConfig::new()
            .with_epsilon(self.adam_epsilon)
            .with_grad_clipping(self.clipping())
    }

    pub fn sgd(&self) -> SgdConfig {
        SgdConfig::new().with_gradient_clipping(self.clipping())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub global_step: usize,
    pub final_loss:  f64,
}

pub fn linear_decay(base_lr: f64, step: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return base_lr;
    }
    base_lr * total_steps.saturating_sub(step) as f64 / total_steps as f64
}

pub struct Trainer<B: AutodiffBackend> {
    model:       CausalLm<B>,
    args:        TrainingArguments,
    pad_id:      u32,
    device:      B::Device,
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        model:  CausalLm<B>,
        args:   TrainingArguments,
        pad_id: u32,
        device: B::Device,
    ) -> Result<Self> {
        let checkpoints = CheckpointManager::new(&args.output_dir, args.save_total_limit)?;
        let metrics     = MetricsLogger::new(&args.output_dir)?;
        Ok(Self { model, args, pad_id, device, checkpoints, metrics })
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Run every epoch to completion.
    pub fn train(&mut self, dataset: CausalLmDataset) -> Result<TrainOutcome> {
        let samples = dataset.sample_count();
        ensure!(samples > 0, "No training samples: every record tokenised to fewer than 2 tokens");
        // Inputs drop the last token of each sample.
        let longest_input = dataset.longest().saturating_sub(1);
        ensure!(
            longest_input <= self.model.max_positions(),
            "A sample needs {} positions but the model supports {}",
            longest_input, self.model.max_positions()
        );

        let batch_size  = self.args.per_device_train_batch_size;
        let total_steps = samples.div_ceil(batch_size) * self.args.num_train_epochs;
        tracing::info!(
            "Training on {} samples: {} epochs x batch {} = {} steps, optimizer {:?}",
            samples, self.args.num_train_epochs, batch_size, total_steps, self.args.optimizer
        );

        let batcher = CausalLmBatcher::<B>::new(self.device.clone(), self.pad_id);
        let mut builder = DataLoaderBuilder::new(batcher)
            .batch_size(batch_size)
            .shuffle(self.args.seed);
        if self.args.dataloader_num_workers > 0 {
            builder = builder.num_workers(self.args.dataloader_num_workers);
        }
        let loader = builder.build(dataset);

        match self.args.optimizer {
            OptimizerKind::AdamW => {
                let optim = self.args.adamw().init::<B, CausalLm<B>>();
                self.fit(loader.as_ref(), optim, total_steps)
            }
            OptimizerKind::Adam => {
                let optim = self.args.adam().init::<B, CausalLm<B>>();
                self.fit(loader.as_ref(), optim, total_steps)
            }
            OptimizerKind::Sgd => {
                let optim = self.args.sgd().init::<B, CausalLm<B>>();
                self.fit(loader.as_ref(), optim, total_steps)
            }
        }
    }

    /// Write the trained weights to `{output_dir}/model.mpk`.
    pub fn save_model(&self) -> Result<PathBuf> {
        self.checkpoints.save_model(&self.model)
    }

    fn fit<O: Optimizer<CausalLm<B>, B>>(
        &mut self,
        loader:      &dyn DataLoader<CausalLmBatch<B>>,
        mut optim:   O,
        total_steps: usize,
    ) -> Result<TrainOutcome> {
        let epochs = self.args.num_train_epochs;
        let mut model = self.model.clone();
        let mut global_step = 0usize;
        let mut last_loss = f64::NAN;

        for epoch in 1..=epochs {
            let mut epoch_loss_sum = 0.0f64;
            let mut epoch_batches  = 0usize;

            for batch in loader.iter() {
                let lr = linear_decay(self.args.learning_rate, global_step, total_steps);

                let loss = model.forward_loss(batch.inputs, batch.targets, self.pad_id);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(lr, model, grads);

                global_step    += 1;
                epoch_batches  += 1;
                epoch_loss_sum += loss_val;
                last_loss       = loss_val;

                if global_step % self.args.logging_steps == 0 {
                    tracing::info!(
                        "step {}/{} | epoch {} | loss={:.4} | lr={:.3e}",
                        global_step, total_steps, epoch, loss_val, lr
                    );
                    self.metrics.log(&StepMetrics {
                        step: global_step,
                        epoch,
                        loss: loss_val,
                        learning_rate: lr,
                    })?;
                }

                if self.args.save_steps > 0 && global_step % self.args.save_steps == 0 {
                    self.checkpoints.save_checkpoint(
                        &model,
                        &TrainerState { global_step, epoch, loss: loss_val },
                    )?;
                }
            }

            let avg = if epoch_batches > 0 { epoch_loss_sum / epoch_batches as f64 } else { f64::NAN };
            println!("Epoch {:>3}/{} | train_loss={:.4} | steps={}", epoch, epochs, avg, global_step);
        }

        self.model = model;
        tracing::info!(
            "Training finished after {} steps; loss log in '{}'",
            global_step, self.metrics.csv_path().display()
        );
        Ok(TrainOutcome { global_step, final_loss: last_loss })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{TokenizedDataset, TokenizedRecord};
    use crate::ml::model::CausalLmConfig;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    fn section() -> TrainingSection {
        TrainingSection {
            output_dir:                  "out".into(),
            num_train_epochs:            2,
            per_device_train_batch_size: 2,
            learning_rate:               1e-3,
            save_steps:                  1,
            dataloader_num_workers:      0,
            optimizer:                   None,
        }
    }

    fn dataset() -> CausalLmDataset {
        let rows: [&[u32]; 4] = [&[2, 3, 4, 5], &[6, 7, 2, 8, 9], &[10, 11, 12, 13], &[2, 9, 6]];
        TokenizedDataset::new(
            rows.iter().map(|r| TokenizedRecord { input_ids: r.to_vec() }).collect(),
            0,
        )
        .into_training_set()
    }

    #[test]
    fn optimizer_names() {
        assert_eq!(OptimizerKind::parse(None).unwrap(), OptimizerKind::AdamW);
        assert_eq!(OptimizerKind::parse(Some("adamw_torch")).unwrap(), OptimizerKind::AdamW);
        assert_eq!(OptimizerKind::parse(Some("SGD")).unwrap(), OptimizerKind::Sgd);
        assert!(OptimizerKind::parse(Some("lion")).is_err());
    }

    #[test]
    fn learning_rate_decays_linearly_to_zero() {
        assert_eq!(linear_decay(1.0, 0, 4), 1.0);
        assert_eq!(linear_decay(1.0, 2, 4), 0.5);
        assert_eq!(linear_decay(1.0, 4, 4), 0.0);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut s = section();
        s.per_device_train_batch_size = 0;
        assert!(TrainingArguments::from_config(&s).is_err());
    }

    #[test]
    fn optimizers_clip_gradients_and_use_small_epsilon() {
        let args = TrainingArguments::from_config(&section()).unwrap();
        assert_eq!(args.max_grad_norm, 1.0);

        for config in [
            serde_json::to_value(args.adamw()).unwrap(),
            serde_json::to_value(args.adam()).unwrap(),
        ] {
            assert_eq!(config["grad_clipping"], serde_json::json!({ "Norm": 1.0 }));
            let eps = config["epsilon"].as_f64().unwrap();
            assert!((eps - 1e-8).abs() < 1e-12, "{eps}");
        }
        let sgd = serde_json::to_value(args.sgd()).unwrap();
        assert_eq!(sgd["gradient_clipping"], serde_json::json!({ "Norm": 1.0 }));
    }

    #[test]
    fn zero_grad_norm_disables_clipping() {
        let mut args = TrainingArguments::from_config(&section()).unwrap();
        args.max_grad_norm = 0.0;
        let config = serde_json::to_value(args.adamw()).unwrap();
        assert!(config["grad_clipping"].is_null());
    }

    #[test]
    fn samples_longer_than_the_model_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = TrainingArguments::from_config(&section()).unwrap();
        args.output_dir = dir.path().to_path_buf();

        let device = Default::default();
        // Four positions; the five-token sample needs exactly four.
        let fits: CausalLm<B> = CausalLmConfig::new(16, 4, 8, 2, 1, 16).init(&device);
        assert!(Trainer::new(fits, args.clone(), 0, device).unwrap().train(dataset()).is_ok());

        let short: CausalLm<B> = CausalLmConfig::new(16, 3, 8, 2, 1, 16).init(&device);
        let err = Trainer::new(short, args, 0, device).unwrap().train(dataset()).unwrap_err();
        assert!(err.to_string().contains("supports 3"), "{err}");
    }

    #[test]
    fn trains_logs_and_checkpoints_every_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = TrainingArguments::from_config(&section()).unwrap();
        args.output_dir = dir.path().to_path_buf();

        let device = Default::default();
        let model: CausalLm<B> = CausalLmConfig::new(16, 16, 8, 2, 1, 16).init(&device);
        let mut trainer = Trainer::new(model, args, 0, device).unwrap();

        let outcome = trainer.train(dataset()).unwrap();
        assert_eq!(outcome.global_step, 4);
        assert!(outcome.final_loss.is_finite());

        let steps: Vec<usize> =
            trainer.checkpoints().checkpoints().unwrap().into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![2, 3, 4]);

        let log = std::fs::read_to_string(dir.path().join("trainer_log.csv")).unwrap();
        assert_eq!(log.lines().count(), 5);

        assert!(trainer.save_model().unwrap().is_file());
    }
}
