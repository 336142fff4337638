// ============================================================
// Layer 6 - Pretrained Weight Import
// ============================================================
// Copies a GPT-2 `model.safetensors` into a freshly built
// CausalLm. Tensor names follow the HuggingFace GPT-2 layout:
//
//   wte.weight / wpe.weight          token + position tables
//   h.N.ln_1 / h.N.ln_2 / ln_f       layer norms (weight, bias)
//   h.N.attn.c_attn                  fused q|k|v  [d, 3d]
//   h.N.attn.c_proj                  attention output
//   h.N.mlp.c_fc / h.N.mlp.c_proj    feed-forward
//
// GPT-2's Conv1D stores weights as [in, out], the same layout
// as burn's Linear, so matrices are copied as they are. The LM
// head starts as the transposed token table. Every tensor the
// model needs must be present with the expected shape.
//
// Reference: Burn Book §3 (Modules and Parameters)
//            safetensors format (huggingface/safetensors)

use anyhow::{anyhow, bail, ensure, Context, Result};
use burn::{
    module::Param,
    nn::Linear,
    prelude::*,
    tensor::{bf16, f16},
};
use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use std::{collections::HashMap, fs, path::Path};

use crate::ml::model::CausalLm;

pub const SAFETENSORS_FILE: &str = "model.safetensors";

/// Some exports nest every key under the base model name.
const KEY_PREFIX: &str = "transformer.";

struct RawTensor {
    shape:  Vec<usize>,
    values: Vec<f32>,
}

/// Every tensor of one safetensors file, widened to f32 and keyed by
/// its name with any `transformer.` prefix removed.
pub struct Gpt2Weights {
    tensors: HashMap<String, RawTensor>,
}

impl Gpt2Weights {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read weights '{}'", path.display()))?;
        let file = SafeTensors::deserialize(&bytes)
            .with_context(|| format!("Malformed safetensors file '{}'", path.display()))?;

        let mut tensors = HashMap::new();
        for (name, view) in file.tensors() {
            let values = widen(&name, &view)?;
            let key = name.strip_prefix(KEY_PREFIX).unwrap_or(name.as_str()).to_string();
            tensors.insert(key, RawTensor { shape: view.shape().to_vec(), values });
        }
        Ok(Self { tensors })
    }

    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    fn take(&mut self, name: &str) -> Result<RawTensor> {
        self.tensors
            .remove(name)
            .ok_or_else(|| anyhow!("Pretrained weights have no tensor '{name}'"))
    }

    fn matrix<B: Backend>(&mut self, name: &str, dims: [usize; 2], device: &B::Device) -> Result<Tensor<B, 2>> {
        let raw = self.take(name)?;
        ensure!(
            raw.shape == dims,
            "Tensor '{}' has shape {:?}, model expects {:?}", name, raw.shape, dims
        );
        Ok(Tensor::from_data(TensorData::new(raw.values, dims), device))
    }

    fn vector<B: Backend>(&mut self, name: &str, len: usize, device: &B::Device) -> Result<Tensor<B, 1>> {
        let raw = self.take(name)?;
        ensure!(
            raw.shape == [len],
            "Tensor '{}' has shape {:?}, model expects [{}]", name, raw.shape, len
        );
        Ok(Tensor::from_data(TensorData::new(raw.values, [len]), device))
    }

    fn linear<B: Backend>(
        &mut self,
        prefix: &str,
        dims:   [usize; 2],
        target: &mut Linear<B>,
        device: &B::Device,
    ) -> Result<()> {
        let weight = self.matrix(&format!("{prefix}.weight"), dims, device)?;
        let bias   = self.vector(&format!("{prefix}.bias"), dims[1], device)?;
        set_linear(target, weight, bias);
        Ok(())
    }

    fn norm<B: Backend>(
        &mut self,
        prefix: &str,
        d:      usize,
        gamma:  &mut Param<Tensor<B, 1>>,
        beta:   &mut Param<Tensor<B, 1>>,
        device: &B::Device,
    ) -> Result<()> {
        *gamma = Param::from_tensor(self.vector(&format!("{prefix}.weight"), d, device)?);
        *beta  = Param::from_tensor(self.vector(&format!("{prefix}.bias"), d, device)?);
        Ok(())
    }
}

fn widen(name: &str, view: &TensorView<'_>) -> Result<Vec<f32>> {
    let data = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F16 => data
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        Dtype::BF16 => data
            .chunks_exact(2)
            .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect(),
        other => bail!("Tensor '{name}' has unsupported dtype {other:?}"),
    };
    Ok(values)
}

fn set_linear<B: Backend>(linear: &mut Linear<B>, weight: Tensor<B, 2>, bias: Tensor<B, 1>) {
    linear.weight = Param::from_tensor(weight);
    linear.bias   = Some(Param::from_tensor(bias));
}

/// Replace every parameter of `model` with the GPT-2 tensors in `path`.
///
/// The token table in the file may have fewer rows than the model's
/// (a tokenizer with extra tokens); the remaining rows keep their
/// initial values.
pub fn load_gpt2_weights<B: Backend>(
    mut model: CausalLm<B>,
    path:      &Path,
    device:    &B::Device,
) -> Result<CausalLm<B>> {
    let mut weights = Gpt2Weights::read(path)?;
    let available = weights.tensor_count();

    let [vocab, d] = model.token_embedding.weight.val().dims();
    let positions  = model.max_positions();

    // ── Embeddings ───────────────────────────────────────────────────────────
    let wte = weights.take("wte.weight")?;
    ensure!(
        wte.shape.len() == 2 && wte.shape[1] == d && wte.shape[0] <= vocab,
        "Tensor 'wte.weight' has shape {:?}, model expects at most [{}, {}]", wte.shape, vocab, d
    );
    let file_vocab = wte.shape[0];
    let wte = Tensor::<B, 2>::from_data(TensorData::new(wte.values, [file_vocab, d]), device);
    // Detached so the result can become a fresh leaf parameter.
    let token_table = model
        .token_embedding
        .weight
        .val()
        .detach()
        .slice_assign([0..file_vocab, 0..d], wte);
    model.token_embedding.weight = Param::from_tensor(token_table.clone());
    model.lm_head.weight = Param::from_tensor(token_table.transpose());

    model.position_embedding.weight =
        Param::from_tensor(weights.matrix("wpe.weight", [positions, d], device)?);

    // ── Decoder blocks ───────────────────────────────────────────────────────
    for (i, block) in model.blocks.iter_mut().enumerate() {
        let h = format!("h.{i}");
        let d_ff = block.ffn_in.weight.val().dims()[1];

        weights.norm(&format!("{h}.ln_1"), d, &mut block.norm1.gamma, &mut block.norm1.beta, device)?;
        weights.norm(&format!("{h}.ln_2"), d, &mut block.norm2.gamma, &mut block.norm2.beta, device)?;

        let qkv      = weights.matrix(&format!("{h}.attn.c_attn.weight"), [d, 3 * d], device)?;
        let qkv_bias = weights.vector(&format!("{h}.attn.c_attn.bias"), 3 * d, device)?;
        let attn = &mut block.self_attn;
        for (part, target) in [&mut attn.query, &mut attn.key, &mut attn.value].into_iter().enumerate() {
            let cols = part * d..(part + 1) * d;
            set_linear(
                target,
                qkv.clone().slice([0..d, cols.clone()]),
                qkv_bias.clone().slice([cols]),
            );
        }
        weights.linear(&format!("{h}.attn.c_proj"), [d, d], &mut attn.output, device)?;

        weights.linear(&format!("{h}.mlp.c_fc"), [d, d_ff], &mut block.ffn_in, device)?;
        weights.linear(&format!("{h}.mlp.c_proj"), [d_ff, d], &mut block.ffn_out, device)?;
    }

    // ── Final norm ───────────────────────────────────────────────────────────
    weights.norm("ln_f", d, &mut model.final_norm.gamma, &mut model.final_norm.beta, device)?;

    tracing::info!(
        "Loaded pretrained weights from '{}' ({} of {} tensors used)",
        path.display(), available - weights.tensor_count(), available
    );
    Ok(model)
}
