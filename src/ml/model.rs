use anyhow::{Context, Result};
use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

// ─── Registry architecture description ───────────────────────────────────────
// The `config.json` a pretrained model ships with. GPT-2 key names are the
// canonical spelling; the Llama/BERT style names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchitectureConfig {
    pub vocab_size:  usize,
    #[serde(alias = "max_position_embeddings")]
    pub n_positions: usize,
    #[serde(alias = "hidden_size")]
    pub n_embd:      usize,
    #[serde(alias = "num_hidden_layers")]
    pub n_layer:     usize,
    #[serde(alias = "num_attention_heads")]
    pub n_head:      usize,
    #[serde(default, alias = "intermediate_size")]
    pub n_inner:     Option<usize>,
    #[serde(default = "default_dropout")]
    pub resid_pdrop: f64,
}

fn default_dropout() -> f64 { 0.1 }

impl ArchitectureConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model config '{}'", path.display()))
    }

    /// Model hyperparameters for a tokenizer with `tokenizer_vocab` entries.
    /// The embedding table is never smaller than the tokenizer.
    pub fn to_model_config(&self, tokenizer_vocab: usize) -> CausalLmConfig {
        CausalLmConfig::new(
            self.vocab_size.max(tokenizer_vocab),
            self.n_positions,
            self.n_embd,
            self.n_head,
            self.n_layer,
            self.n_inner.unwrap_or(4 * self.n_embd),
        )
        .with_dropout(self.resid_pdrop)
    }
}

// ─── Model hyperparameters ───────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CausalLmConfig {
    pub vocab_size:    usize,
    pub max_positions: usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    #[config(default = 0.1)]
    pub dropout:       f64,
}

impl CausalLmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CausalLm<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_positions, self.d_model).init(device);
        let blocks: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let lm_head    = LinearConfig::new(self.d_model, self.vocab_size)
            .with_bias(false)
            .init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        CausalLm {
            token_embedding, position_embedding, blocks,
            final_norm, lm_head, dropout,
            max_positions: self.max_positions,
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_in  = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_out = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DecoderBlock { norm1, self_attn, norm2, ffn_in, ffn_out, dropout }
    }
}

// ─── Decoder block (pre-norm, GPT style) ─────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub norm1:     LayerNorm<B>,
    pub self_attn: MultiHeadAttention<B>,
    pub norm2:     LayerNorm<B>,
    pub ffn_in:    Linear<B>,
    pub ffn_out:   Linear<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let attn_in  = self.norm1.forward(x.clone());
        let attn_out = self
            .self_attn
            .forward(MhaInput::self_attn(attn_in).mask_attn(mask))
            .context;
        let x = x + self.dropout.forward(attn_out);

        let ffn_out = self.ffn_out.forward(
            burn::tensor::activation::gelu(self.ffn_in.forward(self.norm2.forward(x.clone())))
        );
        x + self.dropout.forward(ffn_out)
    }
}

// ─── Causal language model ───────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct CausalLm<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub blocks:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub max_positions:      usize,
}

impl<B: Backend> CausalLm<B> {
    /// Longest input sequence the position table covers.
    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    /// input_ids: [batch, seq_len] -> logits: [batch, seq_len, vocab]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .reshape([1, seq_len])
            .repeat_dim(0, batch_size);
        let pos_emb = self.position_embedding.forward(positions);

        // Position i may only attend to positions <= i.
        let mask = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for block in &self.blocks {
            x = block.forward(x, mask.clone());
        }
        self.lm_head.forward(self.final_norm.forward(x))
    }

    /// Mean next-token cross entropy; targets equal to `pad_id` are ignored.
    pub fn forward_loss(
        &self,
        inputs:  Tensor<B, 2, Int>,
        targets: Tensor<B, 2, Int>,
        pad_id:  u32,
    ) -> Tensor<B, 1> {
        let [batch_size, seq_len] = inputs.dims();
        let logits = self.forward(inputs);
        let [_, _, vocab] = logits.dims();

        let ce = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![pad_id as usize]))
            .init(&logits.device());
        ce.forward(
            logits.reshape([batch_size * seq_len, vocab]),
            targets.reshape([batch_size * seq_len]),
        )
    }
}
