// Fixtures shared by unit tests: a tiny word-level "pretrained model"
// directory laid out like a registry download.

use safetensors::{tensor::TensorView, Dtype};
use std::{collections::HashMap, fs, path::Path};

pub const EOS: &str = "<|endoftext|>";

pub const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog",
    "career", "compass", "job", "match",
];

/// Writes `tokenizer.json` and `config.json` (and optionally
/// `tokenizer_config.json`) into `dir`. The tokenizer has no padding
/// configured, like GPT-2's.
pub fn write_tiny_model(dir: &Path, with_tokenizer_config: bool) {
    fs::create_dir_all(dir).unwrap();

    let mut vocab = serde_json::Map::new();
    vocab.insert(EOS.to_string(), 0.into());
    vocab.insert("[UNK]".to_string(), 1.into());
    for (i, word) in WORDS.iter().enumerate() {
        vocab.insert(word.to_string(), (i + 2).into());
    }

    let tokenizer = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": EOS, "single_word": false, "lstrip": false,
             "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
    });
    fs::write(
        dir.join("tokenizer.json"),
        serde_json::to_string_pretty(&tokenizer).unwrap(),
    )
    .unwrap();

    let config = serde_json::json!({
        "model_type": "gpt2",
        "vocab_size": 16,
        "n_positions": 128,
        "n_embd": 16,
        "n_layer": 1,
        "n_head": 2,
        "n_inner": null,
        "resid_pdrop": 0.0
    });
    fs::write(dir.join("config.json"), config.to_string()).unwrap();

    if with_tokenizer_config {
        let tok_cfg = serde_json::json!({
            "eos_token": { "content": EOS, "special": true },
            "model_max_length": 1024
        });
        fs::write(dir.join("tokenizer_config.json"), tok_cfg.to_string()).unwrap();
    }
}

/// Dimensions of a GPT-2 weight file.
#[derive(Debug, Clone, Copy)]
pub struct Gpt2Shape {
    pub vocab:     usize,
    pub positions: usize,
    pub d:         usize,
    pub layers:    usize,
    pub d_ff:      usize,
}

/// Matches the `config.json` written by `write_tiny_model`.
pub const TINY_GPT2: Gpt2Shape = Gpt2Shape { vocab: 16, positions: 128, d: 16, layers: 1, d_ff: 64 };

/// Writes a GPT-2 style `model.safetensors` with every key prefixed by
/// `prefix`, and returns the f32 values of each tensor keyed by its
/// unprefixed name.
pub fn write_gpt2_safetensors(path: &Path, shape: Gpt2Shape, prefix: &str) -> HashMap<String, Vec<f32>> {
    let Gpt2Shape { vocab, positions, d, layers, d_ff } = shape;
    let mut specs: Vec<(String, Vec<usize>)> = vec![
        ("wte.weight".into(), vec![vocab, d]),
        ("wpe.weight".into(), vec![positions, d]),
        ("ln_f.weight".into(), vec![d]),
        ("ln_f.bias".into(), vec![d]),
    ];
    for i in 0..layers {
        for (name, dims) in [
            ("ln_1.weight", vec![d]),
            ("ln_1.bias", vec![d]),
            ("attn.c_attn.weight", vec![d, 3 * d]),
            ("attn.c_attn.bias", vec![3 * d]),
            ("attn.c_proj.weight", vec![d, d]),
            ("attn.c_proj.bias", vec![d]),
            ("ln_2.weight", vec![d]),
            ("ln_2.bias", vec![d]),
            ("mlp.c_fc.weight", vec![d, d_ff]),
            ("mlp.c_fc.bias", vec![d_ff]),
            ("mlp.c_proj.weight", vec![d_ff, d]),
            ("mlp.c_proj.bias", vec![d]),
            // causal mask buffer, not a parameter
            ("attn.bias", vec![1, 1, positions, positions]),
        ] {
            specs.push((format!("h.{i}.{name}"), dims));
        }
    }

    let mut values = HashMap::new();
    let mut raw = Vec::new();
    for (n, (name, dims)) in specs.iter().enumerate() {
        let count: usize = dims.iter().product();
        let data: Vec<f32> = (0..count)
            .map(|i| ((n * 131 + i) as f32 * 0.37).sin() * 0.05)
            .collect();
        raw.push(data.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>());
        values.insert(name.clone(), data);
    }

    let views: Vec<(String, TensorView)> = specs
        .iter()
        .zip(&raw)
        .map(|((name, dims), bytes)| {
            (format!("{prefix}{name}"), TensorView::new(Dtype::F32, dims.clone(), bytes).unwrap())
        })
        .collect();
    fs::write(path, safetensors::serialize(views, &None).unwrap()).unwrap();
    values
}
