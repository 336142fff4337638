// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Loads a pretrained tokenizer, makes sure it has a pad token,
// and writes it back out next to the trained model.
//
// Pad token resolution, first match wins:
//   1. padding already configured in tokenizer.json
//   2. `pad_token` in tokenizer_config.json, if it is in the vocab
//   3. the end-of-sequence token, aliased as pad
//
// Step 3 is what GPT-2 style tokenizers need: they ship an eos
// token but no pad token, and collation cannot pad without one.
// The eos token comes from tokenizer_config.json when present,
// otherwise from a short list of well known spellings.
//
// Reference: tokenizers crate documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};

const KNOWN_EOS_TOKENS: &[&str] = &["<|endoftext|>", "</s>", "<eos>", "<|end_of_text|>", "[SEP]"];

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// A token written either as a bare string or as an added-token object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TokenSpec {
    Plain(String),
    Added { content: String },
}

impl TokenSpec {
    fn content(&self) -> &str {
        match self {
            TokenSpec::Plain(s) => s,
            TokenSpec::Added { content } => content,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenizerConfigFile {
    #[serde(default)]
    pad_token: Option<TokenSpec>,
    #[serde(default)]
    eos_token: Option<TokenSpec>,
}

#[derive(Debug, Serialize)]
struct SavedTokenizerConfig<'a> {
    pad_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    eos_token: Option<&'a str>,
}

/// A tokenizer whose pad token is guaranteed to exist.
#[derive(Clone)]
pub struct PreparedTokenizer {
    tokenizer: Tokenizer,
    pad_token: String,
    pad_id:    u32,
    eos_token: Option<String>,
}

impl PreparedTokenizer {
    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn pad_token(&self) -> &str { &self.pad_token }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn eos_token(&self) -> Option<&str> { self.eos_token.as_deref() }

    pub fn vocab_size(&self) -> usize { self.tokenizer.get_vocab_size(true) }
}

pub struct TokenizerStore;

impl TokenizerStore {
    /// Load `tokenizer.json` (plus the optional `tokenizer_config.json`)
    /// and resolve the pad token.
    pub fn load(tokenizer_path: &Path, config_path: Option<&Path>) -> Result<PreparedTokenizer> {
        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", tokenizer_path.display(), e)
        })?;

        let file_cfg = match config_path {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read '{}'", path.display()))?;
                serde_json::from_str::<TokenizerConfigFile>(&json)
                    .with_context(|| format!("Malformed '{}'", path.display()))?
            }
            None => TokenizerConfigFile::default(),
        };

        let eos_token = resolve_eos(&tokenizer, &file_cfg);

        let named_pad = file_cfg.pad_token.as_ref().map(TokenSpec::content);
        let named_pad_id = named_pad.and_then(|t| tokenizer.token_to_id(t));
        if let (Some(name), None) = (named_pad, named_pad_id) {
            tracing::warn!(
                "pad_token '{}' from tokenizer_config.json is not in the vocabulary; ignoring it",
                name
            );
        }

        let (pad_token, pad_id) = if let Some(padding) = tokenizer.get_padding() {
            (padding.pad_token.clone(), padding.pad_id)
        } else if let (Some(name), Some(id)) = (named_pad, named_pad_id) {
            (name.to_string(), id)
        } else {
            let eos = eos_token.as_deref().context(
                "Tokenizer defines neither a pad token nor an end-of-sequence token",
            )?;
            let id = tokenizer
                .token_to_id(eos)
                .with_context(|| format!("End-of-sequence token '{eos}' is not in the vocabulary"))?;
            tracing::info!("Tokenizer has no pad token; using eos token '{}' (id {})", eos, id);
            (eos.to_string(), id)
        };

        // BatchLongest leaves single encodings untouched; it only records
        // the pad token so it is saved with the tokenizer.
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token: pad_token.clone(),
            ..Default::default()
        }));

        Ok(PreparedTokenizer { tokenizer, pad_token, pad_id, eos_token })
    }

    /// Write `tokenizer.json` and `tokenizer_config.json` into `dir`.
    pub fn save(prepared: &PreparedTokenizer, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let tok_path = dir.join(TOKENIZER_FILE);
        prepared
            .tokenizer
            .save(&tok_path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write '{}': {}", tok_path.display(), e))?;

        let cfg = SavedTokenizerConfig {
            pad_token: &prepared.pad_token,
            eos_token: prepared.eos_token.as_deref(),
        };
        let cfg_path = dir.join(TOKENIZER_CONFIG_FILE);
        fs::write(&cfg_path, serde_json::to_string_pretty(&cfg)?)
            .with_context(|| format!("Cannot write '{}'", cfg_path.display()))?;

        tracing::debug!("Saved tokenizer to '{}'", dir.display());
        Ok(())
    }
}

fn resolve_eos(tokenizer: &Tokenizer, cfg: &TokenizerConfigFile) -> Option<String> {
    if let Some(eos) = &cfg.eos_token {
        return Some(eos.content().to_string());
    }
    KNOWN_EOS_TOKENS
        .iter()
        .find(|t| tokenizer.token_to_id(t).is_some())
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_tiny_model, EOS};

    #[test]
    fn missing_pad_token_is_aliased_to_eos() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), true);

        let prepared = TokenizerStore::load(
            &dir.path().join(TOKENIZER_FILE),
            Some(&dir.path().join(TOKENIZER_CONFIG_FILE)),
        )
        .unwrap();

        assert_eq!(prepared.pad_token(), EOS);
        assert_eq!(prepared.pad_id(), 0);
        assert_eq!(prepared.eos_token(), Some(EOS));
        assert_eq!(prepared.tokenizer().get_padding().unwrap().pad_id, 0);
    }

    #[test]
    fn eos_is_found_without_tokenizer_config() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), false);

        let prepared = TokenizerStore::load(&dir.path().join(TOKENIZER_FILE), None).unwrap();
        assert_eq!(prepared.pad_token(), EOS);
    }

    #[test]
    fn explicit_pad_token_wins_over_eos() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), false);
        fs::write(
            dir.path().join(TOKENIZER_CONFIG_FILE),
            r#"{"pad_token": "[UNK]", "eos_token": "<|endoftext|>"}"#,
        )
        .unwrap();

        let prepared = TokenizerStore::load(
            &dir.path().join(TOKENIZER_FILE),
            Some(&dir.path().join(TOKENIZER_CONFIG_FILE)),
        )
        .unwrap();
        assert_eq!(prepared.pad_token(), "[UNK]");
        assert_eq!(prepared.pad_id(), 1);
    }

    #[test]
    fn unknown_pad_token_falls_back_to_eos() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), false);
        fs::write(
            dir.path().join(TOKENIZER_CONFIG_FILE),
            r#"{"pad_token": "<pad>", "eos_token": "<|endoftext|>"}"#,
        )
        .unwrap();

        let prepared = TokenizerStore::load(
            &dir.path().join(TOKENIZER_FILE),
            Some(&dir.path().join(TOKENIZER_CONFIG_FILE)),
        )
        .unwrap();
        assert_eq!(prepared.pad_token(), EOS);
        assert_eq!(prepared.pad_id(), 0);
    }

    #[test]
    fn saved_tokenizer_keeps_its_pad_token() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_tiny_model(src.path(), true);

        let prepared = TokenizerStore::load(&src.path().join(TOKENIZER_FILE), None).unwrap();
        TokenizerStore::save(&prepared, out.path()).unwrap();

        let reloaded = TokenizerStore::load(
            &out.path().join(TOKENIZER_FILE),
            Some(&out.path().join(TOKENIZER_CONFIG_FILE)),
        )
        .unwrap();
        assert_eq!(reloaded.pad_id(), prepared.pad_id());
        assert!(reloaded.tokenizer().get_padding().is_some());
    }
}
