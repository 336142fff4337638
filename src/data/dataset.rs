use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// Minimum tokens needed to form one (input, next-token) pair.
pub const MIN_SAMPLE_TOKENS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub text: String,
}

impl TextRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Raw text records in file order.
#[derive(Debug, Clone, Default)]
pub struct TextDataset {
    records: Vec<TextRecord>,
}

impl TextDataset {
    pub fn new(records: Vec<TextRecord>) -> Self { Self { records } }

    pub fn records(&self) -> &[TextRecord] { &self.records }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// One record after tokenisation. The source text is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedRecord {
    pub input_ids: Vec<u32>,
}

/// Tokenised records plus the pad id collation has to use.
/// The pad id is always defined: it is either the tokenizer's own
/// pad token or the end-of-sequence token standing in for it.
#[derive(Debug, Clone)]
pub struct TokenizedDataset {
    records: Vec<TokenizedRecord>,
    pad_id:  u32,
}

impl TokenizedDataset {
    pub fn new(records: Vec<TokenizedRecord>, pad_id: u32) -> Self {
        Self { records, pad_id }
    }

    #[cfg(test)]
    pub fn records(&self) -> &[TokenizedRecord] { &self.records }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn len(&self) -> usize { self.records.len() }

    /// Drops records too short to contribute a next-token target.
    pub fn into_training_set(self) -> CausalLmDataset {
        let total = self.records.len();
        let samples: Vec<TokenizedRecord> = self
            .records
            .into_iter()
            .filter(|r| r.input_ids.len() >= MIN_SAMPLE_TOKENS)
            .collect();
        if samples.len() < total {
            tracing::debug!(
                "Dropped {} records shorter than {} tokens",
                total - samples.len(),
                MIN_SAMPLE_TOKENS
            );
        }
        CausalLmDataset { samples }
    }
}

/// burn view over the training samples.
pub struct CausalLmDataset {
    samples: Vec<TokenizedRecord>,
}

impl CausalLmDataset {
    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Token count of the longest sample, 0 when there are none.
    pub fn longest(&self) -> usize {
        self.samples.iter().map(|s| s.input_ids.len()).max().unwrap_or(0)
    }
}

impl Dataset<TokenizedRecord> for CausalLmDataset {
    fn get(&self, index: usize) -> Option<TokenizedRecord> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_set_skips_short_records() {
        let ds = TokenizedDataset::new(
            vec![
                TokenizedRecord { input_ids: vec![] },
                TokenizedRecord { input_ids: vec![7] },
                TokenizedRecord { input_ids: vec![7, 8] },
                TokenizedRecord { input_ids: vec![7, 8, 9] },
            ],
            0,
        );
        let train = ds.into_training_set();
        assert_eq!(train.sample_count(), 2);
        assert_eq!(train.get(0).unwrap().input_ids, vec![7, 8]);
        assert!(train.get(2).is_none());
        assert_eq!(train.longest(), 3);
    }

    #[test]
    fn empty_training_set_has_no_longest_sample() {
        let train = TokenizedDataset::new(vec![TokenizedRecord { input_ids: vec![1] }], 0)
            .into_training_set();
        assert_eq!(train.longest(), 0);
    }
}
