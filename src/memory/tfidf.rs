//! TF-IDF vectorization for question matching
//!
//! Tokens are lower-cased runs of at least two word characters. Weights use
//! raw counts with smoothed idf `ln((1 + n) / (1 + df)) + 1`, and every row is
//! L2-normalised, so a query sharing no token with a question scores exactly 0.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{AssistantError, Result};

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w\w+\b").expect("token pattern is valid")
});

/// Split text into lower-cased tokens of two or more word characters
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Vocabulary and idf weights learned from a corpus
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf weights from `documents`
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|d| tokenize(d.as_ref()))
            .collect();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&String> = tokens.iter().collect();
            seen.sort();
            seen.dedup();
            for token in seen {
                *document_frequency.entry(token.clone()).or_default() += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(AssistantError::VectorizationFailure(
                "empty vocabulary; documents contain no usable tokens".to_string(),
            ));
        }

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (token, df)) in document_frequency.into_iter().enumerate() {
            let weight = ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0;
            vocabulary.insert(token, index);
            idf.push(weight as f32);
        }

        Ok(Self { vocabulary, idf })
    }

    /// Number of distinct terms
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// L2-normalised tf-idf vector; unknown tokens are ignored
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }

        for (value, weight) in vector.iter_mut().zip(&self.idf) {
            *value *= weight;
        }

        let mag: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag > 0.0 {
            for value in vector.iter_mut() {
                *value /= mag;
            }
        }

        vector
    }
}

/// Cosine similarity of `query` against each of `questions`
///
/// The query is fitted together with the questions, as one extra document.
pub fn similarities<S: AsRef<str>>(query: &str, questions: &[S]) -> Result<Vec<f32>> {
    let mut corpus: Vec<&str> = questions.iter().map(|q| q.as_ref()).collect();
    corpus.push(query);

    let vectorizer = TfidfVectorizer::fit(&corpus)?;
    let query_vector = vectorizer.transform(query);

    Ok(questions
        .iter()
        .map(|q| cosine_similarity(&query_vector, &vectorizer.transform(q.as_ref())))
        .collect())
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}
