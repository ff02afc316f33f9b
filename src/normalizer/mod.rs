//! Canonical-dictionary + embedding entity normalization.
//!
//! Grounded in the original pipeline's `embedding_normalizer.py`: a curated
//! alias dictionary per entity class (theory, method, software, phenomenon)
//! gives fast, free matches; an optional embedding nearest-neighbor pass
//! (cosine similarity, default threshold 0.85) catches paraphrases the
//! dictionary misses; and anything left over is kept as a new canonical
//! entity at moderate confidence rather than dropped.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

mod dictionaries;

/// Kind of entity being normalized; each has its own canonical dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Theory,
    Method,
    Software,
    Phenomenon,
}

/// How a normalization result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Exact,
    Dictionary,
    Embedding,
    New,
}

/// Outcome of normalizing one entity mention.
#[derive(Debug, Clone)]
pub struct NormalizationResult {
    pub original: String,
    pub normalized: String,
    pub similarity: f64,
    pub method: MatchMethod,
    pub confidence: f64,
    /// Up to 3 runner-up canonical names from the embedding pass, for
    /// diagnostics / manual review.
    pub alternatives: Vec<(String, f64)>,
}

/// Running normalization statistics, reset when the process restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizerStats {
    pub exact_matches: u64,
    pub dictionary_matches: u64,
    pub embedding_matches: u64,
    pub new_entities: u64,
    pub total: u64,
}

impl NormalizerStats {
    pub fn exact_match_rate(&self) -> f64 {
        rate(self.exact_matches, self.total)
    }
    pub fn dictionary_match_rate(&self) -> f64 {
        rate(self.dictionary_matches, self.total)
    }
    pub fn embedding_match_rate(&self) -> f64 {
        rate(self.embedding_matches, self.total)
    }
    pub fn new_entity_rate(&self) -> f64 {
        rate(self.new_entities, self.total)
    }
}

fn rate(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Lowercased alias -> canonical display name, for one entity kind.
type LookupTable = HashMap<String, String>;

fn lookup_table(kind: EntityKind) -> &'static LookupTable {
    static THEORY: OnceLock<LookupTable> = OnceLock::new();
    static METHOD: OnceLock<LookupTable> = OnceLock::new();
    static SOFTWARE: OnceLock<LookupTable> = OnceLock::new();
    static PHENOMENON: OnceLock<LookupTable> = OnceLock::new();

    match kind {
        EntityKind::Theory => THEORY.get_or_init(|| build_table(dictionaries::THEORY_DICTIONARY)),
        EntityKind::Method => METHOD.get_or_init(|| build_table(dictionaries::METHOD_DICTIONARY)),
        EntityKind::Software => {
            SOFTWARE.get_or_init(|| build_software_table(dictionaries::SOFTWARE_DICTIONARY))
        }
        EntityKind::Phenomenon => {
            PHENOMENON.get_or_init(|| build_table(dictionaries::PHENOMENON_DICTIONARY))
        }
    }
}

fn title_case(canonical: &str) -> String {
    canonical
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_table(dictionary: &[(&str, &[&str])]) -> LookupTable {
    let mut table = HashMap::new();
    for (canonical, aliases) in dictionary {
        let display = title_case(canonical);
        table.insert(canonical.to_lowercase(), display.clone());
        for alias in *aliases {
            table.insert(alias.to_lowercase(), display.clone());
        }
    }
    table
}

fn build_software_table(dictionary: &[(&str, &[&str])]) -> LookupTable {
    let mut table = HashMap::new();
    for (canonical, aliases) in dictionary {
        let display = if canonical.len() > 2 {
            title_case(canonical)
        } else {
            canonical.to_uppercase()
        };
        table.insert(canonical.to_lowercase(), display.clone());
        for alias in *aliases {
            table.insert(alias.to_lowercase(), display.clone());
        }
    }
    table
}

/// Normalizes entity mentions extracted from paper text to a canonical form.
pub struct EntityNormalizer {
    similarity_threshold: f64,
    embeddings_enabled: bool,
    stats: Mutex<NormalizerStats>,
}

impl EntityNormalizer {
    pub fn new(similarity_threshold: f64, embeddings_enabled: bool) -> Self {
        Self {
            similarity_threshold,
            embeddings_enabled,
            stats: Mutex::new(NormalizerStats::default()),
        }
    }

    /// Normalize `entity_name` of kind `kind`. When `embeddings_enabled` and
    /// both `embedding` and `canonical_embeddings` are supplied, falls back
    /// to cosine-similarity nearest neighbor over `canonical_embeddings`
    /// (canonical display name -> embedding vector) after the dictionary
    /// passes miss.
    pub fn normalize(
        &self,
        entity_name: &str,
        kind: EntityKind,
        embedding: Option<&[f32]>,
        canonical_embeddings: Option<&HashMap<String, Vec<f32>>>,
    ) -> NormalizationResult {
        self.stats.lock().unwrap().total += 1;

        if entity_name.trim().is_empty() {
            return NormalizationResult {
                original: entity_name.to_string(),
                normalized: String::new(),
                similarity: 0.0,
                method: MatchMethod::New,
                confidence: 0.0,
                alternatives: Vec::new(),
            };
        }

        let cleaned = Self::clean_text(entity_name);
        let cleaned_lower = cleaned.to_lowercase();
        let table = lookup_table(kind);

        if let Some(canonical) = table.get(&cleaned_lower) {
            self.stats.lock().unwrap().exact_matches += 1;
            return NormalizationResult {
                original: entity_name.to_string(),
                normalized: canonical.clone(),
                similarity: 1.0,
                method: MatchMethod::Exact,
                confidence: 1.0,
                alternatives: Vec::new(),
            };
        }

        for (key, canonical) in table.iter() {
            let starts = cleaned_lower.starts_with(&format!("{key} "));
            let ends = cleaned_lower.ends_with(&format!(" {key}"));
            if starts || ends {
                self.stats.lock().unwrap().dictionary_matches += 1;
                return NormalizationResult {
                    original: entity_name.to_string(),
                    normalized: canonical.clone(),
                    similarity: 0.95,
                    method: MatchMethod::Dictionary,
                    confidence: 0.95,
                    alternatives: Vec::new(),
                };
            }
            if key.len() > 5 && cleaned_lower.contains(key.as_str()) {
                self.stats.lock().unwrap().dictionary_matches += 1;
                return NormalizationResult {
                    original: entity_name.to_string(),
                    normalized: canonical.clone(),
                    similarity: 0.9,
                    method: MatchMethod::Dictionary,
                    confidence: 0.9,
                    alternatives: Vec::new(),
                };
            }
        }

        if self.embeddings_enabled
            && let (Some(query), Some(canon_embeddings)) = (embedding, canonical_embeddings)
        {
            let mut scored: Vec<(String, f64)> = canon_embeddings
                .iter()
                .map(|(name, vec)| (name.clone(), cosine_similarity(query, vec)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            if let Some((best_name, best_sim)) = scored.first().cloned()
                && best_sim >= self.similarity_threshold
            {
                self.stats.lock().unwrap().embedding_matches += 1;
                return NormalizationResult {
                    original: entity_name.to_string(),
                    normalized: best_name,
                    similarity: best_sim,
                    method: MatchMethod::Embedding,
                    confidence: best_sim,
                    alternatives: scored.into_iter().skip(1).take(3).collect(),
                };
            }
        }

        self.stats.lock().unwrap().new_entities += 1;
        NormalizationResult {
            original: entity_name.to_string(),
            normalized: cleaned,
            similarity: 0.0,
            method: MatchMethod::New,
            confidence: 0.5,
            alternatives: Vec::new(),
        }
    }

    pub fn stats(&self) -> NormalizerStats {
        *self.stats.lock().unwrap()
    }

    /// Clean and title-case an entity mention, preserving short all-caps
    /// acronyms (<=5 chars).
    fn clean_text(text: &str) -> String {
        let collapsed = text
            .trim()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('\u{2013}', "-")
            .replace('\u{2014}', "-")
            .replace('\u{201c}', "\"")
            .replace('\u{201d}', "\"")
            .replace('\u{2018}', "'")
            .replace('\u{2019}', "'");

        collapsed
            .split(' ')
            .map(|word| {
                if word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) && word.len() <= 5
                {
                    word.to_string()
                } else {
                    title_case(word)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_dictionary_match() {
        let normalizer = EntityNormalizer::new(0.85, false);
        let result = normalizer.normalize("RBV", EntityKind::Theory, None, None);
        assert_eq!(result.method, MatchMethod::Exact);
        assert_eq!(result.normalized, "Resource-Based View");
    }

    #[test]
    fn dictionary_substring_match() {
        let normalizer = EntityNormalizer::new(0.85, false);
        let result = normalizer.normalize(
            "Resource-Based View (RBV) Theory",
            EntityKind::Theory,
            None,
            None,
        );
        assert_eq!(result.normalized, "Resource-Based View");
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn unknown_entity_becomes_new() {
        let normalizer = EntityNormalizer::new(0.85, false);
        let result = normalizer.normalize(
            "Some Brand New Theory Nobody Coined",
            EntityKind::Theory,
            None,
            None,
        );
        assert_eq!(result.method, MatchMethod::New);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn embedding_fallback_matches_above_threshold() {
        let normalizer = EntityNormalizer::new(0.8, true);
        let mut canon = HashMap::new();
        canon.insert("Resource-Based View".to_string(), vec![1.0, 0.0, 0.0]);
        canon.insert("Agency Theory".to_string(), vec![0.0, 1.0, 0.0]);

        let result = normalizer.normalize(
            "a paraphrase of rbv with no dictionary hit",
            EntityKind::Theory,
            Some(&[0.99, 0.01, 0.0]),
            Some(&canon),
        );
        assert_eq!(result.method, MatchMethod::Embedding);
        assert_eq!(result.normalized, "Resource-Based View");
    }

    #[test]
    fn software_short_canonical_is_upper_cased() {
        let normalizer = EntityNormalizer::new(0.85, false);
        let result = normalizer.normalize("r statistical", EntityKind::Software, None, None);
        assert_eq!(result.normalized, "R");
    }
}
