//! Theory-explains-phenomenon connection strength (§4.8).
//!
//! Computes the five weighted factors that make up `connection_strength`
//! for one `(theory, phenomenon, paper)` triple. Each sub-score is
//! persisted alongside the edge (`models::ConnectionFactors`) so downstream
//! analytics can re-weigh the contributions without recomputation.

use crate::models::{ConnectionFactors, TheoryRole};
use crate::shared::utils::jaccard_similarity;

/// Minimum total connection strength for an `EXPLAINS_PHENOMENON` edge to
/// be written (§4.8 / §4.6 step 7).
pub const MIN_CONNECTION_STRENGTH: f64 = 0.3;

/// Section co-location score: 1.0 if theory and phenomenon share a section,
/// 0.5 if one is introduction and the other literature_review, else 0.2.
fn section_score(theory_section: &str, phenomenon_section: &str) -> f64 {
    let t = theory_section.to_lowercase();
    let p = phenomenon_section.to_lowercase();

    if !t.is_empty() && t == p {
        return 1.0;
    }

    let is_intro_lit = |a: &str, b: &str| {
        (a.contains("introduction") && b.contains("literature"))
            || (a.contains("literature") && b.contains("introduction"))
    };
    if is_intro_lit(&t, &p) {
        0.5
    } else {
        0.2
    }
}

/// Inputs required to compute one theory-phenomenon connection strength.
pub struct ConnectionInputs<'a> {
    pub theory_role: TheoryRole,
    pub theory_section: &'a str,
    pub phenomenon_section: &'a str,
    pub theory_usage_context: &'a str,
    pub phenomenon_description: &'a str,
    pub phenomenon_context: &'a str,
    pub theory_embedding: Option<&'a [f32]>,
    pub phenomenon_embedding: Option<&'a [f32]>,
    pub explicit_link: bool,
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

/// Computes the per-factor breakdown for one theory-phenomenon connection.
/// `semantic_score` falls back to `keyword_score` when no embeddings are
/// available (§9 "the design must function with a null embedding model").
pub fn compute_factors(inputs: &ConnectionInputs) -> ConnectionFactors {
    let role_weight = inputs.theory_role.role_weight();
    let section = section_score(inputs.theory_section, inputs.phenomenon_section);

    let phenomenon_text = format!(
        "{} {}",
        inputs.phenomenon_description, inputs.phenomenon_context
    );
    let keyword = jaccard_similarity(inputs.theory_usage_context, &phenomenon_text);

    let semantic = match (inputs.theory_embedding, inputs.phenomenon_embedding) {
        (Some(t), Some(p)) => cosine_similarity(t, p),
        _ => keyword,
    };

    let explicit_bonus = if inputs.explicit_link { 0.2 } else { 0.0 };

    ConnectionFactors {
        role_weight,
        section_score: section,
        keyword_score: keyword,
        semantic_score: semantic,
        explicit_bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_section_scores_full_section_score() {
        assert_eq!(section_score("Discussion", "discussion"), 1.0);
    }

    #[test]
    fn intro_and_lit_review_scores_half() {
        assert_eq!(section_score("Introduction", "Literature Review"), 0.5);
    }

    #[test]
    fn unrelated_sections_score_low() {
        assert_eq!(section_score("Methods", "Results"), 0.2);
    }

    #[test]
    fn semantic_falls_back_to_keyword_without_embeddings() {
        let inputs = ConnectionInputs {
            theory_role: TheoryRole::Primary,
            theory_section: "Discussion",
            phenomenon_section: "Discussion",
            theory_usage_context: "firm performance growth",
            phenomenon_description: "firm performance decline",
            phenomenon_context: "",
            theory_embedding: None,
            phenomenon_embedding: None,
            explicit_link: false,
        };
        let factors = compute_factors(&inputs);
        assert_eq!(factors.semantic_score, factors.keyword_score);
    }

    #[test]
    fn explicit_link_adds_bonus() {
        let inputs = ConnectionInputs {
            theory_role: TheoryRole::Supporting,
            theory_section: "",
            phenomenon_section: "",
            theory_usage_context: "",
            phenomenon_description: "",
            phenomenon_context: "",
            theory_embedding: None,
            phenomenon_embedding: None,
            explicit_link: true,
        };
        let factors = compute_factors(&inputs);
        assert_eq!(factors.explicit_bonus, 0.2);
    }

    #[test]
    fn strong_inputs_cross_minimum_threshold() {
        let inputs = ConnectionInputs {
            theory_role: TheoryRole::Primary,
            theory_section: "Discussion",
            phenomenon_section: "Discussion",
            theory_usage_context: "explains firm growth and survival",
            phenomenon_description: "firm growth and long-term survival",
            phenomenon_context: "",
            theory_embedding: None,
            phenomenon_embedding: None,
            explicit_link: true,
        };
        let strength = compute_factors(&inputs).connection_strength();
        assert!(strength >= MIN_CONNECTION_STRENGTH);
    }
}
