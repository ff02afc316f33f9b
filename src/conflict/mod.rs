//! Conflict resolution for re-extracted canonical entities (§4.7).
//!
//! Ported from the original pipeline's `conflict_resolver.py`: four
//! strategies (`highest_confidence`, `most_recent`, `merge`,
//! `manual_review`) choose between an existing graph entity and a freshly
//! extracted one with the same canonical identity. The resolver never
//! mutates the graph itself — it returns a decision the Ingester applies
//! inside its transaction (§9 "resolve-then-write").

use crate::shared::utils::jaccard_similarity;
use chrono::{DateTime, Local};

/// Strategy used to resolve a conflict between an existing and a newly
/// extracted entity with the same canonical identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictStrategy {
    #[default]
    HighestConfidence,
    MostRecent,
    Merge,
    ManualReview,
}

/// Minimal view of an entity used for conflict resolution: whatever scalar
/// description text and list-valued fields it carries, plus its confidence
/// and extraction timestamp. Concrete entity types are converted into this
/// shape by the ingester before calling `resolve`.
#[derive(Debug, Clone)]
pub struct ResolvableEntity {
    pub description: Option<String>,
    pub list_fields: Vec<(String, Vec<String>)>,
    pub confidence: f64,
    pub extracted_at: DateTime<Local>,
    /// `merge_count` accumulated over prior merges (0 if never merged).
    pub merge_count: u32,
}

/// Outcome of resolving one conflict: which entity fields should be
/// written, the merge count to persist, and a short decision reason logged
/// by the ingester.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub description: Option<String>,
    pub list_fields: Vec<(String, Vec<String>)>,
    pub confidence: f64,
    pub merge_count: u32,
    pub needs_review: bool,
    pub reason: &'static str,
}

/// Word-overlap similarity threshold above which two description fields are
/// considered non-contradictory (ported from `_similar_text`'s default).
const DESCRIPTION_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Resolve a conflict between `existing` and `new` using `strategy`.
/// Returns `None` when the two entities are identical in every compared
/// field (§4.7's "identical" short-circuit — nothing to write).
pub fn resolve(
    existing: &ResolvableEntity,
    new: &ResolvableEntity,
    strategy: ConflictStrategy,
) -> Option<Resolution> {
    if are_identical(existing, new) {
        return None;
    }

    Some(match strategy {
        ConflictStrategy::Merge if are_compatible(existing, new) => merge(existing, new),
        ConflictStrategy::Merge => resolve_by_confidence(existing, new),
        ConflictStrategy::HighestConfidence => resolve_by_confidence(existing, new),
        ConflictStrategy::MostRecent => resolve_by_recency(existing, new),
        ConflictStrategy::ManualReview => flag_for_review(existing, new),
    })
}

fn are_identical(existing: &ResolvableEntity, new: &ResolvableEntity) -> bool {
    existing.description == new.description
        && existing.list_fields == new.list_fields
        && (existing.confidence - new.confidence).abs() < f64::EPSILON
}

fn are_compatible(existing: &ResolvableEntity, new: &ResolvableEntity) -> bool {
    match (&existing.description, &new.description) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() && a != b => {
            jaccard_similarity(a, b) >= DESCRIPTION_SIMILARITY_THRESHOLD
        }
        _ => true,
    }
}

fn merge(existing: &ResolvableEntity, new: &ResolvableEntity) -> Resolution {
    let description = match (&existing.description, &new.description) {
        (Some(a), _) if !a.is_empty() => Some(a.clone()),
        (_, Some(b)) if !b.is_empty() => Some(b.clone()),
        (a, _) => a.clone(),
    };

    let mut merged_fields = existing.list_fields.clone();
    for (key, new_values) in &new.list_fields {
        if let Some((_, existing_values)) = merged_fields.iter_mut().find(|(k, _)| k == key) {
            for v in new_values {
                if !existing_values.contains(v) {
                    existing_values.push(v.clone());
                }
            }
        } else {
            merged_fields.push((key.clone(), new_values.clone()));
        }
    }

    Resolution {
        description,
        list_fields: merged_fields,
        confidence: (existing.confidence + new.confidence) / 2.0,
        merge_count: existing.merge_count + 1,
        needs_review: false,
        reason: "merged",
    }
}

fn resolve_by_confidence(existing: &ResolvableEntity, new: &ResolvableEntity) -> Resolution {
    if new.confidence > existing.confidence {
        Resolution {
            description: new.description.clone(),
            list_fields: new.list_fields.clone(),
            confidence: new.confidence,
            merge_count: existing.merge_count,
            needs_review: false,
            reason: "new_entity_higher_confidence",
        }
    } else {
        Resolution {
            description: existing.description.clone(),
            list_fields: existing.list_fields.clone(),
            confidence: existing.confidence,
            merge_count: existing.merge_count,
            needs_review: false,
            reason: "existing_entity_higher_confidence",
        }
    }
}

fn resolve_by_recency(existing: &ResolvableEntity, new: &ResolvableEntity) -> Resolution {
    if new.extracted_at > existing.extracted_at {
        Resolution {
            description: new.description.clone(),
            list_fields: new.list_fields.clone(),
            confidence: new.confidence,
            merge_count: existing.merge_count,
            needs_review: false,
            reason: "new_entity_more_recent",
        }
    } else {
        Resolution {
            description: existing.description.clone(),
            list_fields: existing.list_fields.clone(),
            confidence: existing.confidence,
            merge_count: existing.merge_count,
            needs_review: false,
            reason: "existing_entity_more_recent",
        }
    }
}

fn flag_for_review(existing: &ResolvableEntity, _new: &ResolvableEntity) -> Resolution {
    Resolution {
        description: existing.description.clone(),
        list_fields: existing.list_fields.clone(),
        confidence: existing.confidence,
        merge_count: existing.merge_count,
        needs_review: true,
        reason: "flagged_for_manual_review",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(description: &str, confidence: f64, when: DateTime<Local>) -> ResolvableEntity {
        ResolvableEntity {
            description: Some(description.to_string()),
            list_fields: Vec::new(),
            confidence,
            extracted_at: when,
            merge_count: 0,
        }
    }

    #[test]
    fn identical_entities_resolve_to_none() {
        let now = Local::now();
        let existing = entity("same description", 0.8, now);
        let new = entity("same description", 0.8, now);
        assert!(resolve(&existing, &new, ConflictStrategy::HighestConfidence).is_none());
    }

    #[test]
    fn highest_confidence_prefers_new_when_strictly_higher() {
        let now = Local::now();
        let existing = entity("Old", 0.7, now);
        let new = entity("New", 0.9, now);
        let resolution = resolve(&existing, &new, ConflictStrategy::HighestConfidence).unwrap();
        assert_eq!(resolution.description.as_deref(), Some("New"));
        assert_eq!(resolution.reason, "new_entity_higher_confidence");
    }

    #[test]
    fn highest_confidence_ties_prefer_existing() {
        let now = Local::now();
        let existing = entity("Old", 0.8, now);
        let new = entity("New", 0.8, now);
        let resolution = resolve(&existing, &new, ConflictStrategy::HighestConfidence).unwrap();
        assert_eq!(resolution.description.as_deref(), Some("Old"));
        assert_eq!(resolution.reason, "existing_entity_higher_confidence");
    }

    #[test]
    fn merge_combines_list_fields_and_averages_confidence() {
        let now = Local::now();
        let mut existing = entity("A firm-level theory of growth", 0.6, now);
        existing.list_fields = vec![("software".into(), vec!["Stata".into()])];
        let mut new = entity("A firm-level theory of expansion", 0.8, now);
        new.list_fields = vec![("software".into(), vec!["R".into()])];

        let resolution = resolve(&existing, &new, ConflictStrategy::Merge).unwrap();
        assert_eq!(resolution.confidence, 0.7);
        assert_eq!(resolution.merge_count, 1);
        let software = &resolution.list_fields.iter().find(|(k, _)| k == "software").unwrap().1;
        assert!(software.contains(&"Stata".to_string()));
        assert!(software.contains(&"R".to_string()));
    }

    #[test]
    fn merge_falls_back_to_confidence_when_incompatible() {
        let now = Local::now();
        let existing = entity("Theory about market entry timing", 0.6, now);
        let new = entity("Theory about executive compensation design", 0.9, now);
        let resolution = resolve(&existing, &new, ConflictStrategy::Merge).unwrap();
        assert_eq!(resolution.reason, "new_entity_higher_confidence");
    }

    #[test]
    fn manual_review_keeps_existing_and_flags() {
        let now = Local::now();
        let existing = entity("Old", 0.6, now);
        let new = entity("New", 0.9, now);
        let resolution = resolve(&existing, &new, ConflictStrategy::ManualReview).unwrap();
        assert_eq!(resolution.description.as_deref(), Some("Old"));
        assert!(resolution.needs_review);
    }

    #[test]
    fn most_recent_prefers_later_timestamp() {
        let earlier = Local::now() - chrono::Duration::days(1);
        let later = Local::now();
        let existing = entity("Old", 0.9, earlier);
        let new = entity("New", 0.5, later);
        let resolution = resolve(&existing, &new, ConflictStrategy::MostRecent).unwrap();
        assert_eq!(resolution.reason, "new_entity_more_recent");
    }
}
