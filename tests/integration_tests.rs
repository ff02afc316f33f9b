//! Integration tests for the extraction and ingestion pipeline.
//!
//! Run everything that doesn't need external services:
//!     cargo test --test integration_tests
//! Run the Neo4j-backed tests too (needs a running instance):
//!     NEO4J_URI=bolt://localhost:7687 NEO4J_PASSWORD=... \
//!         cargo test --test integration_tests -- --ignored

use smj_pipeline::conflict::{self, ConflictStrategy, ResolvableEntity};
use smj_pipeline::discovery::{self, YearRange};
use smj_pipeline::models::{ExtractionResult, RawAuthor, RawMetadata, RawTheory, RawVariable};
use smj_pipeline::normalizer::{EntityKind, EntityNormalizer};
use smj_pipeline::validator;
use smj_pipeline::{Config, GraphStore};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

fn temp_corpus_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("smj_pipeline_test_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp corpus dir");
    dir
}

fn touch(path: &std::path::Path) {
    fs::write(path, b"%PDF-1.4\n").expect("write stub pdf");
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn discovery_walks_nested_dirs_and_filters_by_year() {
    let root = temp_corpus_dir("discovery_year_range");
    let sub = root.join("1990s");
    fs::create_dir_all(&sub).unwrap();

    touch(&root.join("1999_001.pdf"));
    touch(&sub.join("1995_002.pdf"));
    touch(&root.join("2010_003.pdf"));
    touch(&root.join("notes.txt"));

    let tasks = discovery::discover_papers(
        &root,
        YearRange {
            start: Some(1990),
            end: Some(2000),
        },
        &HashSet::new(),
    )
    .expect("discovery should succeed");

    let ids: Vec<&str> = tasks.iter().map(|t| t.paper_id.as_str()).collect();
    assert_eq!(ids, vec!["1995_002", "1999_001"]);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn discovery_skips_already_completed_papers() {
    let root = temp_corpus_dir("discovery_resume");
    touch(&root.join("2001_a.pdf"));
    touch(&root.join("2002_b.pdf"));

    let mut completed = HashSet::new();
    completed.insert("2001_a".to_string());

    let tasks = discovery::discover_papers(&root, YearRange::default(), &completed)
        .expect("discovery should succeed");

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].paper_id, "2002_b");
    assert!(!tasks[0].exhausted());

    fs::remove_dir_all(&root).ok();
}

// =============================================================================
// Mocked extraction -> normalization -> validation -> conflict resolution
// =============================================================================

/// Stands in for what a real LLM call would return: the extractor's job
/// ends here, before any validation or normalization has run.
fn mocked_extraction(paper_id: &str) -> ExtractionResult {
    ExtractionResult {
        paper_id: paper_id.to_string(),
        metadata: RawMetadata {
            title: Some("Resource Allocation and Firm Growth".to_string()),
            abstract_text: Some("A study of firm-level resource allocation.".to_string()),
            publication_year: Some(2001),
            journal: None,
            doi: None,
            keywords: vec!["resources".to_string(), "growth".to_string()],
            paper_type: Some("empirical_quantitative".to_string()),
        },
        authors: vec![RawAuthor {
            full_name: Some("Jay B. Barney".to_string()),
            position: Some(0),
            affiliations: vec!["Ohio State University".to_string()],
            ..Default::default()
        }],
        theories: vec![RawTheory {
            theory_name: Some("RBV".to_string()),
            role: Some("primary".to_string()),
            section: Some("introduction".to_string()),
            confidence: 0.9,
            ..Default::default()
        }],
        variables: vec![RawVariable {
            variable_name: Some("Firm Performance".to_string()),
            variable_type: Some("dependent".to_string()),
            confidence: 0.8,
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn mocked_extraction_validates_and_normalizes_into_canonical_entities() {
    let extraction = mocked_extraction("2001_001");

    let paper = validator::validate_metadata(&extraction.paper_id, &extraction.metadata);
    assert_eq!(paper.title, "Resource Allocation and Firm Growth");
    assert_eq!(paper.publication_year, 2001);

    let author = validator::validate_author(0, &extraction.authors[0])
        .expect("author with a name should validate");
    assert_eq!(author.family_name, "Barney");
    assert_eq!(author.affiliations, vec!["Ohio State University"]);

    let validated_theory =
        validator::validate_theory(&extraction.theories[0]).expect("theory should validate");
    assert_eq!(validated_theory.theory.name, "RBV");

    let normalizer = EntityNormalizer::new(0.85, false);
    let normalized =
        normalizer.normalize(&validated_theory.theory.name, EntityKind::Theory, None, None);
    assert_eq!(normalized.normalized, "Resource-Based View");
    assert!(normalized.confidence > 0.9);

    let variable = validator::validate_variable(&extraction.paper_id, &extraction.variables[0])
        .expect("variable should validate");
    assert_eq!(variable.variable.variable_id.len(), 16);
}

#[test]
fn unnamed_author_and_empty_theory_name_are_dropped_rather_than_defaulted() {
    let nameless = RawAuthor {
        affiliations: vec!["Some University".to_string()],
        ..Default::default()
    };
    assert!(validator::validate_author(0, &nameless).is_none());

    let nameless_theory = RawTheory::default();
    assert!(validator::validate_theory(&nameless_theory).is_none());
}

#[test]
fn normalizer_then_conflict_resolution_keeps_higher_confidence_entity() {
    let normalizer = EntityNormalizer::new(0.85, false);
    let first_pass = normalizer.normalize("resource-based theory", EntityKind::Theory, None, None);
    let second_pass =
        normalizer.normalize("the resource-based view", EntityKind::Theory, None, None);
    assert_eq!(first_pass.normalized, second_pass.normalized);

    let existing = ResolvableEntity {
        description: Some(
            "A firm-level theory of competitive advantage from resources".to_string(),
        ),
        list_fields: Vec::new(),
        confidence: 0.6,
        extracted_at: chrono::Local::now(),
        merge_count: 0,
    };
    let reextracted = ResolvableEntity {
        description: Some("A theory explaining sustained advantage via VRIN resources".to_string()),
        list_fields: Vec::new(),
        confidence: 0.92,
        extracted_at: chrono::Local::now(),
        merge_count: 0,
    };

    let resolution = conflict::resolve(&existing, &reextracted, ConflictStrategy::HighestConfidence)
        .expect("differing descriptions should produce a resolution");
    assert_eq!(resolution.confidence, 0.92);
    assert_eq!(resolution.reason, "new_entity_higher_confidence");
}

// =============================================================================
// Graph store (needs a running Neo4j instance)
// =============================================================================

#[tokio::test]
#[ignore = "requires a reachable Neo4j instance"]
async fn graph_store_connects_and_applies_schema() {
    let config = Config::from_env().expect("config should build from environment");

    let graph = GraphStore::connect(&config)
        .await
        .expect("failed to connect, is NEO4J_URI reachable?");
    graph
        .ensure_schema()
        .await
        .expect("schema constraints should apply idempotently");
}

#[tokio::test]
#[ignore = "requires a reachable Neo4j instance"]
async fn compute_relationships_and_generate_embeddings_are_idempotent() {
    let config = Config::from_env().expect("config should build from environment");
    let graph = GraphStore::connect(&config).await.expect("connect");
    graph.ensure_schema().await.expect("ensure_schema");

    let first = graph.compute_relationships().await.expect("first pass");
    let second = graph.compute_relationships().await.expect("second pass");
    assert_eq!(first.uses_same_theory, second.uses_same_theory);

    let embeddings = graph.generate_embeddings().await.expect("embeddings");
    assert_eq!(embeddings.papers, 0, "no papers ingested by this test");
}
