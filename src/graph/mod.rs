//! Graph store: one atomic transaction per paper (§4.6).
//!
//! Ported from the original pipeline's ingestion step, re-expressed around
//! `neo4rs`'s transaction API. Every write for one paper — the `Paper` node,
//! its authors/institutions, canonical entities resolved through the
//! normalizer and conflict resolver, paper-scoped entities, computed
//! `EXPLAINS_PHENOMENON` edges, and citation resolution — happens inside a
//! single `Txn` so a failed paper never leaves partial graph state (§4.6
//! step 1, §8 "atomicity"). Canonical cross-paper entities (Theory,
//! Phenomenon, Method) and the cumulative Author-scoped mirror edges are
//! upserted, never deleted; only this paper's own outgoing edges are
//! rewritten on re-ingestion (§4.6 step 6).

use crate::connection_strength::{self, ConnectionInputs, MIN_CONNECTION_STRENGTH};
use crate::conflict::{self, ConflictStrategy, ResolvableEntity};
use crate::embedding;
use crate::models::{
    Author, ConnectionFactors, ExtractionResult, Institution, Method, Paper,
    RawTheoryPhenomenonLink, TheoryRole,
};
use crate::normalizer::{EntityKind, EntityNormalizer};
use crate::shared::config::Config;
use crate::shared::errors::{AppError, AppResult};
use crate::validator;
use chrono::Local;
use neo4rs::{query, Graph, Query, Row, Txn};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Cosine-similarity threshold for the embedding nearest-neighbor pass
/// (§4.5: "if the best similarity >= threshold (default 0.85)").
const EMBEDDING_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Cypher uniqueness constraints applied once at startup (§6.3). Re-running
/// these is a no-op on a graph where they already exist.
const CONSTRAINTS: &[&str] = &[
    "CREATE CONSTRAINT paper_id IF NOT EXISTS FOR (p:Paper) REQUIRE p.paper_id IS UNIQUE",
    "CREATE CONSTRAINT author_id IF NOT EXISTS FOR (a:Author) REQUIRE a.author_id IS UNIQUE",
    "CREATE CONSTRAINT institution_id IF NOT EXISTS FOR (i:Institution) REQUIRE i.institution_id IS UNIQUE",
    "CREATE CONSTRAINT theory_name IF NOT EXISTS FOR (t:Theory) REQUIRE t.name IS UNIQUE",
    "CREATE CONSTRAINT phenomenon_name IF NOT EXISTS FOR (ph:Phenomenon) REQUIRE ph.phenomenon_name IS UNIQUE",
    "CREATE CONSTRAINT method_identity IF NOT EXISTS FOR (m:Method) REQUIRE (m.name, m.method_type) IS UNIQUE",
    "CREATE CONSTRAINT software_name IF NOT EXISTS FOR (s:Software) REQUIRE s.software_name IS UNIQUE",
    "CREATE CONSTRAINT dataset_name IF NOT EXISTS FOR (d:Dataset) REQUIRE d.dataset_name IS UNIQUE",
    "CREATE CONSTRAINT variable_id IF NOT EXISTS FOR (v:Variable) REQUIRE v.variable_id IS UNIQUE",
    "CREATE CONSTRAINT finding_id IF NOT EXISTS FOR (f:Finding) REQUIRE f.finding_id IS UNIQUE",
    "CREATE CONSTRAINT contribution_id IF NOT EXISTS FOR (c:Contribution) REQUIRE c.contribution_id IS UNIQUE",
    "CREATE CONSTRAINT question_id IF NOT EXISTS FOR (q:ResearchQuestion) REQUIRE q.question_id IS UNIQUE",
    "CREATE CONSTRAINT topic_id IF NOT EXISTS FOR (t:Topic) REQUIRE t.topic_id IS UNIQUE",
];

/// Maximum connection attempts before giving up on the graph store.
const MAX_CONNECT_ATTEMPTS: u32 = 3;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Length of the citation-title prefix compared for fuzzy resolution (§4.6
/// step 8: "substring match, first 50 characters, bidirectional
/// containment").
const CITATION_PREFIX_LEN: usize = 50;

/// Thin wrapper around a `neo4rs::Graph` handle that knows how to
/// (re)connect and apply the schema constraints.
pub struct GraphStore {
    graph: Graph,
    normalizer: EntityNormalizer,
    embeddings_enabled: bool,
}

impl GraphStore {
    /// Connect to the configured Neo4j instance, retrying on transient
    /// connection failures (§7 "graph connectivity errors are retried").
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut last_err = None;
        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match Graph::new(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await {
                Ok(graph) => {
                    return Ok(Self {
                        graph,
                        normalizer: EntityNormalizer::new(
                            EMBEDDING_SIMILARITY_THRESHOLD,
                            config.embeddings_enabled,
                        ),
                        embeddings_enabled: config.embeddings_enabled,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "failed to connect to graph store");
                    last_err = Some(e);
                    if attempt < MAX_CONNECT_ATTEMPTS {
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }
        Err(AppError::GraphConnectionError(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    /// Apply the domain's uniqueness constraints (§6.3). Safe to call on
    /// every startup.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        for stmt in CONSTRAINTS {
            self.graph
                .run(query(stmt))
                .await
                .map_err(|e| AppError::GraphConnectionError(e.to_string()))?;
        }
        Ok(())
    }

    /// Normalize `name` to its canonical form (§4.5): dictionary lookup
    /// first, then (when embeddings are enabled) cosine-nearest-neighbor
    /// against every already-persisted node of `label` that carries an
    /// embedding. Canonical embeddings are read fresh per call rather than
    /// cached across papers, since the candidate set grows as the corpus
    /// is ingested.
    async fn normalize_canonical(
        &self,
        txn: &Txn,
        kind: EntityKind,
        label: &str,
        name_prop: &str,
        name: &str,
    ) -> AppResult<String> {
        if !self.embeddings_enabled {
            return Ok(self.normalizer.normalize(name, kind, None, None).normalized);
        }

        let q = query(&format!(
            "MATCH (n:{label}) WHERE n.embedding IS NOT NULL RETURN n.{name_prop} AS name, n.embedding AS embedding"
        ));
        let mut stream = txn
            .execute(q)
            .await
            .map_err(|e| AppError::GraphConflict(e.to_string()))?;
        let mut canonical_embeddings: HashMap<String, Vec<f32>> = HashMap::new();
        while let Ok(Some(row)) = stream.next().await {
            if let (Ok(n), Ok(v)) = (row.get::<String>("name"), row.get::<Vec<f32>>("embedding")) {
                canonical_embeddings.insert(n, v);
            }
        }

        let query_embedding = embedding::embed(name);
        let result = self.normalizer.normalize(
            name,
            kind,
            Some(&query_embedding),
            Some(&canonical_embeddings),
        );
        Ok(result.normalized)
    }

    /// Ingest one paper's extraction result inside a single transaction.
    /// Paper-scoped edges are rewritten from scratch (§4.6 step 6:
    /// "re-ingesting a paper replaces its edges, not its canonical nodes").
    pub async fn ingest_paper(
        &self,
        extraction: &ExtractionResult,
        paper: &Paper,
        authors: &[(Author, Vec<Institution>, i32)],
    ) -> AppResult<IngestReport> {
        let txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| AppError::GraphConnectionError(e.to_string()))?;

        let mut report = IngestReport::default();

        upsert_paper(&txn, paper).await?;
        rewrite_paper_edges(&txn, &paper.paper_id).await?;

        for (author, institutions, position) in authors {
            upsert_author(&txn, author).await?;
            write_authored(&txn, &author.author_id, &paper.paper_id, *position).await?;
            for institution in institutions {
                upsert_institution(&txn, institution).await?;
                write_affiliated_with(&txn, &author.author_id, &institution.institution_id)
                    .await?;
            }
            report.authors += 1;
        }

        let author_ids: Vec<&str> = authors.iter().map(|(a, _, _)| a.author_id.as_str()).collect();

        let mut written_theories = Vec::new();
        for raw in &extraction.theories {
            let Some(mut validated) = validator::validate_theory(raw) else {
                continue;
            };
            validated.theory.name = self
                .normalize_canonical(&txn, EntityKind::Theory, "Theory", "name", &validated.theory.name)
                .await?;
            if upsert_theory(&txn, &validated.theory, validated.confidence).await? {
                report.conflicts += 1;
            }
            write_uses_theory(
                &txn,
                &validated.theory.name,
                &paper.paper_id,
                validated.role,
                &validated.section,
                validated.usage_context.as_deref(),
                validated.confidence,
                validated.validation_status,
            )
            .await?;
            for author_id in &author_ids {
                write_author_uses_theory(
                    &txn,
                    author_id,
                    &validated.theory.name,
                    &paper.paper_id,
                    paper.publication_year,
                )
                .await?;
            }
            written_theories.push((
                validated.theory.name.clone(),
                validated.role,
                validated.section.clone(),
                validated.usage_context.clone(),
            ));
            report.theories += 1;
        }

        let mut written_phenomena = Vec::new();
        for raw in &extraction.phenomena {
            let Some(mut validated) = validator::validate_phenomenon(raw) else {
                continue;
            };
            validated.phenomenon.phenomenon_name = self
                .normalize_canonical(
                    &txn,
                    EntityKind::Phenomenon,
                    "Phenomenon",
                    "phenomenon_name",
                    &validated.phenomenon.phenomenon_name,
                )
                .await?;
            if upsert_phenomenon(&txn, &validated.phenomenon, validated.confidence).await? {
                report.conflicts += 1;
            }
            write_studies_phenomenon(
                &txn,
                &validated.phenomenon.phenomenon_name,
                &paper.paper_id,
                &validated.section,
                validated.context.as_deref(),
            )
            .await?;
            for author_id in &author_ids {
                write_author_studies_phenomenon(
                    &txn,
                    author_id,
                    &validated.phenomenon.phenomenon_name,
                    &paper.paper_id,
                    paper.publication_year,
                )
                .await?;
            }
            written_phenomena.push((
                validated.phenomenon.phenomenon_name.clone(),
                validated.section.clone(),
                validated.context.clone(),
                validated.phenomenon.description.clone(),
            ));
            report.phenomena += 1;
        }

        for raw in &extraction.methods {
            let Some(mut validated) = validator::validate_method(raw) else {
                continue;
            };
            validated.method.name = self
                .normalize_canonical(&txn, EntityKind::Method, "Method", "name", &validated.method.name)
                .await?;
            for software_name in validated.method.software.iter_mut() {
                *software_name = self
                    .normalize_canonical(
                        &txn,
                        EntityKind::Software,
                        "Software",
                        "software_name",
                        software_name,
                    )
                    .await?;
            }
            if upsert_method(&txn, &validated.method).await? {
                report.conflicts += 1;
            }
            write_uses_method(
                &txn,
                &validated.method.name,
                validated.method.method_type,
                &paper.paper_id,
                validated.confidence,
            )
            .await?;
            for software_name in &validated.method.software {
                upsert_software(&txn, software_name).await?;
                write_uses_software(&txn, software_name, &paper.paper_id).await?;
                report.software += 1;
            }
            report.methods += 1;
        }

        for raw in &extraction.variables {
            let Some(validated) = validator::validate_variable(&paper.paper_id, raw) else {
                continue;
            };
            write_variable(&txn, &paper.paper_id, &validated).await?;
            report.variables += 1;
        }

        for raw in &extraction.findings {
            let Some(finding) = validator::validate_finding(&paper.paper_id, raw) else {
                continue;
            };
            write_finding(&txn, &paper.paper_id, &finding).await?;
            report.findings += 1;
        }

        for raw in &extraction.contributions {
            let Some(contribution) = validator::validate_contribution(&paper.paper_id, raw) else {
                continue;
            };
            write_contribution(&txn, &paper.paper_id, &contribution).await?;
            report.contributions += 1;
        }

        for raw in &extraction.research_questions {
            let Some(rq) = validator::validate_research_question(&paper.paper_id, raw) else {
                continue;
            };
            write_research_question(&txn, &paper.paper_id, &rq).await?;
            report.research_questions += 1;
        }

        for raw in &extraction.citations {
            let Some(validated) = validator::validate_citation(raw) else {
                continue;
            };
            if let Some((cited_paper_id, confidence)) =
                resolve_citation(&txn, &paper.paper_id, &validated.title).await?
            {
                write_cites(
                    &txn,
                    &paper.paper_id,
                    &cited_paper_id,
                    validated.citation_type,
                    &validated.section,
                    confidence,
                )
                .await?;
                report.citations += 1;
            }
        }

        report.explains_phenomenon += write_explains_phenomenon(
            &txn,
            &paper.paper_id,
            &written_theories,
            &written_phenomena,
            &extraction.theory_phenomenon_links,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::GraphConflict(e.to_string()))?;

        info!(
            paper_id = %paper.paper_id,
            theories = report.theories,
            phenomena = report.phenomena,
            methods = report.methods,
            citations = report.citations,
            conflicts = report.conflicts,
            "paper ingested"
        );

        Ok(report)
    }

    /// Post-hoc paper-to-paper relationship pass (§6.4 `compute-relationships`).
    /// Topic-evolution clustering is out of scope (see DESIGN.md), so
    /// `TEMPORAL_SEQUENCE`'s "same topic" criterion is approximated by a
    /// shared primary theory rather than a computed topic cluster.
    pub async fn compute_relationships(&self) -> AppResult<RelationshipReport> {
        Ok(RelationshipReport {
            uses_same_theory: self.link_shared_primary_theory().await?,
            uses_same_method: self.link_shared_method().await?,
            uses_same_variables: self.link_shared_variables().await?,
            temporal_sequence: self.link_temporal_sequence().await?,
        })
    }

    async fn link_shared_primary_theory(&self) -> AppResult<u64> {
        let q = query(
            "MATCH (p1:Paper)-[:USES_THEORY {role: 'Primary'}]->(t:Theory)<-[:USES_THEORY {role: 'Primary'}]-(p2:Paper) \
             WHERE p1.paper_id < p2.paper_id \
             WITH p1, p2, collect(DISTINCT t.name) AS shared_theories \
             MERGE (p1)-[r:USES_SAME_THEORY]->(p2) \
             SET r.shared_count = size(shared_theories), r.shared_theories = shared_theories \
             RETURN count(*) AS written",
        );
        self.count_written(q).await
    }

    async fn link_shared_method(&self) -> AppResult<u64> {
        let q = query(
            "MATCH (p1:Paper)-[:USES_METHOD]->(m:Method)<-[:USES_METHOD]-(p2:Paper) \
             WHERE p1.paper_id < p2.paper_id \
             WITH p1, p2, collect(DISTINCT m.name) AS shared_methods \
             MERGE (p1)-[r:USES_SAME_METHOD]->(p2) \
             SET r.shared_count = size(shared_methods), r.shared_methods = shared_methods \
             RETURN count(*) AS written",
        );
        self.count_written(q).await
    }

    /// Requires at least two shared variables, matched case-insensitively
    /// by name across the two papers' own (paper-scoped) `Variable` nodes.
    async fn link_shared_variables(&self) -> AppResult<u64> {
        let q = query(
            "MATCH (p1:Paper)-[:USES_VARIABLE]->(v1:Variable), (p2:Paper)-[:USES_VARIABLE]->(v2:Variable) \
             WHERE p1.paper_id < p2.paper_id AND toLower(v1.variable_name) = toLower(v2.variable_name) \
             WITH p1, p2, collect(DISTINCT toLower(v1.variable_name)) AS shared_variables \
             WHERE size(shared_variables) >= 2 \
             MERGE (p1)-[r:USES_SAME_VARIABLES]->(p2) \
             SET r.shared_count = size(shared_variables), r.shared_variables = shared_variables \
             RETURN count(*) AS written",
        );
        self.count_written(q).await
    }

    /// Directional: earlier paper to later paper, gap of at most 5 years.
    async fn link_temporal_sequence(&self) -> AppResult<u64> {
        let q = query(
            "MATCH (p1:Paper)-[:USES_THEORY {role: 'Primary'}]->(t:Theory)<-[:USES_THEORY {role: 'Primary'}]-(p2:Paper) \
             WHERE p1.publication_year < p2.publication_year AND p2.publication_year - p1.publication_year <= 5 \
             WITH p1, p2, collect(DISTINCT t.name) AS shared_theories \
             MERGE (p1)-[r:TEMPORAL_SEQUENCE]->(p2) \
             SET r.year_gap = p2.publication_year - p1.publication_year, r.shared_theories = shared_theories \
             RETURN count(*) AS written",
        );
        self.count_written(q).await
    }

    async fn count_written(&self, q: Query) -> AppResult<u64> {
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| AppError::GraphConflict(e.to_string()))?;
        let row = stream
            .next()
            .await
            .map_err(|e| AppError::GraphConflict(e.to_string()))?;
        Ok(row.and_then(|r| r.get::<i64>("written").ok()).unwrap_or(0).max(0) as u64)
    }

    /// Batch-encode Papers, Theories, Phenomena, Methods, and
    /// ResearchQuestions that don't yet carry an embedding, storing
    /// `embedding` + `embedding_dim` + `embedding_model` (§6.4
    /// `generate-embeddings`).
    pub async fn generate_embeddings(&self) -> AppResult<EmbeddingReport> {
        Ok(EmbeddingReport {
            papers: self.embed_missing("Paper", "paper_id", "title").await?,
            theories: self.embed_missing("Theory", "name", "name").await?,
            phenomena: self
                .embed_missing("Phenomenon", "phenomenon_name", "phenomenon_name")
                .await?,
            methods: self.embed_missing("Method", "name", "name").await?,
            research_questions: self
                .embed_missing("ResearchQuestion", "question_id", "question")
                .await?,
        })
    }

    async fn embed_missing(&self, label: &str, id_prop: &str, text_prop: &str) -> AppResult<u64> {
        let q = query(&format!(
            "MATCH (n:{label}) WHERE n.embedding IS NULL AND n.{text_prop} IS NOT NULL \
             RETURN n.{id_prop} AS id, n.{text_prop} AS text"
        ));
        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| AppError::GraphConflict(e.to_string()))?;

        let mut pending = Vec::new();
        while let Ok(Some(row)) = stream.next().await {
            if let (Ok(id), Ok(text)) = (row.get::<String>("id"), row.get::<String>("text")) {
                pending.push((id, text));
            }
        }

        let mut written = 0u64;
        for (id, text) in pending {
            let vector = embedding::embed(&text);
            let q = query(&format!(
                "MATCH (n:{label} {{{id_prop}: $id}}) \
                 SET n.embedding = $embedding, n.embedding_dim = $dim, n.embedding_model = $model"
            ))
            .param("id", id)
            .param("embedding", vector)
            .param("dim", embedding::EMBEDDING_DIM as i64)
            .param("model", embedding::EMBEDDING_MODEL.to_string());
            self.graph
                .run(q)
                .await
                .map_err(|e| AppError::GraphConflict(e.to_string()))?;
            written += 1;
        }
        Ok(written)
    }
}

/// Counts of paper-to-paper relationships created by `compute_relationships`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipReport {
    pub uses_same_theory: u64,
    pub uses_same_method: u64,
    pub uses_same_variables: u64,
    pub temporal_sequence: u64,
}

/// Counts of nodes embedded by `generate_embeddings`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingReport {
    pub papers: u64,
    pub theories: u64,
    pub phenomena: u64,
    pub methods: u64,
    pub research_questions: u64,
}

/// Per-paper count of nodes/edges written, for pipeline stats (§4.9).
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub authors: u64,
    pub theories: u64,
    pub phenomena: u64,
    pub methods: u64,
    pub software: u64,
    pub variables: u64,
    pub findings: u64,
    pub contributions: u64,
    pub research_questions: u64,
    pub citations: u64,
    pub explains_phenomenon: u64,
    /// Number of canonical-entity writes that hit an existing node and went
    /// through conflict resolution rather than a first-write MERGE (§4.7).
    pub conflicts: u64,
}

async fn upsert_paper(txn: &Txn, paper: &Paper) -> AppResult<()> {
    let q = query(
        "MERGE (p:Paper {paper_id: $paper_id}) \
         SET p.title = $title, p.abstract_text = $abstract_text, \
             p.publication_year = $publication_year, p.journal = $journal, \
             p.doi = $doi, p.keywords = $keywords, p.paper_type = $paper_type",
    )
    .param("paper_id", paper.paper_id.clone())
    .param("title", paper.title.clone())
    .param("abstract_text", paper.abstract_text.clone())
    .param("publication_year", paper.publication_year as i64)
    .param("journal", paper.journal.clone())
    .param("doi", paper.doi.clone())
    .param("keywords", paper.keywords.clone())
    .param("paper_type", format!("{:?}", paper.paper_type));

    run(txn, q).await
}

/// Delete every outgoing relationship this paper owns before rewriting them,
/// so a re-ingestion never leaves stale edges behind without also deleting
/// edges other papers hold pointing at this one (e.g. an incoming `CITES`)
/// (§4.6 step 6).
async fn rewrite_paper_edges(txn: &Txn, paper_id: &str) -> AppResult<()> {
    let q = query(
        "MATCH (p:Paper {paper_id: $paper_id})-[r]->() \
         WHERE type(r) <> 'AUTHORED' DELETE r",
    )
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

async fn upsert_author(txn: &Txn, author: &Author) -> AppResult<()> {
    let q = query(
        "MERGE (a:Author {author_id: $author_id}) \
         SET a.full_name = $full_name, a.given_name = $given_name, \
             a.family_name = $family_name",
    )
    .param("author_id", author.author_id.clone())
    .param("full_name", author.full_name.clone())
    .param("given_name", author.given_name.clone())
    .param("family_name", author.family_name.clone());
    run(txn, q).await
}

async fn upsert_institution(txn: &Txn, institution: &Institution) -> AppResult<()> {
    let q = query(
        "MERGE (i:Institution {institution_id: $institution_id}) \
         SET i.institution_name = $institution_name",
    )
    .param("institution_id", institution.institution_id.clone())
    .param("institution_name", institution.institution_name.clone());
    run(txn, q).await
}

async fn write_authored(txn: &Txn, author_id: &str, paper_id: &str, position: i32) -> AppResult<()> {
    let q = query(
        "MATCH (a:Author {author_id: $author_id}), (p:Paper {paper_id: $paper_id}) \
         MERGE (a)-[r:AUTHORED]->(p) SET r.position = $position",
    )
    .param("author_id", author_id.to_string())
    .param("paper_id", paper_id.to_string())
    .param("position", position as i64);
    run(txn, q).await
}

async fn write_affiliated_with(txn: &Txn, author_id: &str, institution_id: &str) -> AppResult<()> {
    let q = query(
        "MATCH (a:Author {author_id: $author_id}), (i:Institution {institution_id: $institution_id}) \
         MERGE (a)-[r:AFFILIATED_WITH]->(i) SET r.affiliation_type = 'primary'",
    )
    .param("author_id", author_id.to_string())
    .param("institution_id", institution_id.to_string());
    run(txn, q).await
}

async fn fetch_one(txn: &Txn, q: Query) -> AppResult<Option<Row>> {
    let mut stream = txn
        .execute(q)
        .await
        .map_err(|e| AppError::GraphConflict(e.to_string()))?;
    stream
        .next()
        .await
        .map_err(|e| AppError::GraphConflict(e.to_string()))
}

/// Upsert a canonical `Theory` node, running conflict resolution (§4.7)
/// against whatever is already there. Returns `true` if an existing node
/// was found (and therefore went through resolution rather than a plain
/// first write).
async fn upsert_theory(txn: &Txn, theory: &crate::models::Theory, confidence: f64) -> AppResult<bool> {
    let existing_row = fetch_one(
        txn,
        query("MATCH (t:Theory {name: $name}) RETURN t.description AS description, t.conflict_confidence AS confidence, t.conflict_merge_count AS merge_count")
            .param("name", theory.name.clone()),
    )
    .await?;

    let Some(row) = existing_row else {
        let q = query(
            "MERGE (t:Theory {name: $name}) \
             SET t.domain = $domain, t.theory_type = $theory_type, t.description = $description, \
                 t.original_name = $original_name, \
                 t.conflict_confidence = $confidence, t.conflict_merge_count = 0",
        )
        .param("name", theory.name.clone())
        .param("domain", theory.domain.clone())
        .param("theory_type", format!("{:?}", theory.theory_type))
        .param("description", theory.description.clone())
        .param("original_name", theory.original_name.clone())
        .param("confidence", confidence);
        run(txn, q).await?;
        return Ok(false);
    };

    let existing = ResolvableEntity {
        description: row.get::<String>("description").ok().filter(|s| !s.is_empty()),
        list_fields: Vec::new(),
        confidence: row.get::<f64>("confidence").unwrap_or(0.5),
        extracted_at: Local::now(),
        merge_count: row.get::<i64>("merge_count").unwrap_or(0).max(0) as u32,
    };
    let new = ResolvableEntity {
        description: theory.description.clone(),
        list_fields: Vec::new(),
        confidence,
        extracted_at: Local::now(),
        merge_count: existing.merge_count,
    };

    if let Some(resolution) = conflict::resolve(&existing, &new, ConflictStrategy::HighestConfidence) {
        info!(theory = %theory.name, reason = resolution.reason, "theory conflict resolved");
        let q = query(
            "MATCH (t:Theory {name: $name}) \
             SET t.domain = $domain, t.theory_type = $theory_type, t.description = $description, \
                 t.conflict_confidence = $confidence, t.conflict_merge_count = $merge_count",
        )
        .param("name", theory.name.clone())
        .param("domain", theory.domain.clone())
        .param("theory_type", format!("{:?}", theory.theory_type))
        .param("description", resolution.description)
        .param("confidence", resolution.confidence)
        .param("merge_count", resolution.merge_count as i64);
        run(txn, q).await?;
    }
    Ok(true)
}

/// Upsert a canonical `Phenomenon` node with the same resolve-then-write
/// pattern as `upsert_theory` (§4.7).
async fn upsert_phenomenon(
    txn: &Txn,
    phenomenon: &crate::models::Phenomenon,
    confidence: f64,
) -> AppResult<bool> {
    let existing_row = fetch_one(
        txn,
        query("MATCH (ph:Phenomenon {phenomenon_name: $name}) RETURN ph.description AS description, ph.conflict_confidence AS confidence, ph.conflict_merge_count AS merge_count")
            .param("name", phenomenon.phenomenon_name.clone()),
    )
    .await?;

    let Some(row) = existing_row else {
        let q = query(
            "MERGE (ph:Phenomenon {phenomenon_name: $name}) \
             SET ph.phenomenon_type = $phenomenon_type, ph.domain = $domain, \
                 ph.description = $description, ph.conflict_confidence = $confidence, \
                 ph.conflict_merge_count = 0",
        )
        .param("name", phenomenon.phenomenon_name.clone())
        .param("phenomenon_type", format!("{:?}", phenomenon.phenomenon_type))
        .param("domain", phenomenon.domain.clone())
        .param("description", phenomenon.description.clone())
        .param("confidence", confidence);
        run(txn, q).await?;
        return Ok(false);
    };

    let existing = ResolvableEntity {
        description: row.get::<String>("description").ok().filter(|s| !s.is_empty()),
        list_fields: Vec::new(),
        confidence: row.get::<f64>("confidence").unwrap_or(0.5),
        extracted_at: Local::now(),
        merge_count: row.get::<i64>("merge_count").unwrap_or(0).max(0) as u32,
    };
    let new = ResolvableEntity {
        description: phenomenon.description.clone(),
        list_fields: Vec::new(),
        confidence,
        extracted_at: Local::now(),
        merge_count: existing.merge_count,
    };

    if let Some(resolution) = conflict::resolve(&existing, &new, ConflictStrategy::HighestConfidence) {
        info!(phenomenon = %phenomenon.phenomenon_name, reason = resolution.reason, "phenomenon conflict resolved");
        let q = query(
            "MATCH (ph:Phenomenon {phenomenon_name: $name}) \
             SET ph.phenomenon_type = $phenomenon_type, ph.domain = $domain, \
                 ph.description = $description, ph.conflict_confidence = $confidence, \
                 ph.conflict_merge_count = $merge_count",
        )
        .param("name", phenomenon.phenomenon_name.clone())
        .param("phenomenon_type", format!("{:?}", phenomenon.phenomenon_type))
        .param("domain", phenomenon.domain.clone())
        .param("description", resolution.description)
        .param("confidence", resolution.confidence)
        .param("merge_count", resolution.merge_count as i64);
        run(txn, q).await?;
    }
    Ok(true)
}

/// Upsert a canonical `Method` node, merging the `software` list field on
/// conflict rather than overwriting it (§4.7 merge strategy is the natural
/// fit here since two extractions of the same method rarely disagree, they
/// just mention different tooling).
async fn upsert_method(txn: &Txn, method: &Method) -> AppResult<bool> {
    let type_name = format!("{:?}", method.method_type);
    let existing_row = fetch_one(
        txn,
        query(
            "MATCH (m:Method {name: $name, method_type: $method_type}) \
             RETURN m.category AS category, m.software AS software, \
                    m.conflict_confidence AS confidence, m.conflict_merge_count AS merge_count",
        )
        .param("name", method.name.clone())
        .param("method_type", type_name.clone()),
    )
    .await?;

    let Some(row) = existing_row else {
        let q = query(
            "MERGE (m:Method {name: $name, method_type: $method_type}) \
             SET m.category = $category, m.software = $software, \
                 m.conflict_confidence = 0.8, m.conflict_merge_count = 0",
        )
        .param("name", method.name.clone())
        .param("method_type", type_name)
        .param("category", method.category.clone())
        .param("software", method.software.clone());
        run(txn, q).await?;
        return Ok(false);
    };

    let existing = ResolvableEntity {
        description: row.get::<String>("category").ok().filter(|s| !s.is_empty()),
        list_fields: vec![(
            "software".to_string(),
            row.get::<Vec<String>>("software").unwrap_or_default(),
        )],
        confidence: row.get::<f64>("confidence").unwrap_or(0.8),
        extracted_at: Local::now(),
        merge_count: row.get::<i64>("merge_count").unwrap_or(0).max(0) as u32,
    };
    let new = ResolvableEntity {
        description: method.category.clone(),
        list_fields: vec![("software".to_string(), method.software.clone())],
        confidence: 0.8,
        extracted_at: Local::now(),
        merge_count: existing.merge_count,
    };

    if let Some(resolution) = conflict::resolve(&existing, &new, ConflictStrategy::Merge) {
        let software = resolution
            .list_fields
            .iter()
            .find(|(k, _)| k == "software")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let q = query(
            "MATCH (m:Method {name: $name, method_type: $method_type}) \
             SET m.category = $category, m.software = $software, \
                 m.conflict_confidence = $confidence, m.conflict_merge_count = $merge_count",
        )
        .param("name", method.name.clone())
        .param("method_type", format!("{:?}", method.method_type))
        .param("category", resolution.description)
        .param("software", software)
        .param("confidence", resolution.confidence)
        .param("merge_count", resolution.merge_count as i64);
        run(txn, q).await?;
    }
    Ok(true)
}

async fn upsert_software(txn: &Txn, software_name: &str) -> AppResult<()> {
    let q = query(
        "MERGE (s:Software {software_name: $name}) \
         ON CREATE SET s.software_type = 'unspecified'",
    )
    .param("name", software_name.to_string());
    run(txn, q).await
}

async fn write_uses_software(txn: &Txn, software_name: &str, paper_id: &str) -> AppResult<()> {
    let q = query(
        "MATCH (s:Software {software_name: $name}), (p:Paper {paper_id: $paper_id}) \
         MERGE (p)-[:USES_SOFTWARE]->(s)",
    )
    .param("name", software_name.to_string())
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

#[allow(clippy::too_many_arguments)]
async fn write_uses_theory(
    txn: &Txn,
    theory_name: &str,
    paper_id: &str,
    role: TheoryRole,
    section: &str,
    usage_context: Option<&str>,
    confidence: f64,
    validation_status: crate::models::ValidationStatus,
) -> AppResult<()> {
    let q = query(
        "MATCH (t:Theory {name: $name}), (p:Paper {paper_id: $paper_id}) \
         MERGE (p)-[r:USES_THEORY]->(t) \
         SET r.role = $role, r.section = $section, r.usage_context = $usage_context, \
             r.confidence = $confidence, r.validation_status = $validation_status",
    )
    .param("name", theory_name.to_string())
    .param("paper_id", paper_id.to_string())
    .param("role", format!("{role:?}"))
    .param("section", section.to_string())
    .param("usage_context", usage_context.map(str::to_string))
    .param("confidence", confidence)
    .param("validation_status", format!("{validation_status:?}"));
    run(txn, q).await
}

/// Author→Theory cumulative mirror of `USES_THEORY` (§3.2, §4.6 step 4).
/// Keyed on `(author_id, theory_name)` with a `contributing_papers` list so
/// `paper_count` increments exactly once per paper even across
/// re-ingestions of the same paper (§9's flagged correctness hazard).
async fn write_author_uses_theory(
    txn: &Txn,
    author_id: &str,
    theory_name: &str,
    paper_id: &str,
    year: i32,
) -> AppResult<()> {
    let q = query(
        "MATCH (a:Author {author_id: $author_id}), (t:Theory {name: $theory_name}) \
         MERGE (a)-[r:USES_THEORY]->(t) \
         ON CREATE SET r.paper_count = 1, r.contributing_papers = [$paper_id], r.first_used_year = $year \
         ON MATCH SET \
           r.paper_count = CASE WHEN $paper_id IN r.contributing_papers THEN r.paper_count ELSE r.paper_count + 1 END, \
           r.contributing_papers = CASE WHEN $paper_id IN r.contributing_papers THEN r.contributing_papers ELSE r.contributing_papers + $paper_id END, \
           r.first_used_year = CASE WHEN r.first_used_year IS NULL OR $year < r.first_used_year THEN $year ELSE r.first_used_year END",
    )
    .param("author_id", author_id.to_string())
    .param("theory_name", theory_name.to_string())
    .param("paper_id", paper_id.to_string())
    .param("year", year as i64);
    run(txn, q).await
}

async fn write_studies_phenomenon(
    txn: &Txn,
    phenomenon_name: &str,
    paper_id: &str,
    section: &str,
    context: Option<&str>,
) -> AppResult<()> {
    let q = query(
        "MATCH (ph:Phenomenon {phenomenon_name: $name}), (p:Paper {paper_id: $paper_id}) \
         MERGE (p)-[r:STUDIES_PHENOMENON]->(ph) \
         SET r.section = $section, r.context = $context",
    )
    .param("name", phenomenon_name.to_string())
    .param("paper_id", paper_id.to_string())
    .param("section", section.to_string())
    .param("context", context.map(str::to_string));
    run(txn, q).await
}

/// Author→Phenomenon cumulative mirror of `STUDIES_PHENOMENON`, idempotent
/// under re-ingestion the same way as `write_author_uses_theory`.
async fn write_author_studies_phenomenon(
    txn: &Txn,
    author_id: &str,
    phenomenon_name: &str,
    paper_id: &str,
    year: i32,
) -> AppResult<()> {
    let q = query(
        "MATCH (a:Author {author_id: $author_id}), (ph:Phenomenon {phenomenon_name: $phenomenon_name}) \
         MERGE (a)-[r:STUDIES_PHENOMENON]->(ph) \
         ON CREATE SET r.paper_count = 1, r.contributing_papers = [$paper_id], r.first_used_year = $year \
         ON MATCH SET \
           r.paper_count = CASE WHEN $paper_id IN r.contributing_papers THEN r.paper_count ELSE r.paper_count + 1 END, \
           r.contributing_papers = CASE WHEN $paper_id IN r.contributing_papers THEN r.contributing_papers ELSE r.contributing_papers + $paper_id END, \
           r.first_used_year = CASE WHEN r.first_used_year IS NULL OR $year < r.first_used_year THEN $year ELSE r.first_used_year END",
    )
    .param("author_id", author_id.to_string())
    .param("phenomenon_name", phenomenon_name.to_string())
    .param("paper_id", paper_id.to_string())
    .param("year", year as i64);
    run(txn, q).await
}

async fn write_uses_method(
    txn: &Txn,
    method_name: &str,
    method_type: crate::models::MethodType,
    paper_id: &str,
    confidence: f64,
) -> AppResult<()> {
    let q = query(
        "MATCH (m:Method {name: $name, method_type: $method_type}), (p:Paper {paper_id: $paper_id}) \
         MERGE (p)-[r:USES_METHOD]->(m) SET r.confidence = $confidence",
    )
    .param("name", method_name.to_string())
    .param("method_type", format!("{method_type:?}"))
    .param("paper_id", paper_id.to_string())
    .param("confidence", confidence);
    run(txn, q).await
}

async fn write_variable(
    txn: &Txn,
    paper_id: &str,
    validated: &validator::ValidatedVariable,
) -> AppResult<()> {
    let v = &validated.variable;
    let q = query(
        "MERGE (v:Variable {variable_id: $variable_id}) \
         SET v.variable_name = $variable_name, v.variable_type = $variable_type, \
             v.measurement = $measurement, v.operationalization = $operationalization \
         WITH v \
         MATCH (p:Paper {paper_id: $paper_id}) \
         MERGE (p)-[r:USES_VARIABLE]->(v) SET r.variable_type = $variable_type",
    )
    .param("variable_id", v.variable_id.clone())
    .param("variable_name", v.variable_name.clone())
    .param("variable_type", format!("{:?}", v.variable_type))
    .param("measurement", v.measurement.clone())
    .param("operationalization", v.operationalization.clone())
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

async fn write_finding(txn: &Txn, paper_id: &str, finding: &crate::models::Finding) -> AppResult<()> {
    let q = query(
        "MERGE (f:Finding {finding_id: $finding_id}) \
         SET f.finding_text = $finding_text, f.finding_type = $finding_type, \
             f.significance = $significance, f.effect_size = $effect_size, f.section = $section \
         WITH f \
         MATCH (p:Paper {paper_id: $paper_id}) MERGE (p)-[:REPORTS]->(f)",
    )
    .param("finding_id", finding.finding_id.clone())
    .param("finding_text", finding.finding_text.clone())
    .param("finding_type", format!("{:?}", finding.finding_type))
    .param("significance", finding.significance.clone())
    .param("effect_size", finding.effect_size)
    .param("section", finding.section.clone())
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

async fn write_contribution(
    txn: &Txn,
    paper_id: &str,
    contribution: &crate::models::Contribution,
) -> AppResult<()> {
    let q = query(
        "MERGE (c:Contribution {contribution_id: $contribution_id}) \
         SET c.contribution_text = $contribution_text, c.contribution_type = $contribution_type, \
             c.section = $section \
         WITH c \
         MATCH (p:Paper {paper_id: $paper_id}) MERGE (p)-[:MAKES]->(c)",
    )
    .param("contribution_id", contribution.contribution_id.clone())
    .param("contribution_text", contribution.contribution_text.clone())
    .param(
        "contribution_type",
        format!("{:?}", contribution.contribution_type),
    )
    .param("section", contribution.section.clone())
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

async fn write_research_question(
    txn: &Txn,
    paper_id: &str,
    rq: &crate::models::ResearchQuestion,
) -> AppResult<()> {
    let q = query(
        "MERGE (q:ResearchQuestion {question_id: $question_id}) \
         SET q.question = $question, q.question_type = $question_type, q.section = $section \
         WITH q \
         MATCH (p:Paper {paper_id: $paper_id}) MERGE (p)-[:ADDRESSES]->(q)",
    )
    .param("question_id", rq.question_id.clone())
    .param("question", rq.question.clone())
    .param("question_type", format!("{:?}", rq.question_type))
    .param("section", rq.section.clone())
    .param("paper_id", paper_id.to_string());
    run(txn, q).await
}

fn prefix_lower(s: &str, len: usize) -> String {
    s.chars().take(len).collect::<String>().to_lowercase()
}

/// Resolve one extracted citation against existing `Paper` titles: exact
/// (case-insensitive) title match scores 1.0, a bidirectional containment
/// check on the first `CITATION_PREFIX_LEN` characters scores 0.7, and
/// anything else goes unresolved and is not created as a placeholder
/// (§4.6 step 8).
async fn resolve_citation(
    txn: &Txn,
    citing_paper_id: &str,
    cited_title: &str,
) -> AppResult<Option<(String, f64)>> {
    if cited_title.trim().is_empty() {
        return Ok(None);
    }

    let q = query(
        "MATCH (other:Paper) WHERE other.paper_id <> $paper_id AND other.title <> '' \
         RETURN other.paper_id AS paper_id, other.title AS title",
    )
    .param("paper_id", citing_paper_id.to_string());

    let mut stream = txn
        .execute(q)
        .await
        .map_err(|e| AppError::GraphConflict(e.to_string()))?;

    let target = cited_title.trim().to_lowercase();
    let target_prefix = prefix_lower(cited_title, CITATION_PREFIX_LEN);
    let mut fuzzy_match: Option<String> = None;

    while let Some(row) = stream
        .next()
        .await
        .map_err(|e| AppError::GraphConflict(e.to_string()))?
    {
        let other_id: String = row.get("paper_id").unwrap_or_default();
        let other_title: String = row.get("title").unwrap_or_default();
        if other_title.trim().to_lowercase() == target {
            return Ok(Some((other_id, 1.0)));
        }
        if fuzzy_match.is_none() {
            let other_prefix = prefix_lower(&other_title, CITATION_PREFIX_LEN);
            if !other_prefix.is_empty()
                && !target_prefix.is_empty()
                && (other_prefix.contains(&target_prefix) || target_prefix.contains(&other_prefix))
            {
                fuzzy_match = Some(other_id);
            }
        }
    }

    Ok(fuzzy_match.map(|id| (id, 0.7)))
}

async fn write_cites(
    txn: &Txn,
    citing_paper_id: &str,
    cited_paper_id: &str,
    citation_type: crate::models::CitationType,
    section: &str,
    confidence: f64,
) -> AppResult<()> {
    let q = query(
        "MATCH (citing:Paper {paper_id: $citing_id}), (cited:Paper {paper_id: $cited_id}) \
         MERGE (citing)-[r:CITES {paper_id: $citing_id}]->(cited) \
         SET r.citation_type = $citation_type, r.section = $section, r.confidence = $confidence",
    )
    .param("citing_id", citing_paper_id.to_string())
    .param("cited_id", cited_paper_id.to_string())
    .param("citation_type", format!("{citation_type:?}"))
    .param("section", section.to_string())
    .param("confidence", confidence);
    run(txn, q).await
}

/// Compute and write `EXPLAINS_PHENOMENON` edges for every theory/phenomenon
/// pair co-occurring in this paper whose connection strength clears
/// `MIN_CONNECTION_STRENGTH` (§4.8). Explicit links from the extractor's
/// `theory_phenomenon_links` output add the `explicit_bonus` factor.
async fn write_explains_phenomenon(
    txn: &Txn,
    paper_id: &str,
    theories: &[(String, TheoryRole, String, Option<String>)],
    phenomena: &[(String, String, Option<String>, Option<String>)],
    explicit_links: &[RawTheoryPhenomenonLink],
) -> AppResult<u64> {
    let explicit_pairs: Vec<(String, String)> = explicit_links
        .iter()
        .filter_map(validator::validate_theory_phenomenon_link)
        .collect();

    let mut written = 0u64;
    for (theory_name, role, theory_section, usage_context) in theories {
        for (phenomenon_name, phenomenon_section, context, description) in phenomena {
            let explicit = explicit_pairs
                .iter()
                .any(|(t, p)| t == theory_name && p == phenomenon_name);

            let inputs = ConnectionInputs {
                theory_role: *role,
                theory_section,
                phenomenon_section,
                theory_usage_context: usage_context.as_deref().unwrap_or(""),
                phenomenon_description: description.as_deref().unwrap_or(""),
                phenomenon_context: context.as_deref().unwrap_or(""),
                theory_embedding: None,
                phenomenon_embedding: None,
                explicit_link: explicit,
            };
            let factors: ConnectionFactors = connection_strength::compute_factors(&inputs);
            let strength = factors.connection_strength();
            if strength < MIN_CONNECTION_STRENGTH {
                continue;
            }
            // Persist the *weighted* contributions, not the raw factors, so
            // the persisted sub-scores sum to `connection_strength` (§3.3,
            // §8) — the fixed weights in `ConnectionFactors::weighted` make
            // the raw per-factor scores recoverable for re-weighing (§4.8).
            let weighted = factors.weighted();

            let q = query(
                "MATCH (t:Theory {name: $theory_name}), (ph:Phenomenon {phenomenon_name: $phenomenon_name}) \
                 MERGE (t)-[r:EXPLAINS_PHENOMENON {paper_id: $paper_id}]->(ph) \
                 SET r.theory_role = $role, r.section = $section, r.connection_strength = $strength, \
                     r.role_weight = $role_weight, r.section_score = $section_score, \
                     r.keyword_score = $keyword_score, r.semantic_score = $semantic_score, \
                     r.explicit_bonus = $explicit_bonus",
            )
            .param("theory_name", theory_name.clone())
            .param("phenomenon_name", phenomenon_name.clone())
            .param("paper_id", paper_id.to_string())
            .param("role", format!("{role:?}"))
            .param("section", theory_section.clone())
            .param("strength", strength)
            .param("role_weight", weighted.role_weight)
            .param("section_score", weighted.section_score)
            .param("keyword_score", weighted.keyword_score)
            .param("semantic_score", weighted.semantic_score)
            .param("explicit_bonus", weighted.explicit_bonus);

            run(txn, q).await?;
            written += 1;
        }
    }
    Ok(written)
}

async fn run(txn: &Txn, q: Query) -> AppResult<()> {
    txn.run(q)
        .await
        .map_err(|e| AppError::GraphConflict(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraints_cover_every_unique_identity_field() {
        assert!(CONSTRAINTS.iter().any(|c| c.contains("paper_id")));
        assert!(CONSTRAINTS.iter().any(|c| c.contains("theory_name")));
        assert!(CONSTRAINTS.iter().any(|c| c.contains("software_name")));
        assert!(CONSTRAINTS.iter().any(|c| c.contains("dataset_name")));
        assert!(CONSTRAINTS.iter().any(|c| c.contains("topic_id")));
        assert!(CONSTRAINTS
            .iter()
            .any(|c| c.contains("m.name, m.method_type")));
        assert_eq!(CONSTRAINTS.len(), 13);
    }

    #[test]
    fn citation_prefix_matching_is_case_insensitive() {
        let a = prefix_lower("The Resource-Based View Revisited", CITATION_PREFIX_LEN);
        let b = prefix_lower("the resource-based view revisited and extended", CITATION_PREFIX_LEN);
        assert!(a.contains(&b) || b.contains(&a));
    }
}
