//! Data model for the scholarly knowledge graph.
//!
//! Node and relationship shapes follow the node/relationship kinds table of
//! the domain schema: one `Paper` node per ingested PDF, canonical entity
//! nodes (Theory/Phenomenon/Method/Software/Dataset) shared across papers,
//! and paper-scoped entities (Variable/Finding/Contribution/ResearchQuestion)
//! keyed by a stable hash of `(paper_id, text)`.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Computes a stable, deterministic id from an arbitrary number of parts.
///
/// Used for entities whose identity is derived rather than extracted
/// (`Variable.variable_id`, `Finding.finding_id`, `Contribution.contribution_id`,
/// `ResearchQuestion.question_id`, and the deterministic `Author.author_id`).
pub fn stable_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())[..16].to_string()
}

/// Paper type, per the domain schema's `paper_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaperType {
    EmpiricalQuantitative,
    EmpiricalQualitative,
    Theoretical,
    Review,
    MetaAnalysis,
    #[default]
    ResearchNote,
}

/// Theory kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TheoryType {
    Framework,
    Concept,
    #[default]
    Model,
    Perspective,
}

/// Phenomenon kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhenomenonType {
    Behavior,
    #[default]
    Pattern,
    Event,
    Trend,
    Process,
    Outcome,
}

/// Level at which a phenomenon is studied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOfAnalysis {
    Individual,
    Team,
    Organization,
    Industry,
    Economy,
    MultiLevel,
}

/// Research method kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MethodType {
    #[default]
    Quantitative,
    Qualitative,
    Mixed,
    Computational,
    Experimental,
}

/// Role a variable plays in a study's design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    #[default]
    Dependent,
    Independent,
    Control,
    Moderator,
    Mediator,
    Instrumental,
}

/// Finding kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    HypothesisSupported,
    HypothesisRejected,
    #[default]
    Unexpected,
    Exploratory,
}

/// Contribution kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    #[default]
    Theoretical,
    Empirical,
    Methodological,
    Practical,
}

/// Research question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    Descriptive,
    Explanatory,
    Predictive,
    Prescriptive,
    Exploratory,
}

/// Role of a theory's use within one paper (`USES_THEORY.role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TheoryRole {
    #[default]
    Primary,
    Supporting,
    Challenging,
    Extending,
}

impl TheoryRole {
    /// `role_weight` factor used by the connection-strength function (§4.8).
    pub fn role_weight(&self) -> f64 {
        match self {
            TheoryRole::Primary => 1.0,
            TheoryRole::Supporting => 0.6,
            TheoryRole::Extending => 0.4,
            TheoryRole::Challenging => 0.2,
        }
    }
}

/// Whether/how an extracted entity was confirmed against the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    ExactMatch,
    PartialMatch,
    WeakMatch,
    AbbreviationMatch,
    NotFound,
    #[default]
    NotValidated,
}

/// Kind of citation relationship between two papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    #[default]
    Supporting,
    Contrasting,
    Extending,
    Background,
}

// ---------------------------------------------------------------------
// Node kinds (§3.1)
// ---------------------------------------------------------------------

/// A single ingested research paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub publication_year: i32,
    pub journal: String,
    pub doi: String,
    pub keywords: Vec<String>,
    pub paper_type: PaperType,
    pub embedding: Option<Vec<f32>>,
}

impl Paper {
    /// Minimal fallback record used when metadata validation fails
    /// (§4.4 "Paper metadata validation never drops a paper").
    pub fn minimal(paper_id: &str) -> Self {
        let year = paper_id
            .split('_')
            .next()
            .and_then(|y| y.parse::<i32>().ok())
            .unwrap_or(0);
        Self {
            paper_id: paper_id.to_string(),
            title: format!("Paper {}", paper_id),
            abstract_text: String::new(),
            publication_year: year,
            journal: String::new(),
            doi: String::new(),
            keywords: Vec::new(),
            paper_type: PaperType::default(),
            embedding: None,
        }
    }
}

/// An author of one or more papers.
///
/// Identity is deterministic from `family_name` + `given_name`, falling back
/// to `full_name` when the name could not be split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub author_id: String,
    pub full_name: String,
    pub given_name: String,
    pub family_name: String,
    pub orcid: Option<String>,
    pub email: Option<String>,
}

impl Author {
    pub fn new(full_name: &str, given_name: &str, family_name: &str) -> Self {
        let author_id = if !family_name.is_empty() || !given_name.is_empty() {
            stable_hash(&[
                "author",
                &family_name.to_lowercase(),
                &given_name.to_lowercase(),
            ])
        } else {
            stable_hash(&["author", &full_name.to_lowercase()])
        };
        Self {
            author_id,
            full_name: full_name.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            orcid: None,
            email: None,
        }
    }
}

/// An institutional affiliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub institution_id: String,
    pub institution_name: String,
    pub department: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Institution {
    pub fn new(institution_name: &str) -> Self {
        Self {
            institution_id: stable_hash(&["institution", &institution_name.to_lowercase()]),
            institution_name: institution_name.to_string(),
            department: None,
            city: None,
            country: None,
        }
    }
}

/// A canonical theoretical framework, concept, model, or perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theory {
    pub name: String,
    pub domain: String,
    pub theory_type: TheoryType,
    pub description: Option<String>,
    pub original_name: String,
    pub embedding: Option<Vec<f32>>,
}

/// A canonical observed behavior, pattern, event, trend, process, or outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phenomenon {
    pub phenomenon_name: String,
    pub phenomenon_type: PhenomenonType,
    pub domain: String,
    pub description: Option<String>,
    pub level_of_analysis: Option<LevelOfAnalysis>,
    pub embedding: Option<Vec<f32>>,
}

/// A canonical research method, keyed by `(name, type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub method_type: MethodType,
    pub category: Option<String>,
    pub software: Vec<String>,
    pub sample_size: Option<i64>,
    pub time_period: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

/// A variable measured or controlled for within one paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub variable_id: String,
    pub variable_name: String,
    pub variable_type: VariableType,
    pub measurement: Option<String>,
    pub operationalization: Option<String>,
}

impl Variable {
    pub fn new(paper_id: &str, variable_name: &str, variable_type: VariableType) -> Self {
        Self {
            variable_id: stable_hash(&["variable", paper_id, variable_name]),
            variable_name: variable_name.to_string(),
            variable_type,
            measurement: None,
            operationalization: None,
        }
    }
}

/// A reported result within one paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub finding_id: String,
    pub finding_text: String,
    pub finding_type: FindingType,
    pub significance: Option<String>,
    pub effect_size: Option<f64>,
    pub section: Option<String>,
}

impl Finding {
    pub fn new(paper_id: &str, finding_text: &str, finding_type: FindingType) -> Self {
        Self {
            finding_id: stable_hash(&["finding", paper_id, finding_text]),
            finding_text: finding_text.to_string(),
            finding_type,
            significance: None,
            effect_size: None,
            section: None,
        }
    }
}

/// A claimed contribution within one paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub contribution_id: String,
    pub contribution_text: String,
    pub contribution_type: ContributionType,
    pub section: Option<String>,
}

impl Contribution {
    pub fn new(
        paper_id: &str,
        contribution_text: &str,
        contribution_type: ContributionType,
    ) -> Self {
        Self {
            contribution_id: stable_hash(&["contribution", paper_id, contribution_text]),
            contribution_text: contribution_text.to_string(),
            contribution_type,
            section: None,
        }
    }
}

/// A canonical software package used by a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Software {
    pub software_name: String,
    pub version: Option<String>,
    pub software_type: String,
}

/// A canonical dataset used by a study.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_name: String,
    pub dataset_type: String,
    pub time_period: Option<String>,
    pub sample_size: Option<i64>,
    pub access: Option<String>,
}

/// A research question addressed within one paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub question_id: String,
    pub question: String,
    pub question_type: QuestionType,
    pub section: Option<String>,
}

impl ResearchQuestion {
    pub fn new(paper_id: &str, question: &str, question_type: QuestionType) -> Self {
        Self {
            question_id: stable_hash(&["question", paper_id, question]),
            question: question.to_string(),
            question_type,
            section: None,
        }
    }
}

/// A post-hoc topic cluster (produced by `compute-relationships`/topic
/// modeling, not by the per-paper ingestion pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub topic_id: String,
    pub interval: String,
    pub paper_count: i64,
    pub coherence: f64,
    pub representative_paper_id: String,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------
// Relationship kinds (§3.2)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authored {
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliatedWith {
    pub affiliation_type: String,
    pub position_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsesTheory {
    pub paper_id: String,
    pub role: TheoryRole,
    pub section: String,
    pub usage_context: Option<String>,
    pub confidence: f64,
    pub validation_status: ValidationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsesMethod {
    pub paper_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudiesPhenomenon {
    pub paper_id: String,
    pub section: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsesVariable {
    pub paper_id: String,
    pub variable_type: VariableType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cites {
    pub paper_id: String,
    pub citation_type: CitationType,
    pub section: String,
    pub confidence: f64,
}

/// Per-factor breakdown persisted alongside `connection_strength` (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectionFactors {
    pub role_weight: f64,
    pub section_score: f64,
    pub keyword_score: f64,
    pub semantic_score: f64,
    pub explicit_bonus: f64,
}

impl ConnectionFactors {
    const W_ROLE: f64 = 0.25;
    const W_SECTION: f64 = 0.15;
    const W_KEYWORD: f64 = 0.25;
    const W_SEMANTIC: f64 = 0.25;
    const W_EXPLICIT: f64 = 0.10;

    /// Weighted sum; weights sum to 1 and are fixed by the spec.
    pub fn connection_strength(&self) -> f64 {
        (self.role_weight * Self::W_ROLE
            + self.section_score * Self::W_SECTION
            + self.keyword_score * Self::W_KEYWORD
            + self.semantic_score * Self::W_SEMANTIC
            + self.explicit_bonus * Self::W_EXPLICIT)
            .min(1.0)
    }

    /// The five weighted contributions, in the same field shape as `self`,
    /// that sum to `connection_strength` (§3.3, §8: "the persisted factor
    /// sub-scores sum to connection_strength"). This is what the ingester
    /// persists on the `EXPLAINS_PHENOMENON` edge instead of the raw,
    /// pre-weighting factors; the fixed weights above make the raw factors
    /// recoverable (divide a persisted value back out by its weight), so
    /// downstream analytics can still re-weigh per §4.8.
    pub fn weighted(&self) -> ConnectionFactors {
        ConnectionFactors {
            role_weight: self.role_weight * Self::W_ROLE,
            section_score: self.section_score * Self::W_SECTION,
            keyword_score: self.keyword_score * Self::W_KEYWORD,
            semantic_score: self.semantic_score * Self::W_SEMANTIC,
            explicit_bonus: self.explicit_bonus * Self::W_EXPLICIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainsPhenomenon {
    pub paper_id: String,
    pub theory_role: TheoryRole,
    pub section: String,
    pub connection_strength: f64,
    pub factors: ConnectionFactors,
}

// ---------------------------------------------------------------------
// Raw extraction shapes — loosely-typed LLM output (§4.3/§9)
// ---------------------------------------------------------------------
//
// Field names mirror the variance the LLM actually produces (`name` vs.
// `theory_name`, string confidence levels, etc). The validator's coercion
// pass (src/validator.rs) maps these into the strict node/edge types above;
// these structs stay intentionally permissive.

fn default_confidence() -> f64 {
    0.8
}

/// Loosely-typed metadata extraction (extraction call 1 of combined mode).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub paper_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub affiliations: Vec<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTheory {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub theory_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub usage_context: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub theory_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Set by the extractor's source-grounded validation pass (§4.3 stage 5),
    /// never part of the LLM's own JSON output.
    #[serde(skip, default)]
    pub validation_status: ValidationStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPhenomenon {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phenomenon_name: Option<String>,
    #[serde(default)]
    pub phenomenon_type: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub level_of_analysis: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTheoryPhenomenonLink {
    #[serde(default)]
    pub theory: Option<String>,
    #[serde(default)]
    pub theory_name: Option<String>,
    #[serde(default)]
    pub phenomenon: Option<String>,
    #[serde(default)]
    pub phenomenon_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMethod {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub method_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub software: Vec<String>,
    #[serde(default)]
    pub sample_size: Option<i64>,
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawVariable {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub variable_type: Option<String>,
    #[serde(default)]
    pub measurement: Option<String>,
    #[serde(default)]
    pub operationalization: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFinding {
    #[serde(default)]
    pub finding_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finding_type: Option<String>,
    #[serde(default)]
    pub significance: Option<String>,
    #[serde(default)]
    pub effect_size: Option<f64>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContribution {
    #[serde(default)]
    pub contribution_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub contribution_type: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawResearchQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCitation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cited_title: Option<String>,
    #[serde(default)]
    pub citation_type: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// Total (never-partial) result of running the multi-stage extractor on one
/// PDF. Every list defaults to empty so downstream code never has to
/// special-case a missing extraction call (§4.3 step 5: "the result must
/// always be a total value").
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractionResult {
    pub paper_id: String,
    #[serde(default)]
    pub metadata: RawMetadata,
    #[serde(default)]
    pub authors: Vec<RawAuthor>,
    #[serde(default)]
    pub theories: Vec<RawTheory>,
    #[serde(default)]
    pub phenomena: Vec<RawPhenomenon>,
    #[serde(default)]
    pub theory_phenomenon_links: Vec<RawTheoryPhenomenonLink>,
    #[serde(default)]
    pub methods: Vec<RawMethod>,
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    #[serde(default)]
    pub findings: Vec<RawFinding>,
    #[serde(default)]
    pub contributions: Vec<RawContribution>,
    #[serde(default)]
    pub research_questions: Vec<RawResearchQuestion>,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
    pub extracted_at: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_hash_is_deterministic() {
        let a = stable_hash(&["variable", "1999_001", "Firm Performance"]);
        let b = stable_hash(&["variable", "1999_001", "Firm Performance"]);
        assert_eq!(a, b);
        let c = stable_hash(&["variable", "1999_001", "ROA"]);
        assert_ne!(a, c);
    }

    #[test]
    fn author_id_prefers_family_given_name() {
        let a1 = Author::new("Jay Barney", "Jay", "Barney");
        let a2 = Author::new("J. Barney", "J.", "Barney");
        assert_ne!(a1.author_id, a2.author_id);

        let a3 = Author::new("Jay Barney", "Jay", "Barney");
        assert_eq!(a1.author_id, a3.author_id);
    }

    #[test]
    fn author_id_falls_back_to_full_name() {
        let a = Author::new("Anonymous Reviewer", "", "");
        assert_eq!(a.author_id, stable_hash(&["author", "anonymous reviewer"]));
    }

    #[test]
    fn paper_minimal_extracts_year_from_id() {
        let p = Paper::minimal("1999_001");
        assert_eq!(p.publication_year, 1999);
        assert_eq!(p.title, "Paper 1999_001");
    }

    #[test]
    fn connection_factors_weighted_sum_in_range() {
        let f = ConnectionFactors {
            role_weight: 1.0,
            section_score: 1.0,
            keyword_score: 1.0,
            semantic_score: 1.0,
            explicit_bonus: 1.0,
        };
        let s = f.connection_strength();
        assert!((0.0..=1.0).contains(&s));
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn connection_factors_weighted_contributions_sum_to_strength() {
        let f = ConnectionFactors {
            role_weight: 0.6,
            section_score: 1.0,
            keyword_score: 0.4,
            semantic_score: 0.7,
            explicit_bonus: 0.2,
        };
        let strength = f.connection_strength();
        let w = f.weighted();
        let sum = w.role_weight + w.section_score + w.keyword_score + w.semantic_score + w.explicit_bonus;
        assert!((sum - strength).abs() < 1e-9);
    }
}
