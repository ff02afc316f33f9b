//! Declarative per-entity validation: field coercion followed by a schema
//! check (§4.4).
//!
//! The LLM output is loosely typed (`models::Raw*`): field names vary
//! (`name` vs. `theory_name`), confidence sometimes arrives as a string
//! ("High"/"Medium"/"Low") rather than a number, and enum-typed fields may
//! use a synonym the domain schema doesn't recognize. Coercion is a total
//! function from "loose record" to "strict record" (per the design notes'
//! "loose record -> strict record" guidance) — never a dispatch mechanism,
//! just a per-field pick-first-present plus a parse/default step.
//!
//! A validated entity without a usable identity field (empty name/text) has
//! nothing for the ingester to write, so it is represented as `None` rather
//! than a record with an empty primary key; this realizes §7's "offending
//! entity is dropped" without ever losing the paper itself.

use crate::models::{
    Contribution, ContributionType, CitationType, Finding, FindingType, LevelOfAnalysis, Method,
    MethodType, Paper, PaperType, Phenomenon, PhenomenonType, QuestionType, RawAuthor,
    RawCitation, RawContribution, RawFinding, RawMetadata, RawMethod, RawPhenomenon,
    RawResearchQuestion, RawTheory, RawTheoryPhenomenonLink, RawVariable, ResearchQuestion,
    Theory, TheoryRole, TheoryType, ValidationStatus, VariableType, Variable,
};

/// Parse a confidence value coming from an LLM that may have produced a
/// string level instead of a number. Missing/unparseable confidence
/// defaults to 0.8 (§4.4 step 1).
pub fn coerce_confidence(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

/// Parse a confidence value that arrived as a free-form string
/// (`"High"`/`"Medium"`/`"Low"` or a numeric string like `"0.9"`).
pub fn coerce_confidence_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return v.clamp(0.0, 1.0);
    }
    match trimmed.to_lowercase().as_str() {
        "high" | "very high" => 0.9,
        "medium" | "moderate" => 0.7,
        "low" => 0.4,
        _ => 0.8,
    }
}

fn first_nonempty(options: &[Option<&str>]) -> Option<String> {
    options
        .iter()
        .filter_map(|o| *o)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Infer `MethodType` from the method's own name when the LLM omitted or
/// misspelled the field (§4.4 step 1, "surface-level keyword match").
pub fn infer_method_type(name: &str) -> MethodType {
    let lower = name.to_lowercase();
    const QUANT_KEYWORDS: &[&str] = &[
        "regression", "ols", "panel", "survey", "econometric", "statistical", "logit", "probit",
        "anova", "structural equation",
    ];
    const QUAL_KEYWORDS: &[&str] = &["interview", "case study", "ethnograph", "grounded theory", "qualitative"];
    const COMPUTATIONAL_KEYWORDS: &[&str] = &["simulation", "agent-based", "computational", "machine learning", "algorithm"];
    const EXPERIMENTAL_KEYWORDS: &[&str] = &["experiment", "randomized", "lab study", "vignette"];
    const MIXED_KEYWORDS: &[&str] = &["mixed method", "mixed-method"];

    if MIXED_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MethodType::Mixed
    } else if EXPERIMENTAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MethodType::Experimental
    } else if COMPUTATIONAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MethodType::Computational
    } else if QUAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MethodType::Qualitative
    } else if QUANT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MethodType::Quantitative
    } else {
        MethodType::default()
    }
}

fn parse_paper_type(raw: Option<&str>) -> PaperType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("empirical_quantitative") | Some("quantitative") => PaperType::EmpiricalQuantitative,
        Some("empirical_qualitative") | Some("qualitative") => PaperType::EmpiricalQualitative,
        Some("theoretical") => PaperType::Theoretical,
        Some("review") => PaperType::Review,
        Some("meta_analysis") | Some("meta-analysis") => PaperType::MetaAnalysis,
        Some("research_note") => PaperType::ResearchNote,
        _ => PaperType::default(),
    }
}

fn parse_theory_type(raw: Option<&str>) -> TheoryType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("framework") => TheoryType::Framework,
        Some("concept") => TheoryType::Concept,
        Some("model") => TheoryType::Model,
        Some("perspective") => TheoryType::Perspective,
        _ => TheoryType::default(),
    }
}

fn parse_theory_role(raw: Option<&str>) -> TheoryRole {
    match raw.map(str::to_lowercase).as_deref() {
        Some("primary") => TheoryRole::Primary,
        Some("supporting") => TheoryRole::Supporting,
        Some("challenging") => TheoryRole::Challenging,
        Some("extending") => TheoryRole::Extending,
        _ => TheoryRole::default(),
    }
}

fn parse_phenomenon_type(raw: Option<&str>) -> PhenomenonType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("behavior") => PhenomenonType::Behavior,
        Some("pattern") => PhenomenonType::Pattern,
        Some("event") => PhenomenonType::Event,
        Some("trend") => PhenomenonType::Trend,
        Some("process") => PhenomenonType::Process,
        Some("outcome") => PhenomenonType::Outcome,
        _ => PhenomenonType::default(),
    }
}

fn parse_level_of_analysis(raw: Option<&str>) -> Option<LevelOfAnalysis> {
    match raw.map(str::to_lowercase).as_deref() {
        Some("individual") => Some(LevelOfAnalysis::Individual),
        Some("team") => Some(LevelOfAnalysis::Team),
        Some("organization") => Some(LevelOfAnalysis::Organization),
        Some("industry") => Some(LevelOfAnalysis::Industry),
        Some("economy") => Some(LevelOfAnalysis::Economy),
        Some("multi_level") | Some("multi-level") => Some(LevelOfAnalysis::MultiLevel),
        _ => None,
    }
}

fn parse_method_type(raw: Option<&str>, name: &str) -> MethodType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("quantitative") => MethodType::Quantitative,
        Some("qualitative") => MethodType::Qualitative,
        Some("mixed") => MethodType::Mixed,
        Some("computational") => MethodType::Computational,
        Some("experimental") => MethodType::Experimental,
        _ => infer_method_type(name),
    }
}

fn parse_variable_type(raw: Option<&str>) -> VariableType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("dependent") => VariableType::Dependent,
        Some("independent") => VariableType::Independent,
        Some("control") => VariableType::Control,
        Some("moderator") => VariableType::Moderator,
        Some("mediator") => VariableType::Mediator,
        Some("instrumental") => VariableType::Instrumental,
        _ => VariableType::default(),
    }
}

fn parse_finding_type(raw: Option<&str>) -> FindingType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("hypothesis_supported") => FindingType::HypothesisSupported,
        Some("hypothesis_rejected") => FindingType::HypothesisRejected,
        Some("unexpected") => FindingType::Unexpected,
        Some("exploratory") => FindingType::Exploratory,
        _ => FindingType::default(),
    }
}

fn parse_contribution_type(raw: Option<&str>) -> ContributionType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("theoretical") => ContributionType::Theoretical,
        Some("empirical") => ContributionType::Empirical,
        Some("methodological") => ContributionType::Methodological,
        Some("practical") => ContributionType::Practical,
        _ => ContributionType::default(),
    }
}

fn parse_question_type(raw: Option<&str>) -> QuestionType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("descriptive") => QuestionType::Descriptive,
        Some("explanatory") => QuestionType::Explanatory,
        Some("predictive") => QuestionType::Predictive,
        Some("prescriptive") => QuestionType::Prescriptive,
        Some("exploratory") => QuestionType::Exploratory,
        _ => QuestionType::default(),
    }
}

fn parse_citation_type(raw: Option<&str>) -> CitationType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("supporting") => CitationType::Supporting,
        Some("contrasting") => CitationType::Contrasting,
        Some("extending") => CitationType::Extending,
        Some("background") => CitationType::Background,
        _ => CitationType::default(),
    }
}

/// Coerced paper metadata. Never fails: a missing title falls back to
/// `Paper::minimal` per §4.4's "Paper metadata validation never drops a
/// paper."
pub fn validate_metadata(paper_id: &str, raw: &RawMetadata) -> Paper {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let Some(title) = title else {
        return Paper::minimal(paper_id);
    };

    let year = raw
        .publication_year
        .unwrap_or_else(|| Paper::minimal(paper_id).publication_year);

    Paper {
        paper_id: paper_id.to_string(),
        title: title.to_string(),
        abstract_text: raw.abstract_text.clone().unwrap_or_default(),
        publication_year: year,
        journal: raw
            .journal
            .clone()
            .unwrap_or_else(|| "Strategic Management Journal".to_string()),
        doi: raw.doi.clone().unwrap_or_default(),
        keywords: raw.keywords.clone(),
        paper_type: parse_paper_type(raw.paper_type.as_deref()),
        embedding: None,
    }
}

/// A coerced author plus its up-to-3 affiliation strings (unnormalized;
/// `Ingester` upserts one `Institution` per affiliation).
pub struct ValidatedAuthor {
    pub full_name: String,
    pub given_name: String,
    pub family_name: String,
    pub affiliations: Vec<String>,
    pub position: i32,
}

pub fn validate_author(position: i32, raw: &RawAuthor) -> Option<ValidatedAuthor> {
    let full_name = first_nonempty(&[raw.full_name.as_deref(), raw.name.as_deref()])?;

    let (given, family) = split_name(&full_name, raw.given_name.as_deref(), raw.family_name.as_deref());

    let mut affiliations: Vec<String> = raw.affiliations.clone();
    if let Some(a) = raw.affiliation.as_deref().filter(|s| !s.trim().is_empty()) {
        affiliations.push(a.to_string());
    }
    affiliations.retain(|a| !a.trim().is_empty());

    Some(ValidatedAuthor {
        full_name,
        given_name: given,
        family_name: family,
        affiliations,
        position: raw.position.unwrap_or(position),
    })
}

fn split_name(full_name: &str, given: Option<&str>, family: Option<&str>) -> (String, String) {
    if let (Some(g), Some(f)) = (given, family) {
        if !g.trim().is_empty() && !f.trim().is_empty() {
            return (g.trim().to_string(), f.trim().to_string());
        }
    }
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.len() {
        0 => (String::new(), String::new()),
        1 => (String::new(), parts[0].to_string()),
        _ => (
            parts[..parts.len() - 1].join(" "),
            parts[parts.len() - 1].to_string(),
        ),
    }
}

/// A coerced theory plus the `USES_THEORY` edge fields carried alongside it.
pub struct ValidatedTheory {
    pub theory: Theory,
    pub role: TheoryRole,
    pub section: String,
    pub usage_context: Option<String>,
    pub confidence: f64,
    pub validation_status: ValidationStatus,
}

pub fn validate_theory(raw: &RawTheory) -> Option<ValidatedTheory> {
    let name = first_nonempty(&[raw.theory_name.as_deref(), raw.name.as_deref()])?;
    Some(ValidatedTheory {
        theory: Theory {
            name: name.clone(),
            domain: raw.domain.clone().unwrap_or_default(),
            theory_type: parse_theory_type(raw.theory_type.as_deref()),
            description: raw.description.clone().filter(|s| !s.is_empty()),
            original_name: name,
            embedding: None,
        },
        role: parse_theory_role(raw.role.as_deref()),
        section: raw.section.clone().unwrap_or_default(),
        usage_context: raw.usage_context.clone().filter(|s| !s.is_empty()),
        confidence: coerce_confidence(raw.confidence),
        validation_status: raw.validation_status,
    })
}

pub struct ValidatedPhenomenon {
    pub phenomenon: Phenomenon,
    pub section: String,
    pub context: Option<String>,
    pub confidence: f64,
}

pub fn validate_phenomenon(raw: &RawPhenomenon) -> Option<ValidatedPhenomenon> {
    let name = first_nonempty(&[raw.phenomenon_name.as_deref(), raw.name.as_deref()])?;
    Some(ValidatedPhenomenon {
        phenomenon: Phenomenon {
            phenomenon_name: name,
            phenomenon_type: parse_phenomenon_type(raw.phenomenon_type.as_deref()),
            domain: raw.domain.clone().unwrap_or_default(),
            description: raw.description.clone().filter(|s| !s.is_empty()),
            level_of_analysis: parse_level_of_analysis(raw.level_of_analysis.as_deref()),
            embedding: None,
        },
        section: raw.section.clone().unwrap_or_default(),
        context: raw.context.clone().filter(|s| !s.is_empty()),
        confidence: coerce_confidence(raw.confidence),
    })
}

/// Normalized `(theory_name, phenomenon_name)` pair, used by the
/// connection-strength function's `explicit_bonus` factor (§4.8).
pub fn validate_theory_phenomenon_link(raw: &RawTheoryPhenomenonLink) -> Option<(String, String)> {
    let theory = first_nonempty(&[raw.theory_name.as_deref(), raw.theory.as_deref()])?;
    let phenomenon = first_nonempty(&[raw.phenomenon_name.as_deref(), raw.phenomenon.as_deref()])?;
    Some((theory, phenomenon))
}

pub struct ValidatedMethod {
    pub method: Method,
    pub confidence: f64,
}

pub fn validate_method(raw: &RawMethod) -> Option<ValidatedMethod> {
    let name = first_nonempty(&[
        raw.method_name.as_deref(),
        raw.name.as_deref(),
        raw.method.as_deref(),
    ])?;
    Some(ValidatedMethod {
        method: Method {
            name: name.clone(),
            method_type: parse_method_type(raw.method_type.as_deref(), &name),
            category: raw.category.clone().filter(|s| !s.is_empty()),
            software: raw.software.clone(),
            sample_size: raw.sample_size,
            time_period: raw.time_period.clone().filter(|s| !s.is_empty()),
            embedding: None,
        },
        confidence: coerce_confidence(raw.confidence),
    })
}

pub struct ValidatedVariable {
    pub variable: Variable,
    pub confidence: f64,
}

pub fn validate_variable(paper_id: &str, raw: &RawVariable) -> Option<ValidatedVariable> {
    let name = first_nonempty(&[raw.variable_name.as_deref(), raw.name.as_deref()])?;
    let variable_type = parse_variable_type(raw.variable_type.as_deref());
    let mut variable = Variable::new(paper_id, &name, variable_type);
    variable.measurement = raw.measurement.clone().filter(|s| !s.is_empty());
    variable.operationalization = raw.operationalization.clone().filter(|s| !s.is_empty());
    Some(ValidatedVariable {
        variable,
        confidence: coerce_confidence(raw.confidence),
    })
}

pub fn validate_finding(paper_id: &str, raw: &RawFinding) -> Option<Finding> {
    let text = first_nonempty(&[raw.finding_text.as_deref(), raw.text.as_deref()])?;
    let finding_type = parse_finding_type(raw.finding_type.as_deref());
    let mut finding = Finding::new(paper_id, &text, finding_type);
    finding.significance = raw.significance.clone().filter(|s| !s.is_empty());
    finding.effect_size = raw.effect_size;
    finding.section = raw.section.clone().filter(|s| !s.is_empty());
    Some(finding)
}

pub fn validate_contribution(paper_id: &str, raw: &RawContribution) -> Option<Contribution> {
    let text = first_nonempty(&[raw.contribution_text.as_deref(), raw.text.as_deref()])?;
    let contribution_type = parse_contribution_type(raw.contribution_type.as_deref());
    let mut contribution = Contribution::new(paper_id, &text, contribution_type);
    contribution.section = raw.section.clone().filter(|s| !s.is_empty());
    Some(contribution)
}

pub fn validate_research_question(paper_id: &str, raw: &RawResearchQuestion) -> Option<ResearchQuestion> {
    let question = first_nonempty(&[raw.question.as_deref(), raw.text.as_deref()])?;
    let question_type = parse_question_type(raw.question_type.as_deref());
    let mut rq = ResearchQuestion::new(paper_id, &question, question_type);
    rq.section = raw.section.clone().filter(|s| !s.is_empty());
    Some(rq)
}

pub struct ValidatedCitation {
    pub title: String,
    pub citation_type: CitationType,
    pub section: String,
    pub confidence: f64,
}

pub fn validate_citation(raw: &RawCitation) -> Option<ValidatedCitation> {
    let title = first_nonempty(&[raw.title.as_deref(), raw.cited_title.as_deref()])?;
    Some(ValidatedCitation {
        title,
        citation_type: parse_citation_type(raw.citation_type.as_deref()),
        section: raw.section.clone().unwrap_or_default(),
        confidence: coerce_confidence(raw.confidence),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_falls_back_to_minimal_on_missing_title() {
        let raw = RawMetadata::default();
        let paper = validate_metadata("1999_001", &raw);
        assert_eq!(paper.title, "Paper 1999_001");
        assert_eq!(paper.publication_year, 1999);
    }

    #[test]
    fn metadata_uses_provided_fields_when_present() {
        let raw = RawMetadata {
            title: Some("Resource-Based Theory of the Firm".into()),
            publication_year: Some(1991),
            ..Default::default()
        };
        let paper = validate_metadata("1991_014", &raw);
        assert_eq!(paper.title, "Resource-Based Theory of the Firm");
        assert_eq!(paper.publication_year, 1991);
    }

    #[test]
    fn author_splits_full_name_when_given_family_absent() {
        let raw = RawAuthor {
            full_name: Some("Jay B. Barney".into()),
            ..Default::default()
        };
        let author = validate_author(0, &raw).unwrap();
        assert_eq!(author.family_name, "Barney");
        assert_eq!(author.given_name, "Jay B.");
    }

    #[test]
    fn author_without_any_name_is_dropped() {
        let raw = RawAuthor::default();
        assert!(validate_author(0, &raw).is_none());
    }

    #[test]
    fn theory_prefers_theory_name_field() {
        let raw = RawTheory {
            theory_name: Some("Resource-Based View".into()),
            name: Some("ignored".into()),
            role: Some("primary".into()),
            confidence: 0.8,
            ..Default::default()
        };
        let validated = validate_theory(&raw).unwrap();
        assert_eq!(validated.theory.name, "Resource-Based View");
        assert_eq!(validated.role, TheoryRole::Primary);
    }

    #[test]
    fn method_type_inferred_from_name_when_absent() {
        let raw = RawMethod {
            method_name: Some("Ordinary Least Squares Regression".into()),
            ..Default::default()
        };
        let validated = validate_method(&raw).unwrap();
        assert_eq!(validated.method.method_type, MethodType::Quantitative);
    }

    #[test]
    fn confidence_string_high_coerces_to_point_nine() {
        assert_eq!(coerce_confidence_str("High"), 0.9);
        assert_eq!(coerce_confidence_str("0.42"), 0.42);
        assert_eq!(coerce_confidence_str("garbage"), 0.8);
    }

    #[test]
    fn entity_without_identity_field_is_dropped() {
        let raw = RawTheory::default();
        assert!(validate_theory(&raw).is_none());
    }
}
