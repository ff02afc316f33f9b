//! Prompt templates for the multi-stage scholarly-entity extractor.
//!
//! Each extraction call gets its own prompt constructor so that the cache
//! key (prompt type + prompt version + source fingerprint, see
//! `crate::cache`) stays stable as prompts evolve independently of one
//! another. `PROMPT_VERSION` participates in every cache key: bumping it
//! invalidates previously cached responses for that prompt.

/// Version tag mixed into every extraction cache key. Bump when a prompt's
/// wording changes in a way that could change the shape of its output.
pub const PROMPT_VERSION: &str = "2.0";

/// Prompt templates for extracting scholarly entities from Strategic
/// Management Journal papers.
pub struct PromptTemplates;

impl PromptTemplates {
    /// System prompt shared by every extraction call.
    pub fn system_prompt() -> &'static str {
        r#"You are a research assistant specialized in reading Strategic Management Journal
papers and extracting structured scholarly information from them.

Rules:
- Only extract information that is actually present in the provided text. Never invent
  theories, methods, variables, or findings that are not supported by the text.
- Respond with a single JSON object and nothing else: no markdown fences, no commentary.
- When a field is not discussed in the text, omit it or use an empty string/array rather
  than guessing.
- Prefer the terminology the authors themselves use (e.g. "Resource-Based View" rather than
  a paraphrase)."#
    }

    /// Combined-mode call 1: paper metadata and author list.
    pub fn metadata_prompt(text: &str) -> String {
        format!(
            r#"Read the following excerpt from a Strategic Management Journal paper and extract
its metadata and author list as a JSON object with this shape:

{{
  "metadata": {{
    "title": "...",
    "abstract_text": "...",
    "publication_year": 2004,
    "journal": "Strategic Management Journal",
    "doi": "...",
    "keywords": ["...", "..."],
    "paper_type": "one of: empirical_quantitative, empirical_qualitative, theoretical, review, meta_analysis, research_note"
  }},
  "authors": [
    {{"full_name": "...", "given_name": "...", "family_name": "...", "affiliation": "...", "position": 1}}
  ]
}}

Text:
{text}"#
        )
    }

    /// Combined-mode call 2: theories, phenomena, and the links between them.
    pub fn theories_phenomena_prompt(text: &str) -> String {
        format!(
            r#"Read the following excerpt from a Strategic Management Journal paper and extract the
theoretical frameworks and phenomena it studies as a JSON object with this shape:

{{
  "theories": [
    {{
      "theory_name": "...",
      "role": "one of: primary, supporting, challenging, extending",
      "section": "e.g. Introduction, Literature Review, Discussion",
      "usage_context": "a short quote or paraphrase of how the theory is used",
      "domain": "e.g. organizational economics",
      "theory_type": "one of: framework, concept, model, perspective",
      "description": "one sentence describing the theory",
      "confidence": 0.9
    }}
  ],
  "phenomena": [
    {{
      "phenomenon_name": "...",
      "phenomenon_type": "one of: behavior, pattern, event, trend, process, outcome",
      "domain": "...",
      "description": "...",
      "context": "...",
      "section": "...",
      "level_of_analysis": "one of: individual, team, organization, industry, economy, multi_level",
      "confidence": 0.9
    }}
  ],
  "theory_phenomenon_links": [
    {{"theory_name": "...", "phenomenon_name": "..."}}
  ]
}}

Only include a link when the text explicitly connects a theory to a phenomenon (e.g. "we use
X theory to explain Y").

Text:
{text}"#
        )
    }

    /// Combined-mode call 3: methods, variables, findings, contributions,
    /// and research questions.
    pub fn methods_findings_prompt(text: &str) -> String {
        format!(
            r#"Read the following excerpt from a Strategic Management Journal paper and extract its
research design as a JSON object with this shape:

{{
  "methods": [
    {{
      "method_name": "...",
      "method_type": "one of: quantitative, qualitative, mixed, computational, experimental",
      "category": "e.g. regression, case study, simulation",
      "software": ["Stata", "R"],
      "sample_size": 250,
      "time_period": "1995-2005",
      "confidence": 0.9
    }}
  ],
  "variables": [
    {{"variable_name": "...", "variable_type": "one of: dependent, independent, control, moderator, mediator, instrumental", "measurement": "...", "operationalization": "...", "confidence": 0.9}}
  ],
  "findings": [
    {{"finding_text": "...", "finding_type": "one of: hypothesis_supported, hypothesis_rejected, unexpected, exploratory", "significance": "p < 0.05", "effect_size": 0.34, "section": "Results", "confidence": 0.9}}
  ],
  "contributions": [
    {{"contribution_text": "...", "contribution_type": "one of: theoretical, empirical, methodological, practical", "section": "Discussion", "confidence": 0.9}}
  ],
  "research_questions": [
    {{"question": "...", "question_type": "one of: descriptive, explanatory, predictive, prescriptive, exploratory", "section": "Introduction", "confidence": 0.9}}
  ]
}}

Text:
{text}"#
        )
    }

    /// Citation extraction call, used in both combined and fallback modes.
    pub fn citations_prompt(text: &str) -> String {
        format!(
            r#"Read the following excerpt from a Strategic Management Journal paper and extract
the works it cites as a JSON object with this shape:

{{
  "citations": [
    {{"title": "...", "citation_type": "one of: supporting, contrasting, extending, background", "section": "...", "confidence": 0.9}}
  ]
}}

Only list citations to other scholarly works, not footnotes or data sources.

Text:
{text}"#
        )
    }

    /// Single-entity fallback prompt for one extraction kind, used when the
    /// combined-call response fails to parse after retries (§4.3 fallback
    /// mode).
    pub fn single_entity_prompt(kind: &str, text: &str) -> String {
        match kind {
            "metadata" => Self::metadata_prompt(text),
            "theories" | "phenomena" => Self::theories_phenomena_prompt(text),
            "methods" | "variables" | "findings" | "contributions" | "research_questions" => {
                Self::methods_findings_prompt(text)
            }
            "citations" => Self::citations_prompt(text),
            other => format!(
                "Extract {other} from the following Strategic Management Journal paper excerpt \
                 as a JSON object. Only use information present in the text.\n\nText:\n{text}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_mentions_json() {
        let prompt = PromptTemplates::system_prompt();
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_metadata_prompt_embeds_text() {
        let prompt = PromptTemplates::metadata_prompt("Some excerpt");
        assert!(prompt.contains("Some excerpt"));
        assert!(prompt.contains("publication_year"));
    }

    #[test]
    fn test_theories_phenomena_prompt_has_link_shape() {
        let prompt = PromptTemplates::theories_phenomena_prompt("excerpt");
        assert!(prompt.contains("theory_phenomenon_links"));
    }

    #[test]
    fn test_single_entity_prompt_dispatches() {
        let prompt = PromptTemplates::single_entity_prompt("citations", "excerpt");
        assert!(prompt.contains("citation_type"));
    }
}
