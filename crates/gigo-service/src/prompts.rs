//! Prompt templates for decomposition and answer synthesis.

use serde::{Deserialize, Serialize};

/// System prompt for query decomposition.
pub const DECOMPOSITION_SYSTEM_PROMPT: &str = "You are a technical assistant that decomposes a \
user's question into a list of sub-questions.";

/// Fallback reply when no evidence was retrieved.
pub const NO_EVIDENCE_ANSWER: &str =
    "The manual does not provide enough information to answer this question.";

/// One section of the document outline used to anchor sub-questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Section number.
    pub section: u32,
    /// Section title.
    pub title: String,
    /// Chapter titles in the section.
    #[serde(default)]
    pub chapters: Vec<String>,
}

/// Render the decomposition prompt.
pub fn decomposition_prompt(question: &str, outline: &[OutlineSection], max_sub_questions: usize) -> String {
    let structure = if outline.is_empty() {
        "(no outline available; use section_number 0 and an empty section_title)".to_string()
    } else {
        serde_json::to_string_pretty(outline).unwrap_or_default()
    };

    format!(
        r#"You break complex technical questions about a machine manual into sub-questions
that progressively build understanding for a downstream model.

Manual structure:

{structure}

User question:
{question}

Instructions:

1. Identify the key concepts, comparisons, dependencies and specifications in the question.
2. Produce at most {max_sub_questions} sub-questions. Prefer fact-finding sub-questions first,
   then comparative, causal or procedural ones when the question needs them.
3. Each sub-question must be answerable from the manual, atomic, and mapped to the most
   relevant section number, section title and chapters from the structure above.
4. Return only JSON in this shape, with no commentary:

{{
  "original_question": "<the user question>",
  "decomposed_questions": [
    {{
      "sub_question": "What are the front axle differential housing capacities for models 943 and 1255?",
      "section_number": 2,
      "section_title": "General Information and Specifications",
      "matched_chapters": ["Fluid and Lubricant Capacities"]
    }}
  ]
}}
"#
    )
}

/// Render the answer prompt over the retrieved evidence texts.
pub fn answer_prompt(question: &str, points: &[&str]) -> String {
    let relevant_points = points
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are a technical assistant answering questions about a machine manual.
Analyze every relevant point below and answer each part of the user's question.

### User Question:
{question}

### Relevant Points:
{relevant_points}

### Instructions:

1. Determine whether the question contains several sub-questions and address each of them.
2. Base the answer strictly on the points above. If a value is not present, say:
   "The manual does not provide enough information to answer this part of the question."
3. Cite figures as "See Figure 3.2" and tables by their section or heading.
4. Keep the manual's technical language and differentiate models explicitly when several
   are mentioned.

Now write the answer using only the content above.
"#
    )
}
