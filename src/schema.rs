//! Category/field table and everything rendered from it: the Gemini response
//! schema, the prose schema appended for SiliconFlow, and the per-category
//! count lines of the instruction text.
//!
//! Both schema renderings read the same `FieldSpec` table, so a field added
//! here shows up for both providers.

use serde_json::{json, Map, Value};

use crate::config::Prompts;
use crate::domain::{ExerciseCategory, QuestionCounts};
use crate::util::fill_template;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  /// Exactly seven lettered options.
  Options,
  /// Letters of the correct options.
  Letters,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
  pub name: &'static str,
  pub kind: FieldKind,
  pub description: &'static str,
}

const fn text(name: &'static str, description: &'static str) -> FieldSpec {
  FieldSpec { name, kind: FieldKind::Text, description }
}

const SENTENCE_REWRITE_FIELDS: [FieldSpec; 4] = [
  text("question", "Instruction for the user."),
  text("originalSentence", "The sentence to be rewritten."),
  text("answer", "The rewritten sentence including the target phrase."),
  text("explanation", "A brief explanation of the rewrite."),
];

const MC_GRAMMAR_FIELDS: [FieldSpec; 4] = [
  text("question", "The question prompt."),
  FieldSpec { name: "options", kind: FieldKind::Options, description: "7 options (A-G), some correct, some incorrect." },
  FieldSpec { name: "answer", kind: FieldKind::Letters, description: "An array of correct option letters (e.g., ['A', 'D'])." },
  text("explanation", "Explanation for why the answers are correct and others are not."),
];

const MC_CONTEXT_FIELDS: [FieldSpec; 4] = [
  text("question", "The question prompt."),
  FieldSpec { name: "options", kind: FieldKind::Options, description: "7 context options (A-G)." },
  FieldSpec { name: "answer", kind: FieldKind::Letters, description: "An array of correct option letters." },
  text("explanation", "Explanation for why the answers are suitable contexts."),
];

const TRANSLATION_FIELDS: [FieldSpec; 4] = [
  text("question", "The Chinese sentence to translate."),
  text("context", "The context hint (e.g., '因果关系')."),
  text("answer", "The correct English translation using the target phrase."),
  text("explanation", "A brief explanation of the translation."),
];

const LOGICAL_ANALYSIS_FIELDS: [FieldSpec; 4] = [
  text("question", "The question asking about the role of the phrase."),
  text("paragraph", "The English paragraph containing the target phrase."),
  text("answer", "A detailed analysis of the phrase's role and meaning in the paragraph."),
  text("explanation", "Further clarification on the logical connection."),
];

impl ExerciseCategory {
  pub fn fields(self) -> &'static [FieldSpec] {
    match self {
      ExerciseCategory::SentenceRewrite => &SENTENCE_REWRITE_FIELDS,
      ExerciseCategory::McGrammar => &MC_GRAMMAR_FIELDS,
      ExerciseCategory::McContext => &MC_CONTEXT_FIELDS,
      ExerciseCategory::Translation => &TRANSLATION_FIELDS,
      ExerciseCategory::LogicalAnalysis => &LOGICAL_ANALYSIS_FIELDS,
    }
  }

  pub fn schema_description(self) -> &'static str {
    match self {
      ExerciseCategory::SentenceRewrite => "Sentence rewriting exercises.",
      ExerciseCategory::McGrammar => "Multiple choice questions focusing on grammar.",
      ExerciseCategory::McContext => "Multiple choice questions focusing on context.",
      ExerciseCategory::Translation => "Translation questions from Chinese to English.",
      ExerciseCategory::LogicalAnalysis => "Logical analysis questions based on a paragraph.",
    }
  }

  /// Name used in the instruction's count list.
  pub fn prompt_name(self) -> &'static str {
    match self {
      ExerciseCategory::SentenceRewrite => "Sentence Rewriting",
      ExerciseCategory::McGrammar => "Multiple Choice (Grammar)",
      ExerciseCategory::McContext => "Multiple Choice (Context)",
      ExerciseCategory::Translation => "Translation (Chinese to English)",
      ExerciseCategory::LogicalAnalysis => "Logical Analysis",
    }
  }
}

/// Gemini `responseSchema` (OpenAPI subset, upper-case type names).
pub fn response_schema() -> Value {
  let mut properties = Map::new();
  for c in ExerciseCategory::ALL {
    let mut item_props = Map::new();
    for f in c.fields() {
      let v = match f.kind {
        FieldKind::Text => json!({ "type": "STRING", "description": f.description }),
        FieldKind::Options | FieldKind::Letters => json!({
          "type": "ARRAY",
          "items": { "type": "STRING" },
          "description": f.description,
        }),
      };
      item_props.insert(f.name.to_string(), v);
    }
    let required: Vec<&str> = c.fields().iter().map(|f| f.name).collect();
    properties.insert(
      c.key().to_string(),
      json!({
        "type": "ARRAY",
        "description": c.schema_description(),
        "items": { "type": "OBJECT", "properties": item_props, "required": required },
      }),
    );
  }
  let required: Vec<&str> = ExerciseCategory::ALL.iter().map(|c| c.key()).collect();
  json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn prose_type(kind: FieldKind) -> &'static str {
  match kind {
    FieldKind::Text => "string",
    FieldKind::Options => "array of 7 strings",
    FieldKind::Letters => "array of strings",
  }
}

/// Prose restatement of `response_schema()` for transports without schema enforcement.
pub fn readable_schema() -> String {
  let keys: Vec<String> = ExerciseCategory::ALL.iter().map(|c| format!("\"{}\"", c.key())).collect();
  let mut out = format!(
    "The JSON object must have these top-level keys: {}.\nThe value for each key must be an array of objects.\n\n",
    keys.join(", ")
  );
  for c in ExerciseCategory::ALL {
    let fields: Vec<String> = c.fields()
      .iter()
      .map(|f| format!("\"{}\" ({})", f.name, prose_type(f.kind)))
      .collect();
    out.push_str(&format!("- For \"{}\", each object must have: {}.\n", c.key(), fields.join(", ")));
  }
  out.push_str("\nIf a question type has a count of 0, return an empty array for that key.");
  out
}

fn category_count_lines(counts: &QuestionCounts) -> String {
  ExerciseCategory::ALL
    .iter()
    .map(|c| format!("  - {}: {}", c.prompt_name(), counts.get(*c)))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Instruction text shared by both providers.
pub fn build_instruction(prompts: &Prompts, topic: &str, counts: &QuestionCounts) -> String {
  let lines = category_count_lines(counts);
  // topic last: user text must not be re-scanned for placeholders
  fill_template(&prompts.exercise_user_template, &[("category_counts", &lines), ("topic", topic)])
}

/// Instruction plus the prose schema, for SiliconFlow.
pub fn build_instruction_with_schema(prompts: &Prompts, topic: &str, counts: &QuestionCounts) -> String {
  format!(
    "{}\n\n**Required JSON Output Schema:**\n{}",
    build_instruction(prompts, topic, counts),
    readable_schema()
  )
}
