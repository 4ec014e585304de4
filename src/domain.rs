//! Domain models: providers, categories, question counts and exercise records.

use serde::{Deserialize, Serialize};

use crate::error::DrillError;

/// Upper bound for any single category count.
pub const MAX_COUNT_PER_CATEGORY: u8 = 5;

/// Which LLM service handles the request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
  /// Google Gemini: one fixed model, native response schema.
  #[serde(rename = "gemini", alias = "primary")]
  Primary,
  /// SiliconFlow: model picked from the fetched catalog, schema restated in the prompt.
  #[serde(rename = "siliconflow", alias = "dynamic")]
  Dynamic,
}

impl Provider {
  pub fn display_name(self) -> &'static str {
    match self {
      Provider::Primary => "Google Gemini",
      Provider::Dynamic => "SiliconFlow",
    }
  }
}

impl std::fmt::Display for Provider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Provider::Primary => "gemini",
      Provider::Dynamic => "siliconflow",
    })
  }
}

/// The five exercise kinds, in display order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseCategory {
  SentenceRewrite,
  McGrammar,
  McContext,
  Translation,
  LogicalAnalysis,
}

impl ExerciseCategory {
  pub const ALL: [ExerciseCategory; 5] = [
    ExerciseCategory::SentenceRewrite,
    ExerciseCategory::McGrammar,
    ExerciseCategory::McContext,
    ExerciseCategory::Translation,
    ExerciseCategory::LogicalAnalysis,
  ];

  /// JSON key used both in counts and in generated output.
  pub fn key(self) -> &'static str {
    match self {
      ExerciseCategory::SentenceRewrite => "sentenceRewrite",
      ExerciseCategory::McGrammar => "mcGrammar",
      ExerciseCategory::McContext => "mcContext",
      ExerciseCategory::Translation => "translation",
      ExerciseCategory::LogicalAnalysis => "logicalAnalysis",
    }
  }

  /// Bilingual label shown by the form.
  pub fn label(self) -> &'static str {
    match self {
      ExerciseCategory::SentenceRewrite => "句子改写 (Sentence Rewriting)",
      ExerciseCategory::McGrammar => "多项选择-语法判断 (MC - Grammar)",
      ExerciseCategory::McContext => "多项选择-语境理解 (MC - Context)",
      ExerciseCategory::Translation => "翻译 (Translation)",
      ExerciseCategory::LogicalAnalysis => "逻辑分析 (Logical Analysis)",
    }
  }

  pub fn is_multiple_choice(self) -> bool {
    matches!(self, ExerciseCategory::McGrammar | ExerciseCategory::McContext)
  }
}

/// Requested number of questions per category, each in `0..=5`.
/// Keys missing from a partial object take the default of 1.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionCounts {
  pub sentence_rewrite: u8,
  pub mc_grammar: u8,
  pub mc_context: u8,
  pub translation: u8,
  pub logical_analysis: u8,
}

impl Default for QuestionCounts {
  fn default() -> Self {
    Self { sentence_rewrite: 1, mc_grammar: 1, mc_context: 1, translation: 1, logical_analysis: 1 }
  }
}

impl QuestionCounts {
  pub fn zero() -> Self {
    Self { sentence_rewrite: 0, mc_grammar: 0, mc_context: 0, translation: 0, logical_analysis: 0 }
  }

  pub fn get(&self, category: ExerciseCategory) -> u8 {
    match category {
      ExerciseCategory::SentenceRewrite => self.sentence_rewrite,
      ExerciseCategory::McGrammar => self.mc_grammar,
      ExerciseCategory::McContext => self.mc_context,
      ExerciseCategory::Translation => self.translation,
      ExerciseCategory::LogicalAnalysis => self.logical_analysis,
    }
  }

  pub fn total(&self) -> u32 {
    ExerciseCategory::ALL.iter().map(|c| self.get(*c) as u32).sum()
  }

  pub fn validate(&self) -> Result<(), DrillError> {
    for c in ExerciseCategory::ALL {
      let n = self.get(c);
      if n > MAX_COUNT_PER_CATEGORY {
        return Err(DrillError::Validation(format!(
          "Question count for {} must be between 0 and {}, got {}.",
          c.key(), MAX_COUNT_PER_CATEGORY, n
        )));
      }
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRewriteQuestion {
  pub question: String,
  pub original_sentence: String,
  pub answer: String,
  pub explanation: String,
}

/// Shared by the grammar and context multiple-choice categories.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceQuestion {
  pub question: String,
  /// Seven entries, "A) ..".."G) ..".
  pub options: Vec<String>,
  /// Letters of the correct options, e.g. `["A", "C"]`.
  pub answer: Vec<String>,
  pub explanation: String,
}

impl ChoiceQuestion {
  /// Letters of the options as actually generated ("A" for "A) ...").
  pub fn option_letters(&self) -> Vec<String> {
    self.options
      .iter()
      .filter_map(|o| o.trim_start().split_once(')').map(|(l, _)| l.trim().to_string()))
      .collect()
  }

  /// Answer letters that do not match any generated option.
  pub fn dangling_answers(&self) -> Vec<&str> {
    let letters = self.option_letters();
    self.answer
      .iter()
      .map(|a| a.trim())
      .filter(|a| !letters.iter().any(|l| l.as_str() == *a))
      .collect()
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationQuestion {
  /// Chinese sentence to translate.
  pub question: String,
  pub context: String,
  pub answer: String,
  pub explanation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalAnalysisQuestion {
  pub question: String,
  pub paragraph: String,
  pub answer: String,
  pub explanation: String,
}

/// A full exercise set. Every category key is required on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExercises {
  pub sentence_rewrite: Vec<SentenceRewriteQuestion>,
  pub mc_grammar: Vec<ChoiceQuestion>,
  pub mc_context: Vec<ChoiceQuestion>,
  pub translation: Vec<TranslationQuestion>,
  pub logical_analysis: Vec<LogicalAnalysisQuestion>,
}

impl GeneratedExercises {
  pub fn len_of(&self, category: ExerciseCategory) -> usize {
    match category {
      ExerciseCategory::SentenceRewrite => self.sentence_rewrite.len(),
      ExerciseCategory::McGrammar => self.mc_grammar.len(),
      ExerciseCategory::McContext => self.mc_context.len(),
      ExerciseCategory::Translation => self.translation.len(),
      ExerciseCategory::LogicalAnalysis => self.logical_analysis.len(),
    }
  }

  pub fn total(&self) -> usize {
    ExerciseCategory::ALL.iter().map(|c| self.len_of(*c)).sum()
  }

  fn choices(&self, category: ExerciseCategory) -> &[ChoiceQuestion] {
    match category {
      ExerciseCategory::McGrammar => &self.mc_grammar,
      ExerciseCategory::McContext => &self.mc_context,
      _ => &[],
    }
  }

  /// Human-readable deviations from what was requested. Informational only;
  /// the result is never reshaped.
  pub fn conformance_issues(&self, counts: &QuestionCounts) -> Vec<String> {
    let mut issues = vec![];
    for c in ExerciseCategory::ALL {
      let want = counts.get(c) as usize;
      let got = self.len_of(c);
      if want != got {
        issues.push(format!("{}: requested {}, got {}", c.key(), want, got));
      }
      for (i, q) in self.choices(c).iter().enumerate() {
        if q.options.len() != 7 {
          issues.push(format!("{}[{}]: {} options instead of 7", c.key(), i, q.options.len()));
        }
        let dangling = q.dangling_answers();
        if !dangling.is_empty() {
          issues.push(format!("{}[{}]: answers {:?} match no option", c.key(), i, dangling));
        }
      }
    }
    issues
  }
}

/// A provider credential. Never printed; `Debug` is redacted.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
  pub fn new(key: impl Into<String>) -> Self { ApiKey(key.into()) }
  pub fn expose(&self) -> &str { &self.0 }
  pub fn is_blank(&self) -> bool { self.0.trim().is_empty() }
}

impl std::fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(if self.is_blank() { "ApiKey(<empty>)" } else { "ApiKey(***)" })
  }
}

/// One selectable SiliconFlow model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDescriptor {
  pub id: String,
  #[serde(rename = "displayName", alias = "name")]
  pub display_name: String,
}

impl ModelDescriptor {
  pub fn from_id(id: impl Into<String>) -> Self {
    let id = id.into();
    Self { display_name: id.clone(), id }
  }
}
