//! Loading service configuration (provider endpoints + prompts) from TOML.
//!
//! See `AppConfig`, `ProviderConfig` and `Prompts` for the expected schema.
//! Every field has a default, so an empty file (or no file) is valid.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub providers: ProviderConfig,
  pub prompts: Prompts,
  /// Directory holding the browser form bundle.
  pub static_dir: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self { providers: ProviderConfig::default(), prompts: Prompts::default(), static_dir: "./static".into() }
  }
}

/// Upstream endpoints and transport limits.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
  pub gemini_base_url: String,
  /// The one model used for Gemini requests.
  pub gemini_model: String,
  pub siliconflow_base_url: String,
  pub connect_timeout_secs: u64,
  pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
      gemini_model: "gemini-2.5-flash".into(),
      siliconflow_base_url: "https://api.siliconflow.cn/v1".into(),
      connect_timeout_secs: 10,
      request_timeout_secs: 120,
    }
  }
}

/// Prompts used for exercise generation. Defaults target English phrase drills
/// for Chinese-speaking postgraduate exam candidates.
///
/// `exercise_user_template` placeholders: `{topic}` and `{category_counts}`
/// (one "  - Label: n" line per category, rendered from the category table).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub gemini_system: String,
  pub siliconflow_system: String,
  pub exercise_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      gemini_system: "You are an expert AI English Exercise Generator. Your goal is to help users improve their English proficiency to a postgraduate entrance exam level. Your sole function is to generate a JSON object containing English exercises based on the user's request. You must adhere strictly to the provided JSON schema and requirements. Your output must be only the JSON object.".into(),
      siliconflow_system: "You are an expert AI English Exercise Generator. Your goal is to help users improve their English proficiency. Your sole function is to generate a JSON object containing English exercises based on the user's request. You must adhere strictly to the provided JSON schema and requirements. Do not output any text, explanations, or markdown formatting outside of the single, final JSON object.".into(),
      exercise_user_template: DEFAULT_EXERCISE_TEMPLATE.into(),
    }
  }
}

const DEFAULT_EXERCISE_TEMPLATE: &str = r#"
Please generate a set of English exercises based on the following criteria:
- Target grammar point/phrase: "{topic}"
- Number of questions for each type:
{category_counts}

**General Formatting for Multiple Choice Questions:**
- This applies to both 'mcGrammar' and 'mcContext' types.
- Each string in the 'options' array MUST be prefixed with a capital letter and a parenthesis. For example: "A) [Option text]", "B) [Option text]", etc.
- The 'options' array MUST contain exactly 7 entries, labeled A) through G).
- The 'answer' array for these types MUST contain only the capital letters of the correct options. For example: ["A", "C"].

**Strict Requirements for Each Question Type:**

1.  **Sentence Rewriting** ('sentenceRewrite'):
    - The user's goal is to rewrite a sentence to include "{topic}".
    - For the 'originalSentence' field, you must generate a complete English sentence that does NOT contain "{topic}". This sentence is what the user will rewrite.
    - For the 'question' field, provide a simple instruction like "Rewrite the following sentence to include the phrase '{topic}'.".

2.  **Multiple Choice (Grammar)** ('mcGrammar'):
    - Provide exactly 7 long and potentially confusing sentences (labeled A-G) as options.
    - The user must identify which sentences correctly use "{topic}".
    - Include common mistakes in the incorrect options.

3.  **Multiple Choice (Context)** ('mcContext'):
    - Provide exactly 7 distinct scenarios or contexts (labeled A-G) as options.
    - The user must identify which contexts are appropriate for using "{topic}".
    - Focus on establishing a clear "phrase-context" connection (e.g., cause-and-effect, degree, scope of influence).

4.  **Translation (Chinese to English)** ('translation'):
    - For the 'question' field, you MUST generate a complete and unique Chinese sentence for the user to translate. This field must contain ONLY the Chinese sentence.
    - The user's task is to translate this generated Chinese sentence into English using "{topic}".
    - The sentences should align with the contexts identified in the previous question type (e.g., cause-and-effect, degree, scope). Provide a context hint for each in the 'context' field.

5.  **Logical Analysis** ('logicalAnalysis'):
    - For the 'paragraph' field, provide an English paragraph that contains "{topic}".
    - For the 'question' field, ask the user to explain the role and meaning of "{topic}" within that specific paragraph.

**General Constraints:**
- All exercises must be at a difficulty level appropriate for a postgraduate entrance exam level English test (e.g., 考研英语一).
- The content must be highly relevant to "{topic}".
- The answers and explanations must be accurate, clear, and concise.
- Adhere strictly to the requested number of questions for each type. If a count is 0, provide an empty array for that type; never omit the key and never use null.
- Do not include any sensitive or illegal content.
"#;

/// Attempt to load `AppConfig` from DRILL_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("DRILL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "phrasedrill", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "phrasedrill", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "phrasedrill", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
