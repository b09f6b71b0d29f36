//! Prompt templates for Vidsage.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub qa: QaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for answering questions from retrieved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    pub system: String,
    pub user: String,
    /// Appended to the user prompt when the question asks for precise details.
    pub detail_addendum: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant specialized in analyzing and answering questions about video content.

A user is asking about videos that have been transcribed and analyzed. Answer from the analysis reports and transcript excerpts provided with each question.

Guidelines:
- Only use information explicitly present in the provided reports and excerpts
- If the needed information is missing, say so clearly; more detail may exist in the full video
- Do not make assumptions about video content beyond what is provided
- When comparing videos, focus on objective differences in content, style and approach
- Keep a neutral, balanced perspective on controversial topics"#
                .to_string(),

            user: r#"Question:
{{question}}

Available information (retrieved by semantic search):
{{context}}

Requirements:
1. Give a direct, concise answer that addresses the question
2. Reference specific videos when relevant and say which video contained the information
3. Use paragraphs and bullet points where they help
4. Synthesize across videos when several are relevant
5. Be as precise as possible for facts, quotes and numbers"#
                .to_string(),

            detail_addendum: r#"

The user is asking for specific details. Focus on the most precise information available in the reports and excerpts. If exact details are not available, state this and give the closest related information that is."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                let content = std::fs::read_to_string(&qa_path)?;
                prompts.qa = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
