//! System-context assembly
//!
//! The system context for a repetition is
//! `system_prefix + body + system_suffix`, where the body is either the
//! respondent's narrative or their fragments joined by `fragment_separator`.
//! A respondent with no usable material gets `empty_context` instead.
//!
//! Fragment order is reshuffled at the start of every repetition with a
//! generator freshly seeded from the run seed. The shuffle is applied to the
//! respondent's working copy in place, so repetition `r` sees the order that
//! results from `r + 1` successive seeded shuffles of the original list. Two
//! runs with the same seed therefore produce identical contexts.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::survey::types::{EvaluationContext, Question, Respondent};

fn default_separator() -> String {
    "\n    ".to_string()
}

/// Prompt wording, loaded from YAML
///
/// Every field is optional; missing fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// Text placed before the respondent material
    pub system_prefix: String,
    /// Text placed after the respondent material
    pub system_suffix: String,
    /// Whole system context used when the respondent has no material
    pub empty_context: String,
    /// Text placed before every question statement
    pub question_prefix: String,
    /// Joiner between memory fragments
    #[serde(default = "default_separator")]
    pub fragment_separator: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system_prefix: String::new(),
            system_suffix: String::new(),
            empty_context: String::new(),
            question_prefix: String::new(),
            fragment_separator: default_separator(),
        }
    }
}

impl PromptTemplate {
    /// Read a template from a YAML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse prompt template: {}", path.display()))
    }

    /// User message for one question
    pub fn question_prompt(&self, question: &Question) -> String {
        format!("{}{}", self.question_prefix, question.text)
    }
}

/// Per-respondent builder of repetition contexts
#[derive(Debug, Clone)]
pub struct ContextBuilder<'a> {
    template: &'a PromptTemplate,
    seed: u64,
    material: Material,
}

#[derive(Debug, Clone)]
enum Material {
    Empty,
    Fragments(Vec<String>),
    Narrative(String),
}

impl<'a> ContextBuilder<'a> {
    pub fn new(respondent: &Respondent, template: &'a PromptTemplate, seed: u64) -> Self {
        let material = if respondent.context.is_empty() {
            Material::Empty
        } else {
            match &respondent.context {
                EvaluationContext::Fragments(fragments) => Material::Fragments(fragments.clone()),
                EvaluationContext::Narrative(text) => Material::Narrative(text.clone()),
            }
        };

        Self {
            template,
            seed,
            material,
        }
    }

    /// Context for the next repetition
    ///
    /// Must be called once per repetition, in order.
    pub fn next_context(&mut self) -> String {
        let template = self.template;
        match &mut self.material {
            Material::Empty => template.empty_context.clone(),
            Material::Narrative(text) => {
                format!("{}{}{}", template.system_prefix, text, template.system_suffix)
            }
            Material::Fragments(fragments) => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                fragments.shuffle(&mut rng);
                format!(
                    "{}{}{}",
                    template.system_prefix,
                    fragments.join(&template.fragment_separator),
                    template.system_suffix
                )
            }
        }
    }
}
