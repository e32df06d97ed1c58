//! Loading and validating run inputs
//!
//! Respondent and questionnaire files are JSON arrays. Both are read once at
//! startup and are read-only for the rest of the run; any validation failure
//! aborts before a single call is made.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::survey::types::{Dimension, EvaluationContext, Question, Respondent};

/// Which field of a respondent entry provides the evaluation context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    /// `keywords[].memories[]`, flattened into fragments
    #[default]
    Memory,
    /// `story`, used as a single narrative
    Story,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Story => "story",
        }
    }
}

/// Validation failures for run inputs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("questionnaire contains no questions")]
    EmptyQuestionnaire,

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(u32),

    #[error("respondent '{0}' appears more than once")]
    DuplicateRespondent(String),
}

// ============================================================================
// Questionnaire
// ============================================================================

/// Validated questionnaire in administration order
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    questions: Vec<Question>,
    dimensions: Vec<Dimension>,
}

impl QuestionSet {
    /// Validate a list of questions
    ///
    /// The list must be non-empty and question ids must be unique.
    pub fn new(questions: Vec<Question>) -> Result<Self, InputError> {
        if questions.is_empty() {
            return Err(InputError::EmptyQuestionnaire);
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(InputError::DuplicateQuestion(question.id));
            }
        }

        let mut dimensions: Vec<Dimension> = questions.iter().map(|q| q.dimension).collect();
        dimensions.sort();
        dimensions.dedup();

        Ok(Self {
            questions,
            dimensions,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Dimensions that appear in the questionnaire, sorted
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Read and validate the questionnaire file
pub async fn load_questions(path: &Path) -> Result<QuestionSet> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read questionnaire: {}", path.display()))?;

    let questions: Vec<Question> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse questionnaire: {}", path.display()))?;

    QuestionSet::new(questions)
        .with_context(|| format!("Invalid questionnaire: {}", path.display()))
}

// ============================================================================
// Respondents
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
struct KeywordEntry {
    #[serde(default)]
    memories: Vec<String>,
}

/// One entry of the respondent file; unused fields are ignored
#[derive(Debug, Clone, Deserialize)]
struct RespondentEntry {
    user: String,
    uid: i64,
    #[serde(default)]
    keywords: Vec<KeywordEntry>,
    #[serde(default)]
    story: Option<String>,
}

impl RespondentEntry {
    fn into_respondent(self, source: ContextSource) -> Respondent {
        let context = match source {
            ContextSource::Memory => EvaluationContext::Fragments(
                self.keywords
                    .into_iter()
                    .flat_map(|keyword| keyword.memories)
                    .collect(),
            ),
            ContextSource::Story => EvaluationContext::Narrative(self.story.unwrap_or_default()),
        };

        Respondent {
            user: self.user,
            uid: self.uid,
            context,
        }
    }
}

/// Parse respondents from JSON text
///
/// Respondent identities must be unique.
pub fn parse_respondents(json: &str, source: ContextSource) -> Result<Vec<Respondent>> {
    let entries: Vec<RespondentEntry> =
        serde_json::from_str(json).context("Failed to parse respondents")?;

    let mut seen = HashSet::new();
    let mut respondents = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.user.clone()) {
            return Err(InputError::DuplicateRespondent(entry.user).into());
        }
        respondents.push(entry.into_respondent(source));
    }

    Ok(respondents)
}

/// Read and validate the respondent file
pub async fn load_respondents(path: &Path, source: ContextSource) -> Result<Vec<Respondent>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read respondents: {}", path.display()))?;

    parse_respondents(&content, source)
        .with_context(|| format!("Invalid respondent file: {}", path.display()))
}
