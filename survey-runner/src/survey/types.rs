//! Data types for survey administration
//!
//! This module defines the data structures that flow through a run:
//!
//! 1. **Inputs** - Respondents and the questionnaire (read-only for the run)
//! 2. **Answers** - Validated Likert answers with the text that produced them
//! 3. **Scores** - Per-dimension, per-repetition sums
//! 4. **Records** - The persisted, immutable result for one respondent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest valid Likert answer
pub const LIKERT_MIN: u8 = 1;

/// Highest valid Likert answer
pub const LIKERT_MAX: u8 = 6;

/// Identity of the synthetic respondent answered with the empty-context fallback
pub const BASELINE_USER: &str = "baseline";

// ============================================================================
// Questionnaire Types
// ============================================================================

/// Personality dimension measured by a question
///
/// The set is closed: an unknown tag in the questionnaire fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Openness
    O,
    /// Conscientiousness
    C,
    /// Extraversion
    E,
    /// Agreeableness
    A,
    /// Neuroticism / emotional stability
    N,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::O => "O",
            Self::C => "C",
            Self::E => "E",
            Self::A => "A",
            Self::N => "N",
        };
        write!(f, "{}", tag)
    }
}

/// A single questionnaire item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question number, unique within the questionnaire
    pub id: u32,

    /// Statement shown to the respondent
    pub text: String,

    /// Dimension this item contributes to
    pub dimension: Dimension,

    /// Reverse-scored items contribute `7 - x`
    #[serde(default)]
    pub reverse: bool,
}

impl Question {
    /// Contribution of a validated answer to this item's dimension sum
    pub fn contribution(&self, answer: u8) -> u32 {
        if self.reverse {
            u32::from(LIKERT_MAX + 1 - answer)
        } else {
            u32::from(answer)
        }
    }
}

// ============================================================================
// Respondent Types
// ============================================================================

/// Material the respondent's system context is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationContext {
    /// Ordered short memory fragments, shuffled per repetition
    Fragments(Vec<String>),
    /// One narrative text used verbatim
    Narrative(String),
}

impl EvaluationContext {
    /// True when there is nothing usable to build a context from
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Fragments(fragments) => fragments.iter().all(|f| f.trim().is_empty()),
            Self::Narrative(text) => text.trim().is_empty(),
        }
    }
}

/// A synthetic persona administered the questionnaire
#[derive(Debug, Clone, PartialEq)]
pub struct Respondent {
    /// Stable external identity; the resume key
    pub user: String,

    /// Internal numeric id
    pub uid: i64,

    /// Evaluation context
    pub context: EvaluationContext,
}

impl Respondent {
    /// The empty-context respondent used to measure unconditioned answers
    pub fn baseline() -> Self {
        Self {
            user: BASELINE_USER.to_string(),
            uid: -1,
            context: EvaluationContext::Narrative(String::new()),
        }
    }
}

// ============================================================================
// Answer & Score Types
// ============================================================================

/// Accepted outcome of one question for one repetition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Validated integer in `[LIKERT_MIN, LIKERT_MAX]`
    pub answer: u8,

    /// Raw response text the integer was extracted from
    pub text: String,
}

/// Persisted score shape: dimension → repetition → sum
pub type DimensionScores = BTreeMap<Dimension, BTreeMap<usize, u32>>;

/// Persisted answer trace: question id → repetition → answer
pub type AnswerTrace = BTreeMap<u32, BTreeMap<usize, Answer>>;

/// Errors from folding an answer into a [`ScoreTable`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("dimension {0} is not part of the questionnaire")]
    UnknownDimension(Dimension),

    #[error("repetition {repetition} is outside 0..{repeat}")]
    RepetitionOutOfRange { repetition: usize, repeat: usize },
}

/// Fixed-shape accumulator: one slot per (dimension, repetition)
///
/// Every dimension of the questionnaire has an entry for every repetition,
/// starting at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    repeat: usize,
    sums: BTreeMap<Dimension, Vec<u32>>,
}

impl ScoreTable {
    pub fn new(dimensions: &[Dimension], repeat: usize) -> Self {
        let sums = dimensions
            .iter()
            .map(|dimension| (*dimension, vec![0; repeat]))
            .collect();
        Self { repeat, sums }
    }

    /// Add a contribution to one slot
    pub fn add(
        &mut self,
        dimension: Dimension,
        repetition: usize,
        contribution: u32,
    ) -> Result<(), ScoreError> {
        let repeat = self.repeat;
        let slots = self
            .sums
            .get_mut(&dimension)
            .ok_or(ScoreError::UnknownDimension(dimension))?;
        let slot = slots
            .get_mut(repetition)
            .ok_or(ScoreError::RepetitionOutOfRange { repetition, repeat })?;
        *slot += contribution;
        Ok(())
    }

    pub fn get(&self, dimension: Dimension, repetition: usize) -> Option<u32> {
        self.sums
            .get(&dimension)
            .and_then(|slots| slots.get(repetition))
            .copied()
    }

    /// Convert to the persisted shape
    pub fn into_scores(self) -> DimensionScores {
        self.sums
            .into_iter()
            .map(|(dimension, slots)| (dimension, slots.into_iter().enumerate().collect()))
            .collect()
    }
}

// ============================================================================
// Record Types
// ============================================================================

/// Final persisted result for one respondent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Respondent identity
    pub user: String,

    /// Internal numeric id
    pub uid: i64,

    /// Dimension sums per repetition
    pub result: DimensionScores,

    /// Full per-question answer trace
    pub answer: AnswerTrace,

    /// When processing finished (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
