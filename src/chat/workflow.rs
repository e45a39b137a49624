//! Per-turn answer / teach / correct workflow.

use std::path::{Path, PathBuf};

use crate::knowledge::{
    find_best_match, get_answer, normalize, Entry, KnowledgeBase, KnowledgeError, SaveReport,
};

/// Answer text that declines to teach.
pub const SKIP_SENTINEL: &str = "skip";

/// Whether `answer` is the skip sentinel.
#[must_use]
pub fn is_skip(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(SKIP_SENTINEL)
}

/// Result of looking up one user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Input had nothing left after normalization.
    Empty,
    /// A known phrasing matched.
    Answer {
        phrasing: String,
        answer: String,
        score: f64,
    },
    /// Nothing matched; the normalized input can be taught.
    Unknown { normalized: String },
}

/// Where the current turn stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the next input.
    #[default]
    Start,
    /// An answer was given for `phrasing`; it may still be rejected.
    Answered { phrasing: String },
    /// The answer for `phrasing` was rejected and a new one is expected.
    Correcting { phrasing: String },
    /// No match for `question`; an answer is expected.
    Teaching { question: String },
}

/// Outcome of a teaching step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Learned {
    /// The entry was appended and persisted.
    Saved(SaveReport),
    /// The user declined to teach.
    Skipped,
}

/// Errors from teaching.
#[derive(thiserror::Error, Debug)]
pub enum TeachError {
    /// The turn is not waiting for an answer.
    #[error("Nothing to learn in state {0:?}")]
    NothingToLearn(TurnState),

    /// The question or answer would break the knowledge base invariants.
    #[error(transparent)]
    InvalidEntry(KnowledgeError),

    /// The entry was kept in memory but could not be written to disk.
    #[error("Could not save your answer: {0}")]
    Persistence(#[source] KnowledgeError),
}

impl From<KnowledgeError> for TeachError {
    fn from(err: KnowledgeError) -> Self {
        match err {
            KnowledgeError::InvalidEntry(_) => Self::InvalidEntry(err),
            other => Self::Persistence(other),
        }
    }
}

/// Owns one session's knowledge base and walks each turn through
/// `Start → Answered → Correcting` or `Start → Teaching`.
#[derive(Debug)]
pub struct Tutor {
    base: KnowledgeBase,
    path: PathBuf,
    state: TurnState,
}

impl Tutor {
    /// Load the knowledge base at `path`.
    ///
    /// # Errors
    ///
    /// Returns the load error; callers treat it as fatal for the session.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let path = path.as_ref().to_path_buf();
        let base = KnowledgeBase::load(&path)?;
        Ok(Self::new(base, path))
    }

    /// Wrap an already loaded knowledge base persisted at `path`.
    #[must_use]
    pub fn new(base: KnowledgeBase, path: PathBuf) -> Self {
        Self {
            base,
            path,
            state: TurnState::Start,
        }
    }

    #[must_use]
    pub fn state(&self) -> &TurnState {
        &self.state
    }

    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.base
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn transition(&mut self, new_state: TurnState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "Turn transition");
        self.state = new_state;
    }

    /// Look up `raw_input`, starting a new turn.
    pub fn respond(&mut self, raw_input: &str) -> Reply {
        let normalized = normalize(raw_input);
        if normalized.trim().is_empty() {
            self.transition(TurnState::Start);
            return Reply::Empty;
        }

        let found = find_best_match(raw_input, &self.base).and_then(|m| {
            get_answer(m.phrasing, &self.base)
                .map(|answer| (m.phrasing.to_string(), answer.to_string(), m.score))
        });

        if let Some((phrasing, answer, score)) = found {
            self.transition(TurnState::Answered {
                phrasing: phrasing.clone(),
            });
            return Reply::Answer {
                phrasing,
                answer,
                score,
            };
        }

        self.transition(TurnState::Teaching {
            question: normalized.clone(),
        });
        Reply::Unknown { normalized }
    }

    /// The user accepted the last answer; the turn ends.
    pub fn accept(&mut self) {
        self.transition(TurnState::Start);
    }

    /// The user rejected the last answer; a correction is expected next.
    pub fn reject(&mut self) {
        if let TurnState::Answered { phrasing } = &self.state {
            let phrasing = phrasing.clone();
            self.transition(TurnState::Correcting { phrasing });
        }
    }

    /// Learn `answer` for the pending question or correction.
    ///
    /// A pending turn ends whatever the outcome. On a save failure the new
    /// entry stays in memory for the rest of the session.
    ///
    /// # Errors
    ///
    /// Returns `NothingToLearn` outside the teaching/correcting states,
    /// `InvalidEntry` for a blank answer, and `Persistence` if saving fails.
    pub fn learn(&mut self, answer: &str) -> Result<Learned, TeachError> {
        let question = match std::mem::take(&mut self.state) {
            TurnState::Teaching { question } => question,
            // Recorded as a new entry for manual curation; lookups still
            // return the earlier entry for this phrasing.
            TurnState::Correcting { phrasing } => phrasing,
            other => {
                self.state = other.clone();
                return Err(TeachError::NothingToLearn(other));
            }
        };

        if is_skip(answer) {
            tracing::debug!(question = %question, "Teaching skipped");
            return Ok(Learned::Skipped);
        }
        self.teach(&question, answer).map(Learned::Saved)
    }

    /// Append `{questions: [question], answer}` and persist immediately.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` if the entry is invalid (nothing is appended),
    /// or `Persistence` if saving fails (the entry is kept in memory).
    pub fn teach(&mut self, question: &str, answer: &str) -> Result<SaveReport, TeachError> {
        let entry = Entry::new([question], answer.trim())?;
        self.base.append(entry);
        self.base.save(&self.path).map_err(|e| {
            tracing::warn!(error = %e, question = %question, "Learned answer not persisted");
            TeachError::Persistence(e)
        })
    }
}
