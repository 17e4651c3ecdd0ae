// src/session/ledger.rs

use std::collections::BTreeMap;

/// The student's current selection per question.
///
/// Entries may be overwritten but never removed. Once frozen the ledger
/// is read-only.
#[derive(Debug, Clone, Default)]
pub struct AnswerLedger {
    answers: BTreeMap<String, usize>,
    frozen: bool,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `option` for `question_id`, last write wins.
    /// The index is stored as given; scoring happens on the portal.
    pub fn select(&mut self, question_id: &str, option: usize) -> bool {
        if self.frozen {
            tracing::debug!("Ledger frozen, dropping answer for {}", question_id);
            return false;
        }
        self.answers.insert(question_id.to_string(), option);
        true
    }

    pub fn selection(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// An owned copy, unaffected by later mutation.
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.answers.clone()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }
}
