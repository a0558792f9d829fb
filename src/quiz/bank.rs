//! Practice question bank

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::core::error::{PbqError, Result};
use crate::core::types::QuestionId;

const BUILTIN_QUESTIONS: &str = include_str!("../../data/questions.toml");

/// Options every question carries
pub const OPTION_COUNT: usize = 4;

/// One multiple-choice practice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub domain: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_answer
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(self.correct_answer).map(String::as_str)
    }
}

#[derive(Deserialize)]
struct BankFile {
    questions: Vec<QuizQuestion>,
}

/// Validated questions in authored order
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
    index: AHashMap<QuestionId, usize>,
}

impl QuestionBank {
    /// The bank compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::parse("questions.toml", BUILTIN_QUESTIONS)
    }

    pub fn parse(source_name: &str, content: &str) -> Result<Self> {
        let file: BankFile = toml::from_str(content).map_err(|e| {
            PbqError::invalid_content(source_name, vec![format!("parse error: {}", e)])
        })?;
        Self::from_questions(file.questions)
            .map_err(|problems| PbqError::invalid_content(source_name, problems))
    }

    /// Build a bank, collecting every problem found
    pub fn from_questions(questions: Vec<QuizQuestion>) -> std::result::Result<Self, Vec<String>> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for q in &questions {
            if !seen.insert(q.id) {
                problems.push(format!("duplicate question id {}", q.id));
            }
            if q.options.len() != OPTION_COUNT {
                problems.push(format!(
                    "question {} has {} options, expected {}",
                    q.id,
                    q.options.len(),
                    OPTION_COUNT
                ));
            }
            if q.correct_answer >= q.options.len() {
                problems.push(format!(
                    "question {} correct answer {} is out of range",
                    q.id, q.correct_answer
                ));
            }
            if q.domain.trim().is_empty() {
                problems.push(format!("question {} has no domain", q.id));
            }
        }

        if !problems.is_empty() {
            return Err(problems);
        }

        let index = questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id, i))
            .collect();
        Ok(Self { questions, index })
    }

    pub fn get(&self, id: QuestionId) -> Option<&QuizQuestion> {
        self.index.get(&id).map(|&i| &self.questions[i])
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Unique domain labels, sorted
    pub fn domains(&self) -> Vec<&str> {
        let domains: BTreeSet<&str> = self.questions.iter().map(|q| q.domain.as_str()).collect();
        domains.into_iter().collect()
    }

    pub fn in_domain<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a QuizQuestion> + 'a {
        self.questions.iter().filter(move |q| q.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, domain: &str) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId(id),
            domain: domain.to_string(),
            question: format!("Question {}", id),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_builtin_bank_loads() {
        let bank = QuestionBank::builtin().unwrap();
        assert_eq!(bank.len(), 120);
        assert_eq!(bank.domains().len(), 5);
        assert_eq!(bank.domains()[0], "1.0 General Security Concepts");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let problems =
            QuestionBank::from_questions(vec![question(1, "A"), question(1, "B")]).unwrap_err();
        assert!(problems[0].contains("duplicate question id 1"));
    }

    #[test]
    fn test_out_of_range_answer_rejected() {
        let mut bad = question(7, "A");
        bad.correct_answer = 4;
        let problems = QuestionBank::from_questions(vec![bad]).unwrap_err();
        assert!(problems.iter().any(|p| p.contains("out of range")));
    }

    #[test]
    fn test_domain_filter() {
        let bank = QuestionBank::from_questions(vec![
            question(1, "A"),
            question(2, "B"),
            question(3, "A"),
        ])
        .unwrap();
        let ids: Vec<u32> = bank.in_domain("A").map(|q| q.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(bank.domains(), vec!["A", "B"]);
        assert!(bank.get(QuestionId(2)).unwrap().is_correct(0));
    }
}
