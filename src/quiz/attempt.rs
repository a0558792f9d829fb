//! State of one quiz sitting

use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::types::QuestionId;
use crate::quiz::bank::QuizQuestion;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("this question has already been answered")]
    AlreadyAnswered,
    #[error("answer the current question before moving on")]
    NotAnswered,
    #[error("option {0} does not exist")]
    NoSuchOption(usize),
    #[error("the quiz is finished")]
    Finished,
}

/// Per-question result reported to the host when the quiz ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
}

/// A quiz in progress: one answer per question, in order
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    questions: Vec<QuizQuestion>,
    answers: Vec<Option<usize>>,
    current: usize,
    started: Instant,
    finished: Option<Duration>,
}

impl QuizAttempt {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            answers,
            current: 0,
            started: Instant::now(),
            finished: None,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        if self.is_finished() {
            return None;
        }
        self.questions.get(self.current)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some() || self.questions.is_empty()
    }

    /// Record the answer to the current question; returns whether it was right
    pub fn answer(&mut self, choice: usize) -> Result<bool, AttemptError> {
        let question = self.current().ok_or(AttemptError::Finished)?;
        if choice >= question.options.len() {
            return Err(AttemptError::NoSuchOption(choice));
        }
        let correct = question.is_correct(choice);
        let slot = &mut self.answers[self.current];
        if slot.is_some() {
            return Err(AttemptError::AlreadyAnswered);
        }
        *slot = Some(choice);
        Ok(correct)
    }

    /// Move past an answered question; the last advance finishes the quiz
    pub fn advance(&mut self) -> Result<(), AttemptError> {
        if self.is_finished() {
            return Err(AttemptError::Finished);
        }
        if self.answers[self.current].is_none() {
            return Err(AttemptError::NotAnswered);
        }
        if self.current + 1 == self.questions.len() {
            self.finished = Some(self.started.elapsed());
        } else {
            self.current += 1;
        }
        Ok(())
    }

    /// Time spent so far, frozen once finished
    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn correct_count(&self) -> usize {
        self.results().iter().filter(|r| r.correct).count()
    }

    /// Percentage of questions answered correctly, rounded
    pub fn percentage(&self) -> u8 {
        if self.questions.is_empty() {
            return 0;
        }
        ((self.correct_count() as f64 / self.questions.len() as f64) * 100.0).round() as u8
    }

    /// Unanswered questions count as incorrect
    pub fn results(&self) -> Vec<QuestionResult> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, answer)| QuestionResult {
                question_id: q.id,
                correct: answer.map_or(false, |a| q.is_correct(a)),
            })
            .collect()
    }

    /// Review listing: each question with the learner's answer and correctness
    pub fn review(&self, incorrect_only: bool) -> Vec<(&QuizQuestion, Option<usize>, bool)> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, answer)| (q, *answer, answer.map_or(false, |a| q.is_correct(a))))
            .filter(|(_, _, correct)| !incorrect_only || !correct)
            .collect()
    }
}

/// `mm:ss` display of a duration
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: u32) -> Vec<QuizQuestion> {
        (1..=n)
            .map(|id| QuizQuestion {
                id: QuestionId(id),
                domain: "1.0 General Security Concepts".into(),
                question: format!("Q{}", id),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: 1,
                explanation: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_answer_once() {
        let mut attempt = QuizAttempt::new(questions(2));
        assert_eq!(attempt.answer(1), Ok(true));
        assert_eq!(attempt.answer(0), Err(AttemptError::AlreadyAnswered));
    }

    #[test]
    fn test_must_answer_before_advancing() {
        let mut attempt = QuizAttempt::new(questions(2));
        assert_eq!(attempt.advance(), Err(AttemptError::NotAnswered));
    }

    #[test]
    fn test_full_sitting() {
        let mut attempt = QuizAttempt::new(questions(4));
        for choice in [1, 0, 1, 1] {
            attempt.answer(choice).unwrap();
            attempt.advance().unwrap();
        }

        assert!(attempt.is_finished());
        assert!(attempt.current().is_none());
        assert_eq!(attempt.correct_count(), 3);
        assert_eq!(attempt.percentage(), 75);
        assert_eq!(attempt.answer(1), Err(AttemptError::Finished));

        let wrong = attempt.review(true);
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].0.id, QuestionId(2));
        assert_eq!(wrong[0].1, Some(0));
        assert_eq!(attempt.review(false).len(), 4);
    }

    #[test]
    fn test_results_mark_each_question() {
        let mut attempt = QuizAttempt::new(questions(2));
        attempt.answer(3).unwrap();
        let results = attempt.results();
        assert_eq!(
            results,
            vec![
                QuestionResult {
                    question_id: QuestionId(1),
                    correct: false
                },
                QuestionResult {
                    question_id: QuestionId(2),
                    correct: false
                },
            ]
        );
    }

    #[test]
    fn test_option_out_of_range() {
        let mut attempt = QuizAttempt::new(questions(1));
        assert_eq!(attempt.answer(4), Err(AttemptError::NoSuchOption(4)));
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00");
    }
}
