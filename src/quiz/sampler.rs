//! Question selection for the three quiz modes

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::types::QuestionId;
use crate::quiz::bank::{QuestionBank, QuizQuestion};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "domain", rename_all = "lowercase")]
pub enum QuizMode {
    /// Drawn from every domain
    Random,
    /// Drawn from one domain label
    Domain(String),
    /// Every previously missed question
    Review,
}

/// Draw a quiz in shuffled order
///
/// Random and domain quizzes hold at most `len` questions; review quizzes
/// hold every missed question still present in the bank. No question is
/// drawn twice.
pub fn select<'a, R: Rng + ?Sized>(
    bank: &'a QuestionBank,
    mode: &QuizMode,
    missed: &BTreeSet<QuestionId>,
    len: usize,
    rng: &mut R,
) -> Vec<&'a QuizQuestion> {
    let (mut pool, limit): (Vec<&QuizQuestion>, usize) = match mode {
        QuizMode::Random => (bank.questions().iter().collect(), len),
        QuizMode::Domain(domain) => (
            bank.questions()
                .iter()
                .filter(|q| &q.domain == domain)
                .collect(),
            len,
        ),
        QuizMode::Review => (
            bank.questions()
                .iter()
                .filter(|q| missed.contains(&q.id))
                .collect(),
            usize::MAX,
        ),
    };

    pool.shuffle(rng);
    pool.truncate(limit);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bank() -> QuestionBank {
        QuestionBank::builtin().unwrap()
    }

    fn ids(questions: &[&QuizQuestion]) -> Vec<u32> {
        questions.iter().map(|q| q.id.0).collect()
    }

    #[test]
    fn test_random_draws_len_without_duplicates() {
        let bank = bank();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let quiz = select(&bank, &QuizMode::Random, &BTreeSet::new(), 10, &mut rng);

        assert_eq!(quiz.len(), 10);
        let unique: BTreeSet<u32> = ids(&quiz).into_iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_same_seed_same_quiz() {
        let bank = bank();
        let first = select(
            &bank,
            &QuizMode::Random,
            &BTreeSet::new(),
            10,
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        let second = select(
            &bank,
            &QuizMode::Random,
            &BTreeSet::new(),
            10,
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_domain_quiz_stays_in_domain() {
        let bank = bank();
        let domain = "3.0 Security Architecture".to_string();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let quiz = select(&bank, &QuizMode::Domain(domain.clone()), &BTreeSet::new(), 10, &mut rng);

        assert!(!quiz.is_empty() && quiz.len() <= 10);
        assert!(quiz.iter().all(|q| q.domain == domain));
    }

    #[test]
    fn test_unknown_domain_is_empty() {
        let bank = bank();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let quiz = select(
            &bank,
            &QuizMode::Domain("9.0 Nothing".into()),
            &BTreeSet::new(),
            10,
            &mut rng,
        );
        assert!(quiz.is_empty());
    }

    #[test]
    fn test_review_returns_every_missed_question() {
        let bank = bank();
        let missed: BTreeSet<QuestionId> = (1..=15).map(QuestionId).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let quiz = select(&bank, &QuizMode::Review, &missed, 10, &mut rng);

        let drawn: BTreeSet<QuestionId> = quiz.iter().map(|q| q.id).collect();
        assert_eq!(drawn, missed);
    }

    #[test]
    fn test_review_ignores_ids_missing_from_bank() {
        let bank = bank();
        let missed: BTreeSet<QuestionId> = [QuestionId(2), QuestionId(9999)].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let quiz = select(&bank, &QuizMode::Review, &missed, 10, &mut rng);
        assert_eq!(ids(&quiz), vec![2]);
    }
}
