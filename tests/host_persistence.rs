//! Host state persisted through the file store

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pbq_labs::core::types::{Difficulty, DifficultyFilter, ModuleId, QuestionId};
use pbq_labs::host::lab_host::PROGRESS_KEY;
use pbq_labs::host::{Clearance, FileStore, KeyValueStore, LabHost, ModuleView, Namespace};
use pbq_labs::quiz::QuizMode;
use pbq_labs::simulation::{Action, ModuleRun};

fn open_host(dir: &std::path::Path) -> LabHost<FileStore> {
    LabHost::with_builtin_content(FileStore::open(dir).unwrap()).unwrap()
}

fn pass_cloud(host: &mut LabHost<FileStore>) {
    let ModuleView::Lab(cloud) = host.open(&ModuleId::from("cloud")) else {
        panic!("cloud should be authored");
    };
    let mut run = ModuleRun::new(&cloud);
    for finding in [
        "prod-customer-data bucket has public access enabled",
        "prod-customer-data bucket lacks encryption",
        "SSH (port 22) exposed to internet on web-servers-sg",
        "admin-backup has full admin access (*:*) without MFA",
        "prod-logs bucket is secure",
    ] {
        run.apply(&Action::ToggleMembership {
            set: "findings".into(),
            item: finding.into(),
        })
        .unwrap();
    }
    let verdict = run.submit(host).unwrap();
    assert!(verdict.passed);
    assert_eq!(verdict.score, 90);
    run.exit(host);
}

#[test]
fn test_progress_and_user_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut host = open_host(dir.path());
        host.login("analyst").unwrap();
        pass_cloud(&mut host);
        host.set_filter(DifficultyFilter::Only(Difficulty::Advanced)).unwrap();
    }

    let host = open_host(dir.path());
    assert_eq!(host.current_user(), Some("analyst"));
    assert_eq!(host.progress().get(&ModuleId::from("cloud")), Some(&90));
    // The filter lives in the session namespace only
    assert_eq!(host.filter(), DifficultyFilter::All);

    let stats = host.dashboard();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.average_score, 90);
    assert_eq!(stats.clearance, Clearance::Trainee);
}

#[test]
fn test_progress_is_namespaced_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = open_host(dir.path());
    host.login("first").unwrap();
    pass_cloud(&mut host);

    host.login("second").unwrap();
    assert!(host.progress().is_empty());

    host.logout().unwrap();
    let host = open_host(dir.path());
    assert_eq!(host.current_user(), None);

    let raw = host.store().get(Namespace::Durable, PROGRESS_KEY).unwrap();
    let all: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(all["first"]["cloud"], 90);
}

#[test]
fn test_completion_without_user_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = open_host(dir.path());
    pass_cloud(&mut host);
    assert!(host.store().get(Namespace::Durable, PROGRESS_KEY).is_none());
}

#[test]
fn test_quiz_results_feed_review_mode() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut host = open_host(dir.path());
        let mut attempt = host.start_quiz(&QuizMode::Random, &mut ChaCha8Rng::seed_from_u64(11));
        assert_eq!(attempt.len(), 10);

        // Answer everything wrong
        while let Some(question) = attempt.current() {
            let wrong = (question.correct_answer + 1) % question.options.len();
            attempt.answer(wrong).unwrap();
            attempt.advance().unwrap();
        }
        assert_eq!(attempt.percentage(), 0);
        host.record_quiz(&attempt.results()).unwrap();
    }

    let mut host = open_host(dir.path());
    assert_eq!(host.missed().len(), 10);

    let mut review = host.start_quiz(&QuizMode::Review, &mut ChaCha8Rng::seed_from_u64(2));
    assert_eq!(review.len(), 10);
    while let Some(question) = review.current() {
        let right = question.correct_answer;
        review.answer(right).unwrap();
        review.advance().unwrap();
    }
    host.record_quiz(&review.results()).unwrap();
    assert!(host.missed().is_empty());

    let host = open_host(dir.path());
    assert!(host.missed().is_empty());
    assert!(!host.missed().contains(&QuestionId(1)));
}
