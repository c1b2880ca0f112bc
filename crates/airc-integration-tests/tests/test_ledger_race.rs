//! # Ledger Append Races
//!
//! Two writers seal competing successors of the same version and append
//! them at the same moment. Exactly one must land; the other must see
//! `ConcurrentReassessment` and the chain must stay intact. Runs against
//! the in-memory store, one file store, and two file stores sharing a
//! directory (no shared lock, so the hard link decides).

use std::sync::{Arc, Barrier};

use airc_classify::questions::keys;
use airc_classify::ClassificationOrchestrator;
use airc_core::{
    Answer, AnswerMap, EngineError, Profile, SubjectId, Timestamp, TriState, VersionNumber,
    YesNoUnknown,
};
use airc_ledger::{
    verify_subject, ClassificationVersion, FileLedger, InMemoryLedger, LedgerStore,
    PendingVersion, VersionOrigin,
};
use airc_state::TriggerReason;

fn answers(high_risk_yes: bool) -> AnswerMap {
    let mut answers = AnswerMap::new();
    for key in [
        keys::DEF_INFERS_OUTPUTS,
        keys::DEF_USES_INFERENCE,
        keys::DEF_OPERATES_AUTONOMOUSLY,
    ]
    .into_iter()
    .chain(keys::PROHIBITED)
    .chain(keys::HIGH_RISK)
    {
        answers.insert(key.to_string(), Answer::TriState(TriState::No));
    }
    for key in keys::TRANSPARENCY {
        answers.insert(key.to_string(), Answer::YesNoUnknown(YesNoUnknown::No));
    }
    if high_risk_yes {
        answers.insert(
            keys::HIGH_RISK[1].to_string(),
            Answer::TriState(TriState::Yes),
        );
    }
    answers
}

fn sealed_successor(
    s: SubjectId,
    previous: Option<&ClassificationVersion>,
    high_risk_yes: bool,
    origin: VersionOrigin,
) -> ClassificationVersion {
    let outcome = ClassificationOrchestrator::new()
        .classify(&Profile::new(s, answers(high_risk_yes)))
        .unwrap();
    PendingVersion::from_outcome(
        s,
        VersionNumber::after(previous.map(ClassificationVersion::number)),
        outcome,
        origin,
        Timestamp::now(),
    )
    .seal(previous)
    .unwrap()
}

fn race(ledger: Arc<dyn LedgerStore>, rival: Arc<dyn LedgerStore>) {
    let s = SubjectId::new();
    let v1 = sealed_successor(s, None, false, VersionOrigin::Initial);
    ledger.append(None, v1.clone()).unwrap();

    let rerun = sealed_successor(s, Some(&v1), false, VersionOrigin::Rerun);
    let reassessed = sealed_successor(
        s,
        Some(&v1),
        true,
        VersionOrigin::Reassessment {
            reasons: vec![TriggerReason::CriticalIncident {
                incident: "INC-42".into(),
            }],
        },
    );
    assert_ne!(rerun.digest(), reassessed.digest());

    let start = Barrier::new(2);
    let expected = Some(v1.number());
    let results: Vec<Result<(), EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = [(ledger.clone(), rerun.clone()), (rival, reassessed.clone())]
            .into_iter()
            .map(|(ledger, candidate)| {
                let start = &start;
                scope.spawn(move || {
                    start.wait();
                    ledger.append(expected, candidate)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "results: {results:?}");
    let loser = results.into_iter().find(Result::is_err).unwrap();
    assert!(matches!(
        loser,
        Err(EngineError::ConcurrentReassessment { expected: 1, found: 2, .. })
    ));

    let history = ledger.history(s).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], v1);
    assert!(history[1] == rerun || history[1] == reassessed);
    assert!(verify_subject(ledger.as_ref(), s).unwrap().intact);
}

#[test]
fn in_memory_ledger_admits_one_successor() {
    for _ in 0..20 {
        let ledger = Arc::new(InMemoryLedger::new());
        race(ledger.clone(), ledger);
    }
}

#[test]
fn file_ledger_admits_one_successor() {
    for _ in 0..20 {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(FileLedger::new(dir.path()));
        race(ledger.clone(), ledger);
    }
}

#[test]
fn file_ledgers_sharing_a_directory_admit_one_successor() {
    for _ in 0..20 {
        let dir = tempfile::tempdir().unwrap();
        race(
            Arc::new(FileLedger::new(dir.path())),
            Arc::new(FileLedger::new(dir.path())),
        );
    }
}
