use crate::{
    AtomicTempIdGenerator, Grouper, MemoryStore, Record, RecordId, RunState, TempId,
    TempIdGenerator, seed::sample_records,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::scope;

fn sample() -> Vec<Record> {
    sample_records()
        .into_iter()
        .enumerate()
        .map(|(i, new)| Record::from_new(RecordId(i as i64 + 1), new))
        .collect()
}

fn record(id: i64, account: &str) -> Record {
    Record {
        id: RecordId(id),
        org_id: "org".to_string(),
        group_key: "A".to_string(),
        account_id: account.to_string(),
        temp_id: None,
    }
}

#[test]
fn sample_sequence_mints_once_per_repeat_sighting() {
    let grouper = Grouper::new(AtomicTempIdGenerator::new(), 10_000);
    let stamped: Vec<_> = sample()
        .into_iter()
        .map(|r| grouper.process(r).temp_id.unwrap().to_raw())
        .collect();

    // Four first sightings share the seed ID, then each of the five repeats
    // mints the next one.
    assert_eq!(stamped, vec![0, 0, 0, 0, 1, 2, 3, 4, 5]);
    assert_eq!(grouper.collisions(), 5);
    assert_eq!(grouper.processed(), 9);
    assert_eq!(grouper.known_len(), 4);

    let finalized = grouper.finalize();
    assert_eq!(finalized.temp_id.to_string(), "T00000000000005");
    let expected: HashSet<String> = ["AC101", "AC102", "AC103", "AC104"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(finalized.accounts, expected);
}

#[test]
fn distinct_accounts_never_mint() {
    let generator = AtomicTempIdGenerator::new();
    let grouper = Grouper::new(&generator, 0);
    for i in 0..100 {
        let out = grouper.process(record(i, &format!("ACC-{i}")));
        assert_eq!(out.temp_id, Some(TempId::from_raw(0)));
    }
    assert_eq!(grouper.collisions(), 0);
    // Only the seed ID was drawn.
    assert_eq!(generator.minted(), 1);
}

#[test]
fn collision_moves_every_mapped_account_to_the_new_id() {
    let generator = AtomicTempIdGenerator::new();
    let mut state = RunState::new(generator.next_id());

    state.assign("A", &generator);
    state.assign("B", &generator);
    assert_eq!(state.account_temp_id("A"), Some(TempId::from_raw(0)));

    let minted = state.assign("A", &generator).temp_id();
    assert_eq!(minted, TempId::from_raw(1));
    assert_eq!(state.account_temp_id("A"), Some(minted));
    assert_eq!(state.account_temp_id("B"), Some(minted));

    // Accounts first seen after the collision take the current ID as-is.
    state.assign("C", &generator);
    assert_eq!(state.account_temp_id("C"), Some(minted));
    assert_eq!(state.account_temp_id("missing"), None);
}

#[test]
fn preloaded_accounts_are_known_but_unmapped() {
    let generator = AtomicTempIdGenerator::new();
    let mut state = RunState::new(generator.next_id());
    state.preload(["AC101".to_string()]);

    assert!(state.is_known("AC101"));
    assert_eq!(state.account_temp_id("AC101"), None);

    // The first sighting of a preloaded account already counts as a collision.
    let assignment = state.assign("AC101", &generator);
    assert_eq!(assignment.temp_id(), TempId::from_raw(1));
    assert_eq!(state.collisions(), 1);
    assert_eq!(state.account_temp_id("AC101"), None);
    assert!(state.mapped_len() <= state.known_len());
}

#[test]
fn finalize_is_idempotent() {
    let grouper = Grouper::new(AtomicTempIdGenerator::new(), 0);
    for r in sample() {
        grouper.process(r);
    }
    let first = grouper.finalize();
    let second = grouper.finalize();
    assert_eq!(first, second);
    assert_eq!(grouper.current_temp_id(), first.temp_id);
}

#[test]
fn concurrent_processing_keeps_decisions_atomic() {
    const THREADS: usize = 8;
    const ACCOUNTS: usize = 500;
    const ROUNDS: usize = 4;

    let grouper = Arc::new(Grouper::new(AtomicTempIdGenerator::new(), 0));

    scope(|s| {
        for t in 0..THREADS {
            let grouper = Arc::clone(&grouper);
            s.spawn(move || {
                for round in 0..ROUNDS {
                    for a in 0..ACCOUNTS {
                        let id = (t * ROUNDS * ACCOUNTS + round * ACCOUNTS + a) as i64;
                        grouper.process(record(id, &format!("ACC-{a}")));
                    }
                }
            });
        }
    });

    // Each account is first-sighted exactly once; every other sighting is a
    // collision. Any lost update would break this count.
    let total = (THREADS * ROUNDS * ACCOUNTS) as u64;
    assert_eq!(grouper.processed(), total);
    assert_eq!(grouper.known_len(), ACCOUNTS);
    assert_eq!(grouper.collisions(), total - ACCOUNTS as u64);
    assert_eq!(grouper.current_temp_id().to_raw(), grouper.collisions());
}

#[tokio::test]
async fn preload_respects_threshold() {
    let store = MemoryStore::new();
    store.insert_all(sample_records());

    let below = Grouper::new(AtomicTempIdGenerator::new(), 0);
    assert_eq!(below.preload(&store, 100).await, 4);
    assert_eq!(below.known_len(), 4);

    let above = Grouper::new(AtomicTempIdGenerator::new(), 0);
    assert_eq!(above.preload(&store, 4).await, 0);
    assert_eq!(above.known_len(), 0);
}
