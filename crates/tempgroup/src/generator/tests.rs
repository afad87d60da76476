use crate::{AtomicTempIdGenerator, ParseTempIdError, TempId, TempIdGenerator};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::scope;

fn is_well_formed(token: &str) -> bool {
    token.len() == 15
        && token.starts_with('T')
        && token[1..].bytes().all(|b| b.is_ascii_digit())
}

#[test]
fn first_id_is_all_zeros() {
    let generator = AtomicTempIdGenerator::new();
    assert_eq!(generator.next_id().to_string(), "T00000000000000");
}

#[test]
fn ids_increase_by_one() {
    let generator = AtomicTempIdGenerator::new();
    let a = generator.next_id();
    let b = generator.next_id();
    let c = generator.next_id();

    assert_eq!(a.to_raw() + 1, b.to_raw());
    assert_eq!(b.to_raw() + 1, c.to_raw());
    assert!(a < b && b < c);
    assert_eq!(generator.minted(), 3);
}

#[test]
fn starting_at_seeds_the_suffix() {
    let generator = AtomicTempIdGenerator::starting_at(41);
    assert_eq!(generator.next_id().to_string(), "T00000000000041");
    assert_eq!(generator.next_id().to_string(), "T00000000000042");
    assert_eq!(generator.minted(), 2);
}

#[test]
fn rendering_keeps_fixed_width() {
    for raw in [0, 7, 1_234, 99_999_999_999_999] {
        let token = TempId::from_raw(raw).to_string();
        assert!(is_well_formed(&token), "malformed token {token}");
    }
    assert_eq!(
        TempId::from_raw(99_999_999_999_999).to_string(),
        "T99999999999999"
    );
}

#[test]
fn parse_accepts_rendered_tokens() {
    let id: TempId = "T00000000000123".parse().unwrap();
    assert_eq!(id, TempId::from_raw(123));
}

#[test]
fn parse_rejects_malformed_tokens() {
    assert_eq!(
        "T123".parse::<TempId>(),
        Err(ParseTempIdError::InvalidLength(4))
    );
    assert_eq!(
        "X00000000000123".parse::<TempId>(),
        Err(ParseTempIdError::MissingPrefix)
    );
    assert_eq!(
        "T0000000000012a".parse::<TempId>(),
        Err(ParseTempIdError::InvalidDigit)
    );
    assert_eq!(
        "T+0000000000012".parse::<TempId>(),
        Err(ParseTempIdError::InvalidDigit)
    );
}

#[test]
fn concurrent_callers_never_share_an_id() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10_000;

    let generator = Arc::new(AtomicTempIdGenerator::new());
    let per_thread: Vec<Vec<TempId>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let generator = Arc::clone(&generator);
                s.spawn(move || {
                    let ids: Vec<_> = (0..PER_THREAD).map(|_| generator.next_id()).collect();
                    // Each caller observes its own draws in increasing order.
                    assert!(ids.windows(2).all(|w| w[0] < w[1]));
                    ids
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(THREADS * PER_THREAD);
    for id in per_thread.into_iter().flatten() {
        assert!(seen.insert(id), "Duplicate ID detected: {id}");
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert_eq!(generator.minted(), (THREADS * PER_THREAD) as u64);

    // No gaps either: the draws cover exactly 0..N.
    let max = seen.iter().max().copied().unwrap();
    assert_eq!(max.to_raw(), (THREADS * PER_THREAD - 1) as u64);
}

#[cfg(feature = "serde")]
#[test]
fn serde_uses_rendered_form() {
    let id = TempId::from_raw(5);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"T00000000000005\"");
    let back: TempId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<TempId>("\"T5\"").is_err());
}
