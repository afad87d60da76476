//! Canned record sets for demos, tests and benchmarks.

use crate::NewRecord;

const ORG_IDS: [&str; 10] = [
    "org1", "org2", "org3", "org4", "org5", "org6", "org7", "org8", "org9", "org10",
];
const GROUP_KEYS: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
const BASE_ACCOUNT_IDS: [&str; 10] = [
    "AC101", "AC102", "AC103", "AC104", "AC105", "AC106", "AC107", "AC108", "AC109", "AC110",
];

/// The nine-record sample: four distinct accounts, five repeat sightings.
pub fn sample_records() -> Vec<NewRecord> {
    [
        ("org1", "A", "AC101"),
        ("org2", "B", "AC102"),
        ("org3", "C", "AC103"),
        ("org4", "A", "AC104"),
        ("org5", "E", "AC101"),
        ("org5", "D", "AC102"),
        ("org5", "B", "AC101"),
        ("org5", "A", "AC103"),
        ("org5", "A", "AC102"),
    ]
    .into_iter()
    .map(|(org, group, account)| NewRecord::new(org, group, account))
    .collect()
}

/// Generates `count` records with a steady rate of account collisions.
///
/// Every fifth record reuses one of ten base account IDs; the rest get an
/// account ID unique to their position (`AC103-12`). Org and group cycle
/// through ten values each.
pub fn synthetic_records(count: usize) -> Vec<NewRecord> {
    (0..count)
        .map(|i| {
            let base = BASE_ACCOUNT_IDS[i % BASE_ACCOUNT_IDS.len()];
            let account_id = if i % 5 == 0 {
                base.to_string()
            } else {
                format!("{base}-{}", i / BASE_ACCOUNT_IDS.len())
            };
            NewRecord::new(
                ORG_IDS[i % ORG_IDS.len()],
                GROUP_KEYS[i % GROUP_KEYS.len()],
                account_id,
            )
        })
        .collect()
}
