use crate::{TempId, TempIdGenerator};
use std::collections::HashSet;

/// Outcome of assigning an ID to one record's account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// The account had not been seen in this run; it took the current ID.
    FirstSighting(TempId),
    /// The account had been seen before; a fresh ID was minted and every
    /// mapped account moved onto it.
    Collision(TempId),
}

impl Assignment {
    /// The ID stamped onto the record.
    pub const fn temp_id(self) -> TempId {
        match self {
            Self::FirstSighting(id) | Self::Collision(id) => id,
        }
    }
}

/// Per-run grouping state.
///
/// Holds the known-account set, the account→ID mapping and the current
/// global ID. A value lives for exactly one job execution.
///
/// ## Mapping representation
///
/// Every entry of the account→ID mapping always equals the current ID: a new
/// entry takes the current value, and a collision rewrites every entry to the
/// freshly minted one. The mapping is therefore kept as the set of mapped
/// accounts and resolved against the current ID on lookup. A collision costs
/// O(1) instead of a rewrite of every mapped account, and every lookup answers
/// exactly what the rewritten map would.
///
/// Preloaded accounts are known but not mapped until they are seen again,
/// which keeps `mapped ⊆ known`.
#[derive(Debug, Clone)]
pub struct RunState {
    known: HashSet<String>,
    mapped: HashSet<String>,
    current: TempId,
    collisions: u64,
    processed: u64,
}

impl RunState {
    /// Creates an empty state whose current ID is `initial`.
    pub fn new(initial: TempId) -> Self {
        Self {
            known: HashSet::new(),
            mapped: HashSet::new(),
            current: initial,
            collisions: 0,
            processed: 0,
        }
    }

    /// Marks accounts as already known without mapping them.
    pub fn preload<I>(&mut self, accounts: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.known.extend(accounts);
    }

    /// Runs the grouping decision for one account and returns the ID to stamp.
    ///
    /// The caller must hold exclusive access for the whole call: the
    /// membership test, the possible mint and the mapping update form a
    /// single decision.
    pub fn assign<G>(&mut self, account_id: &str, generator: &G) -> Assignment
    where
        G: TempIdGenerator + ?Sized,
    {
        self.processed += 1;

        if self.known.contains(account_id) {
            self.current = generator.next_id();
            self.collisions += 1;
            Assignment::Collision(self.current)
        } else {
            self.known.insert(account_id.to_owned());
            self.mapped.insert(account_id.to_owned());
            Assignment::FirstSighting(self.current)
        }
    }

    /// The ID that the next first-sighted account will take.
    pub const fn current(&self) -> TempId {
        self.current
    }

    /// Looks up the ID mapped to `account_id`, if the account is mapped.
    pub fn account_temp_id(&self, account_id: &str) -> Option<TempId> {
        self.mapped.contains(account_id).then_some(self.current)
    }

    pub fn is_known(&self, account_id: &str) -> bool {
        self.known.contains(account_id)
    }

    pub fn known_accounts(&self) -> &HashSet<String> {
        &self.known
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn mapped_len(&self) -> usize {
        self.mapped.len()
    }

    /// Number of collisions, i.e. IDs minted after the initial one.
    pub const fn collisions(&self) -> u64 {
        self.collisions
    }

    pub const fn processed(&self) -> u64 {
        self.processed
    }
}
