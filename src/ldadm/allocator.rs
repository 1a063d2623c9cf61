//! Collision-avoiding numeric ids (POSIX `uidNumber` and friends).
//!
//! Rather than scanning the whole range, the allocator draws a batch of random
//! candidates, asks each subtree in one query which of them are taken, and picks
//! among the survivors. With a sparse range one round trip per subtree is enough.

use crate::directory::Directory;
use crate::error::{LdadmError, Result};
use crate::mapping::{EntryMapping, Selection};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_CANDIDATES: usize = 50;

/// A labelled subtree to check against, e.g. `("active", <users mapping>)`.
#[derive(Debug, Clone)]
struct Subtree {
    label: String,
    mapping: EntryMapping,
}

#[derive(Debug, Clone)]
pub struct UniqueIdAllocator {
    attribute: String,
    min: u64,
    max: u64,
    candidates: usize,
    subtrees: Vec<Subtree>,
}

impl UniqueIdAllocator {
    /// Numbers for `attribute` drawn from `min..=max`.
    pub fn new(attribute: impl Into<String>, min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(LdadmError::Api(format!(
                "Invalid id range: {} is greater than {}",
                min, max
            )));
        }
        Ok(Self {
            attribute: attribute.into(),
            min,
            max,
            candidates: DEFAULT_CANDIDATES,
            subtrees: Vec::new(),
        })
    }

    pub fn with_candidates(mut self, candidates: usize) -> Self {
        self.candidates = candidates.max(1);
        self
    }

    /// Also check `mapping`'s subtree; `label` names it in `NotUnique` errors.
    pub fn with_subtree(mut self, label: impl Into<String>, mapping: EntryMapping) -> Self {
        self.subtrees.push(Subtree {
            label: label.into(),
            mapping,
        });
        self
    }

    /// A random number in range that no checked subtree uses yet.
    pub fn allocate<D: Directory, R: Rng>(&self, dir: &mut D, rng: &mut R) -> Result<u64> {
        let mut candidates: BTreeSet<u64> = (0..self.candidates)
            .map(|_| rng.gen_range(self.min..=self.max))
            .collect();

        for subtree in &self.subtrees {
            let mut numbers = subtree.mapping.clone().with_primary(self.attribute.as_str());
            numbers.select(Selection::ids(candidates.iter().map(u64::to_string)));

            let mut collisions = BTreeSet::new();
            for key in numbers.keys(dir)? {
                match key {
                    Ok(value) => {
                        if let Ok(n) = value.trim().parse::<u64>() {
                            collisions.insert(n);
                        }
                    }
                    // Free candidates are exactly the ones that were not found.
                    Err(LdadmError::MissingObjects { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            if !collisions.is_empty() {
                debug!(subtree = %subtree.label, ?collisions, "id collisions skipped");
                candidates.retain(|n| !collisions.contains(n));
            }
        }

        let remaining: Vec<u64> = candidates.into_iter().collect();
        remaining
            .choose(rng)
            .copied()
            .ok_or(LdadmError::Exhausted(self.candidates))
    }

    /// Fail if any checked subtree already has an entry whose primary attribute is
    /// `id`.
    pub fn ensure_unique<D: Directory>(&self, dir: &mut D, id: &str) -> Result<()> {
        for subtree in &self.subtrees {
            let mut existing = subtree.mapping.clone();
            existing.select(Selection::ids([id]));
            if !existing.is_empty(dir)? {
                return Err(LdadmError::NotUnique {
                    id: id.to_string(),
                    subtree: subtree.label.clone(),
                });
            }
        }
        Ok(())
    }
}
