//! Diff-by-id-set reconciliation shared by every sync call site.

use std::collections::HashSet;
use std::hash::Hash;

/// Outcome of reconciling a remote id set against a local one.
///
/// `to_add` and `to_update` keep the order ids appeared in the remote list;
/// `to_remove` keeps local order. The three sets are pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<K> {
    pub to_add: Vec<K>,
    pub to_update: Vec<K>,
    pub to_remove: Vec<K>,
}

impl<K> Reconciliation<K> {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

impl<K> Default for Reconciliation<K> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_update: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

/// Compute `remote - local`, `remote ∩ local` and `local - remote`.
///
/// Duplicate ids on either side are collapsed to their first occurrence.
pub fn reconcile<K>(remote_ids: &[K], local_ids: &[K]) -> Reconciliation<K>
where
    K: Eq + Hash + Clone,
{
    let local: HashSet<&K> = local_ids.iter().collect();
    let remote: HashSet<&K> = remote_ids.iter().collect();

    let mut out = Reconciliation::default();
    let mut seen = HashSet::with_capacity(remote_ids.len());
    for id in remote_ids {
        if !seen.insert(id) {
            continue;
        }
        if local.contains(id) {
            out.to_update.push(id.clone());
        } else {
            out.to_add.push(id.clone());
        }
    }

    let mut seen_local = HashSet::with_capacity(local_ids.len());
    for id in local_ids {
        if seen_local.insert(id) && !remote.contains(id) {
            out.to_remove.push(id.clone());
        }
    }
    out
}
