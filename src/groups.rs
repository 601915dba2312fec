//! Online equivalence tracking with negative facts.
//!
//! Pairwise content comparison is quadratic within a candidate cluster, but
//! most verdicts are implied by earlier ones: if `a == b` and `b == c` the
//! pair `(a, c)` needs no comparison, and if additionally `b != d` then
//! neither does `(a, d)`. [`GroupHandler`] ingests positive and negative
//! pair facts and answers whether a pending pair is still informative.
//!
//! Negative facts are attached to group ids rather than individual members,
//! so they survive merges: when a group is dissolved into another, every
//! negative-set reference to the dissolved id is rewritten to the survivor.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Mutex;

/// Identifier of an equivalence group, minted per run.
pub type GroupId = u64;

/// Tracks proven-equal and proven-distinct relations between items.
///
/// Every public method serializes on one internal lock; the comparison
/// stage is I/O-bound on file bytes, so contention here is not the
/// bottleneck.
#[derive(Debug)]
pub struct GroupHandler<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for GroupHandler<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    groups: HashMap<T, GroupId>,
    members: HashMap<GroupId, Vec<T>>,
    negative: HashMap<T, HashSet<GroupId>>,
    next_id: GroupId,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
            members: HashMap::new(),
            negative: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> GroupHandler<T>
where
    T: Clone + Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Record that `a` and `b` were proven equal.
    ///
    /// Prefers `a`'s existing group id when both are known; adopts the
    /// known side's id when only one is; mints a fresh group when neither
    /// is. Dissolving `b`'s group rewrites every negative-set reference to
    /// it so recorded distinctions keep holding for the merged group.
    pub fn add_same(&self, a: &T, b: &T) {
        let mut inner = self.inner.lock().unwrap();
        let group_a = inner.groups.get(a).copied();
        let group_b = inner.groups.get(b).copied();

        match (group_a, group_b) {
            (Some(ga), Some(gb)) => {
                if ga == gb {
                    return;
                }
                let moved = inner.members.remove(&gb).unwrap_or_default();
                for member in &moved {
                    inner.groups.insert(member.clone(), ga);
                }
                inner.members.entry(ga).or_default().extend(moved);
                for negatives in inner.negative.values_mut() {
                    if negatives.remove(&gb) {
                        negatives.insert(ga);
                    }
                }
            }
            (Some(ga), None) => {
                inner.groups.insert(b.clone(), ga);
                inner.members.entry(ga).or_default().push(b.clone());
            }
            (None, Some(gb)) => {
                inner.groups.insert(a.clone(), gb);
                inner.members.entry(gb).or_default().push(a.clone());
            }
            (None, None) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.groups.insert(a.clone(), id);
                inner.groups.insert(b.clone(), id);
                inner.members.insert(id, vec![a.clone(), b.clone()]);
            }
        }
    }

    /// Record that `a` and `b` were proven distinct.
    ///
    /// Sides without a group get a fresh singleton group first; each side
    /// then lists the other's group in its negative set.
    pub fn add_different(&self, a: &T, b: &T) {
        let mut inner = self.inner.lock().unwrap();
        let ga = ensure_group(&mut inner, a);
        let gb = ensure_group(&mut inner, b);
        inner.negative.entry(a.clone()).or_default().insert(gb);
        inner.negative.entry(b.clone()).or_default().insert(ga);
    }

    /// Whether comparing `a` and `b` would still be informative.
    ///
    /// Returns `false` when the pair is already decided: both sides share a
    /// group, or either side's negative set names the other's group.
    #[must_use]
    pub fn should_process(&self, a: &T, b: &T) -> bool {
        let inner = self.inner.lock().unwrap();
        let (Some(&ga), Some(&gb)) = (inner.groups.get(a), inner.groups.get(b)) else {
            return true;
        };
        if ga == gb {
            return false;
        }
        if inner
            .negative
            .get(a)
            .is_some_and(|negatives| negatives.contains(&gb))
        {
            return false;
        }
        if inner
            .negative
            .get(b)
            .is_some_and(|negatives| negatives.contains(&ga))
        {
            return false;
        }
        true
    }

    /// Produce the groups of size >= 2.
    #[must_use]
    pub fn build_grouped_list(&self) -> HashMap<GroupId, Vec<T>> {
        let inner = self.inner.lock().unwrap();
        inner
            .members
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(&id, members)| (id, members.clone()))
            .collect()
    }
}

fn ensure_group<T>(inner: &mut Inner<T>, value: &T) -> GroupId
where
    T: Clone + Eq + Hash,
{
    if let Some(&id) = inner.groups.get(value) {
        return id;
    }
    let id = inner.next_id;
    inner.next_id += 1;
    inner.groups.insert(value.clone(), id);
    inner.members.insert(id, vec![value.clone()]);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_pair_should_process() {
        let handler: GroupHandler<&'static str> = GroupHandler::new();
        assert!(handler.should_process(&"a", &"b"));
    }

    #[test]
    fn test_same_group_is_elided() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        assert!(!handler.should_process(&"a", &"b"));
        assert!(!handler.should_process(&"b", &"a"));
    }

    #[test]
    fn test_different_group_is_elided() {
        let handler = GroupHandler::new();
        handler.add_different(&"a", &"b");
        assert!(!handler.should_process(&"a", &"b"));
        assert!(!handler.should_process(&"b", &"a"));
    }

    #[test]
    fn test_transitive_equality() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_same(&"b", &"c");
        assert!(!handler.should_process(&"a", &"c"));
    }

    #[test]
    fn test_negative_fact_spreads_over_group() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_different(&"b", &"c");
        assert!(!handler.should_process(&"a", &"c"));
    }

    #[test]
    fn test_negative_facts_survive_merges() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_same(&"c", &"d");
        handler.add_different(&"a", &"c");
        // b vs d is decided: b's group differs from d's group by the
        // recorded a-c distinction.
        assert!(!handler.should_process(&"b", &"d"));
    }

    #[test]
    fn test_merge_rewrites_dissolved_group_in_negatives() {
        let handler = GroupHandler::new();
        handler.add_different(&"x", &"b");
        handler.add_same(&"a", &"b");
        // a adopted b's group, so the x-b distinction also decides x vs a.
        assert!(!handler.should_process(&"x", &"a"));

        // Now force an actual merge of two known groups.
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_same(&"c", &"d");
        handler.add_different(&"x", &"c");
        handler.add_same(&"a", &"c");
        assert!(!handler.should_process(&"x", &"b"));
        assert!(!handler.should_process(&"x", &"d"));
    }

    #[test]
    fn test_redundant_same_fact_is_harmless() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_same(&"a", &"b");
        handler.add_same(&"b", &"a");

        let grouped = handler.build_grouped_list();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.values().next().unwrap().len(), 2);
    }

    #[test]
    fn test_grouped_list_filters_singletons() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_different(&"a", &"c");

        let grouped = handler.build_grouped_list();
        // c sits in a singleton group and must not be reported.
        assert_eq!(grouped.len(), 1);
        let members = grouped.values().next().unwrap();
        assert!(members.contains(&"a"));
        assert!(members.contains(&"b"));
    }

    #[test]
    fn test_groups_after_merge_share_one_id() {
        let handler = GroupHandler::new();
        handler.add_same(&"a", &"b");
        handler.add_same(&"c", &"d");
        handler.add_same(&"b", &"c");

        let grouped = handler.build_grouped_list();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped.values().next().unwrap().len(), 4);
    }
}
