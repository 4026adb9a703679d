//! Two-way text-append conflict resolution.

use crate::sync::models::{Delta, PlainContent};

/// Inserted between the remote and local halves of a merged note.
pub const CONFLICT_DIVIDER: &str = "\n====== On this computer: ======\n\n";

pub struct ConflictResolver;

impl ConflictResolver {
    /// Merge diverging local and remote versions of the same note.
    ///
    /// The result is the remote deltas, then a divider, then the local
    /// deltas. Nothing is dropped and the divider is present even when
    /// one side is empty.
    pub fn resolve(local: &PlainContent, remote: &PlainContent) -> PlainContent {
        let mut ops = Vec::with_capacity(remote.ops.len() + local.ops.len() + 1);
        ops.extend(remote.ops.iter().cloned());
        ops.push(Delta::insert(CONFLICT_DIVIDER));
        ops.extend(local.ops.iter().cloned());
        PlainContent { ops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_then_divider_then_local() {
        let local = PlainContent::text("Local");
        let remote = PlainContent::text("Hi there");

        let merged = ConflictResolver::resolve(&local, &remote);
        assert_eq!(
            merged.ops,
            vec![
                Delta::insert("Hi there"),
                Delta::insert(CONFLICT_DIVIDER),
                Delta::insert("Local"),
            ]
        );
    }

    #[test]
    fn resolve_is_deterministic() {
        let local = PlainContent::new(vec![Delta::insert("a"), Delta::insert("b")]);
        let remote = PlainContent::new(vec![Delta::insert("c")]);

        let first = serde_json::to_vec(&ConflictResolver::resolve(&local, &remote)).unwrap();
        let second = serde_json::to_vec(&ConflictResolver::resolve(&local, &remote)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn divider_present_when_sides_are_empty() {
        let empty = PlainContent::default();
        let text = PlainContent::text("only");

        assert_eq!(
            ConflictResolver::resolve(&empty, &empty).ops,
            vec![Delta::insert(CONFLICT_DIVIDER)]
        );
        assert_eq!(
            ConflictResolver::resolve(&text, &empty).ops,
            vec![Delta::insert(CONFLICT_DIVIDER), Delta::insert("only")]
        );
        assert_eq!(
            ConflictResolver::resolve(&empty, &text).ops,
            vec![Delta::insert("only"), Delta::insert(CONFLICT_DIVIDER)]
        );
    }

    #[test]
    fn multi_delta_order_preserved() {
        let local = PlainContent::new(vec![Delta::insert("l1"), Delta::insert("l2")]);
        let remote = PlainContent::new(vec![Delta::insert("r1"), Delta::insert("r2")]);

        let text = ConflictResolver::resolve(&local, &remote).to_plain_text();
        assert_eq!(text, format!("r1r2{}l1l2", CONFLICT_DIVIDER));
    }
}
