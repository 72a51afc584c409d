//! Pure pairwise expansion of a group's member list.
//!
//! Kept free of persistence so the n·(n−1) invariant can be tested in
//! isolation.

use uuid::Uuid;

/// Expand a member list into every ordered (reviewer, target) pair
/// with reviewer != target.
///
/// Duplicate member ids are collapsed before expansion. Output order
/// is deterministic: reviewer-major in input order. A list of size 0
/// or 1 produces no pairs.
pub fn generate_pairs(members: &[Uuid]) -> Vec<(Uuid, Uuid)> {
    let mut unique: Vec<Uuid> = Vec::with_capacity(members.len());
    for id in members {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    let n = unique.len();
    let mut pairs = Vec::with_capacity(n.saturating_mul(n.saturating_sub(1)));
    for reviewer in &unique {
        for target in &unique {
            if reviewer != target {
                pairs.push((*reviewer, *target));
            }
        }
    }
    pairs
}
