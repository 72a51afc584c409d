//! Analytics aggregation — read-only projections over completed
//! reviews.
//!
//! Aggregation happens at read time over the authoritative review
//! rows; nothing here is cached or materialized. The numeric helpers
//! are pure functions over in-memory rows so the aggregation rules
//! can be tested without a store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use peerloop_core::error::{PeerloopError, PeerloopResult};
use peerloop_core::models::analytics::{CompletionStatus, TargetAverage, TrendPoint};
use peerloop_core::models::review::Review;
use peerloop_core::repository::{
    AssignmentRepository, MembershipRepository, PaginatedResult, Pagination, ReviewRepository,
};
use uuid::Uuid;

/// Mean over every individual rating of the completed reviews,
/// flattened across questions, with the number of ratings counted.
/// `None` when no completed review contributes a rating.
fn flatten_mean(reviews: &[Review]) -> Option<(f64, u64)> {
    let mut sum = 0i64;
    let mut count = 0u64;
    for review in reviews.iter().filter(|r| r.completed) {
        for &rating in &review.ratings {
            sum += rating;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some((sum as f64 / count as f64, count))
    }
}

/// Per-target averages over completed reviews, ordered ascending by
/// average (lowest-rated first), ties broken ascending by target id.
fn rank_targets(reviews: &[Review]) -> Vec<TargetAverage> {
    let mut by_target: BTreeMap<Uuid, (i64, u64)> = BTreeMap::new();
    for review in reviews.iter().filter(|r| r.completed) {
        let entry = by_target.entry(review.target_id).or_insert((0, 0));
        for &rating in &review.ratings {
            entry.0 += rating;
            entry.1 += 1;
        }
    }

    let mut rows: Vec<TargetAverage> = by_target
        .into_iter()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(target_id, (sum, count))| TargetAverage {
            target_id,
            average: sum as f64 / count as f64,
            rating_count: count,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.average
            .partial_cmp(&b.average)
            .unwrap_or(Ordering::Equal)
            .then(a.target_id.cmp(&b.target_id))
    });
    rows
}

/// Per-reviewer completion counts over all generated reviews, ordered
/// ascending by completion fraction (least-complete first, ties by
/// reviewer id), excluding reviewers who have finished everything.
fn completion_rows(reviews: &[Review]) -> Vec<CompletionStatus> {
    let mut by_reviewer: BTreeMap<Uuid, (u64, u64)> = BTreeMap::new();
    for review in reviews {
        let entry = by_reviewer.entry(review.reviewer_id).or_insert((0, 0));
        entry.0 += 1;
        if review.completed {
            entry.1 += 1;
        }
    }

    let mut rows: Vec<CompletionStatus> = by_reviewer
        .into_iter()
        .map(|(reviewer_id, (assigned, completed))| CompletionStatus {
            reviewer_id,
            assigned,
            completed,
        })
        .filter(|row| row.completed < row.assigned)
        .collect();

    rows.sort_by(|a, b| {
        a.fraction()
            .partial_cmp(&b.fraction())
            .unwrap_or(Ordering::Equal)
            .then(a.reviewer_id.cmp(&b.reviewer_id))
    });
    rows
}

/// Page an already ordered in-memory result set.
fn paginate<T>(items: Vec<T>, pagination: &Pagination) -> PaginatedResult<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect();
    PaginatedResult {
        items,
        total,
        offset: pagination.offset,
        limit: pagination.limit,
    }
}

/// Analytics aggregation service.
///
/// Every query is authorization-gated: a caller may read their own
/// analytics; reading anyone else's (or whole-assignment projections)
/// requires the Instructor role in the owning workspace.
pub struct AnalyticsService<M, A, R>
where
    M: MembershipRepository,
    A: AssignmentRepository,
    R: ReviewRepository,
{
    memberships: M,
    assignments: A,
    reviews: R,
}

impl<M, A, R> AnalyticsService<M, A, R>
where
    M: MembershipRepository,
    A: AssignmentRepository,
    R: ReviewRepository,
{
    pub fn new(memberships: M, assignments: A, reviews: R) -> Self {
        Self {
            memberships,
            assignments,
            reviews,
        }
    }

    async fn require_instructor(&self, caller_id: Uuid, workspace_id: Uuid) -> PeerloopResult<()> {
        if self.memberships.is_instructor(caller_id, workspace_id).await? {
            Ok(())
        } else {
            Err(PeerloopError::Authorization {
                reason: "instructor role required".into(),
            })
        }
    }

    async fn authorize_target(
        &self,
        caller_id: Uuid,
        target_id: Uuid,
        workspace_id: Uuid,
    ) -> PeerloopResult<()> {
        if caller_id == target_id {
            return Ok(());
        }
        self.require_instructor(caller_id, workspace_id).await
    }

    /// Mean of all individual ratings across completed reviews of the
    /// target within one assignment (not a mean of per-review means).
    pub async fn average_for_user_in_assignment(
        &self,
        caller_id: Uuid,
        target_id: Uuid,
        assignment_id: Uuid,
    ) -> PeerloopResult<TargetAverage> {
        let assignment = self.assignments.get_by_id(assignment_id).await?;
        self.authorize_target(caller_id, target_id, assignment.workspace_id)
            .await?;

        let reviews = self.reviews.list_for_target(assignment_id, target_id).await?;
        let (average, rating_count) = flatten_mean(&reviews).ok_or_else(|| PeerloopError::NoData {
            message: format!(
                "no completed reviews for target {target_id} in assignment {assignment_id}"
            ),
        })?;

        Ok(TargetAverage {
            target_id,
            average,
            rating_count,
        })
    }

    /// Targets of an assignment ordered ascending by average rating,
    /// so the lowest-rated students surface first. Instructor-only.
    pub async fn rank_by_assignment(
        &self,
        caller_id: Uuid,
        assignment_id: Uuid,
        pagination: Pagination,
    ) -> PeerloopResult<PaginatedResult<TargetAverage>> {
        let assignment = self.assignments.get_by_id(assignment_id).await?;
        self.require_instructor(caller_id, assignment.workspace_id)
            .await?;

        let reviews = self.reviews.list_by_assignment(assignment_id).await?;
        Ok(paginate(rank_targets(&reviews), &pagination))
    }

    /// Reviewers of an assignment ordered ascending by completion
    /// fraction, reviewers at 100% excluded. Instructor-only.
    pub async fn completion_status(
        &self,
        caller_id: Uuid,
        assignment_id: Uuid,
        pagination: Pagination,
    ) -> PeerloopResult<PaginatedResult<CompletionStatus>> {
        let assignment = self.assignments.get_by_id(assignment_id).await?;
        self.require_instructor(caller_id, assignment.workspace_id)
            .await?;

        let reviews = self.reviews.list_by_assignment(assignment_id).await?;
        Ok(paginate(completion_rows(&reviews), &pagination))
    }

    /// One average per assignment of the workspace, ordered by due
    /// date, for trend display. Assignments without completed reviews
    /// for the target are omitted, not zero-filled.
    pub async fn series_for_user_across_workspace(
        &self,
        caller_id: Uuid,
        target_id: Uuid,
        workspace_id: Uuid,
    ) -> PeerloopResult<Vec<TrendPoint>> {
        self.authorize_target(caller_id, target_id, workspace_id)
            .await?;

        let assignments = self.assignments.list_by_due_date(workspace_id).await?;

        let mut series = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let reviews = self.reviews.list_for_target(assignment.id, target_id).await?;
            if let Some((average, _)) = flatten_mean(&reviews) {
                series.push(TrendPoint {
                    assignment_id: assignment.id,
                    due_date: assignment.due_date,
                    average,
                });
            }
        }

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(
        target_id: Uuid,
        reviewer_id: Uuid,
        ratings: Vec<i64>,
        completed: bool,
    ) -> Review {
        let now = Utc::now();
        Review {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            reviewer_id,
            target_id,
            ratings,
            comment: None,
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn flatten_mean_counts_every_rating_once() {
        let target = Uuid::new_v4();
        let reviews = vec![
            review(target, Uuid::new_v4(), vec![4, 5], true),
            review(target, Uuid::new_v4(), vec![3, 5], true),
        ];
        let (average, count) = flatten_mean(&reviews).unwrap();
        assert_eq!(average, 4.25);
        assert_eq!(count, 4);
    }

    #[test]
    fn flatten_mean_ignores_pending_reviews() {
        let target = Uuid::new_v4();
        let reviews = vec![
            review(target, Uuid::new_v4(), vec![2, 2], true),
            review(target, Uuid::new_v4(), vec![], false),
        ];
        let (average, count) = flatten_mean(&reviews).unwrap();
        assert_eq!(average, 2.0);
        assert_eq!(count, 2);
    }

    #[test]
    fn flatten_mean_empty_is_none() {
        assert!(flatten_mean(&[]).is_none());
        let pending = vec![review(Uuid::new_v4(), Uuid::new_v4(), vec![], false)];
        assert!(flatten_mean(&pending).is_none());
    }

    #[test]
    fn rank_orders_ascending_by_average() {
        let low = Uuid::new_v4();
        let high = Uuid::new_v4();
        let reviews = vec![
            review(high, Uuid::new_v4(), vec![5, 5], true),
            review(low, Uuid::new_v4(), vec![1, 2], true),
        ];
        let ranked = rank_targets(&reviews);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].target_id, low);
        assert_eq!(ranked[1].target_id, high);
        assert!(ranked[0].average <= ranked[1].average);
    }

    #[test]
    fn rank_breaks_ties_by_target_id() {
        let mut a = Uuid::new_v4();
        let mut b = Uuid::new_v4();
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }
        let reviews = vec![
            review(b, Uuid::new_v4(), vec![3], true),
            review(a, Uuid::new_v4(), vec![3], true),
        ];
        let ranked = rank_targets(&reviews);
        assert_eq!(ranked[0].target_id, a);
        assert_eq!(ranked[1].target_id, b);
    }

    #[test]
    fn completion_excludes_finished_reviewers() {
        let done = Uuid::new_v4();
        let behind = Uuid::new_v4();
        let target = Uuid::new_v4();
        let reviews = vec![
            review(target, done, vec![4], true),
            review(target, behind, vec![], false),
            review(Uuid::new_v4(), behind, vec![5], true),
        ];
        let rows = completion_rows(&reviews);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reviewer_id, behind);
        assert_eq!(rows[0].assigned, 2);
        assert_eq!(rows[0].completed, 1);
    }

    #[test]
    fn completion_orders_least_complete_first() {
        let zero_done = Uuid::new_v4();
        let half_done = Uuid::new_v4();
        let target = Uuid::new_v4();
        let reviews = vec![
            review(target, half_done, vec![3], true),
            review(Uuid::new_v4(), half_done, vec![], false),
            review(target, zero_done, vec![], false),
        ];
        let rows = completion_rows(&reviews);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reviewer_id, zero_done);
        assert_eq!(rows[1].reviewer_id, half_done);
    }

    #[test]
    fn paginate_slices_and_keeps_total() {
        let items: Vec<u32> = (0..10).collect();
        let page = paginate(
            items,
            &Pagination {
                offset: 4,
                limit: 3,
            },
        );
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 10);
        assert_eq!(page.offset, 4);
        assert_eq!(page.limit, 3);
    }
}
