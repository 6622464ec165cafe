//! Review queue manager.
//!
//! [`ReviewQueue`] owns the lifecycle of a (learner, node) pair once its
//! lessons are done: scheduling the first review, listing due reviews,
//! applying submitted scores, and skipping. It is the only writer of
//! [`Progress`] review statistics and [`QueueItem`] schedules.
//!
//! Mutations for one pair run under that pair's lock and are persisted with
//! a single versioned [`ReviewStore::save_pair`] call, so a failed write
//! leaves both records exactly as they were.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::content::{Catalog, ContentStore};
use crate::core::clock::{Clock, SystemClock};
use crate::core::locks::PairLocks;
use crate::core::mastery::MasteryLevel;
use crate::core::records::{validate_id, Node, PairKey, Progress, QueueItem};
use crate::core::scheduler::next_interval;
use crate::core::score::ReviewScore;
use crate::error::{FailOpen, Result, ReviewError};
use crate::points::{FixedPoints, PointsPolicy};
use crate::stats::{current_streak, longest_streak, HistoryEvent, HistoryEventType, ReviewLog};
use crate::storage::{ItemVersion, ReviewStore};

/// Result of recording a lesson.
#[derive(Debug, Clone, Serialize)]
pub struct LessonOutcome {
    /// Progress after the lesson was recorded.
    pub progress: Progress,
    /// Whether this lesson completed the node for the first time.
    pub newly_completed: bool,
    /// The queue item created by completion, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<QueueItem>,
}

/// A due queue item joined with its node metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DueReview {
    /// The due queue item.
    pub item: QueueItem,
    /// Node metadata, absent when the content store has no entry.
    pub node: Option<Node>,
}

impl DueReview {
    /// Ordering hint of the node, unknown nodes last.
    fn order(&self) -> u32 {
        self.node.as_ref().map_or(u32::MAX, |n| n.order)
    }
}

/// Result of a submitted review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    /// Updated progress.
    pub progress: Progress,
    /// Updated queue item.
    pub item: QueueItem,
    /// Points awarded by the points policy.
    pub points_awarded: u32,
}

/// Read-only aggregate view of a learner's queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSummary {
    pub learner_id: String,
    pub as_of: NaiveDate,
    /// Items reviewable on `as_of`.
    pub due_count: usize,
    /// Earliest due date among items not yet due.
    pub next_review_date: Option<NaiveDate>,
    /// Items in the queue, due or not.
    pub scheduled_count: usize,
    /// Successful reviews across all nodes.
    pub total_reviews: u64,
    /// Number of nodes at each mastery level.
    pub mastery: BTreeMap<MasteryLevel, usize>,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Review queue manager over an injected store.
pub struct ReviewQueue<S: ReviewStore> {
    store: S,
    content: Arc<dyn ContentStore>,
    points: Arc<dyn PointsPolicy>,
    clock: Arc<dyn Clock>,
    history: Option<ReviewLog>,
    locks: PairLocks,
}

impl<S: ReviewStore> ReviewQueue<S> {
    /// Create a queue with an empty catalog, default points and the system clock.
    pub fn new(store: S) -> Self {
        Self {
            store,
            content: Arc::new(Catalog::new()),
            points: Arc::new(FixedPoints::default()),
            clock: Arc::new(SystemClock),
            history: None,
            locks: PairLocks::new(),
        }
    }

    /// Use a content store for node metadata.
    pub fn with_content(mut self, content: impl ContentStore + 'static) -> Self {
        self.content = Arc::new(content);
        self
    }

    /// Use a points policy.
    pub fn with_points(mut self, points: impl PointsPolicy + 'static) -> Self {
        self.points = Arc::new(points);
        self
    }

    /// Use a clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append events to a history log.
    pub fn with_history(mut self, log: ReviewLog) -> Self {
        self.history = Some(log);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Today's date according to the queue's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Record a completed lesson.
    ///
    /// When this completes the node's lesson set for the first time the
    /// initial review is scheduled in the same write.
    pub fn record_lesson(&self, learner_id: &str, node_id: &str, lesson: u8) -> Result<LessonOutcome> {
        let key = PairKey::new(learner_id, node_id)?;

        let outcome = self.locks.with_lock(&key, || -> Result<LessonOutcome> {
            let now = self.clock.now();
            let mut progress = self
                .store
                .progress(&key)?
                .unwrap_or_else(|| Progress::new(&key, now));

            let newly_completed = progress.complete_lesson(lesson, now)?;

            let scheduled = if newly_completed && self.store.queue_item(&key)?.is_none() {
                let item = QueueItem::new(&key, self.clock.today(), now);
                self.store.save_pair(&progress, &item, ItemVersion::Absent)?;
                Some(item)
            } else {
                self.store.save_progress(&progress)?;
                None
            };

            Ok(LessonOutcome {
                progress,
                newly_completed,
                scheduled,
            })
        })?;

        debug!(
            learner = learner_id,
            node = node_id,
            lesson,
            completed = outcome.newly_completed,
            "Recorded lesson"
        );
        self.record_history(
            learner_id,
            HistoryEventType::LessonCompleted {
                node_id: node_id.to_string(),
                lesson,
            },
        );
        if let Some(item) = &outcome.scheduled {
            self.record_history(
                learner_id,
                HistoryEventType::Scheduled {
                    node_id: node_id.to_string(),
                    due_date: item.due_date,
                },
            );
        }

        Ok(outcome)
    }

    /// Put a completed node into the review queue, due today.
    ///
    /// Fails with `NotCompleted` if the lessons are not all done and with
    /// `AlreadyScheduled` if the pair already has a queue item.
    pub fn schedule_initial_review(&self, learner_id: &str, node_id: &str) -> Result<QueueItem> {
        let key = PairKey::new(learner_id, node_id)?;

        let item = self.locks.with_lock(&key, || -> Result<QueueItem> {
            let progress = self
                .store
                .progress(&key)?
                .filter(Progress::is_completed)
                .ok_or_else(|| ReviewError::not_completed(learner_id, node_id))?;

            if self.store.queue_item(&key)?.is_some() {
                return Err(ReviewError::already_scheduled(learner_id, node_id));
            }

            let item = QueueItem::new(&key, self.clock.today(), self.clock.now());
            self.store.save_pair(&progress, &item, ItemVersion::Absent)?;
            Ok(item)
        })?;

        debug!(learner = learner_id, node = node_id, due = %item.due_date, "Scheduled initial review");
        self.record_history(
            learner_id,
            HistoryEventType::Scheduled {
                node_id: node_id.to_string(),
                due_date: item.due_date,
            },
        );

        Ok(item)
    }

    /// Items due on or before `as_of`, joined with node metadata.
    ///
    /// Ordered by due date, then node ordering hint, then node id. Listing
    /// never changes stored state.
    pub fn list_due(&self, learner_id: &str, as_of: NaiveDate) -> Result<Vec<DueReview>> {
        validate_id(learner_id)?;

        let mut due = Vec::new();
        for item in self.store.queue_items(learner_id)? {
            if !item.is_due(as_of) {
                continue;
            }
            let node = self.content.node(&item.node_id)?;
            due.push(DueReview { item, node });
        }

        due.sort_by(|a, b| {
            a.item
                .due_date
                .cmp(&b.item.due_date)
                .then_with(|| a.order().cmp(&b.order()))
                .then_with(|| a.item.node_id.cmp(&b.item.node_id))
        });

        debug!(learner = learner_id, as_of = %as_of, count = due.len(), "Listed due reviews");
        Ok(due)
    }

    /// Apply a review score to a scheduled pair.
    pub fn submit_review(
        &self,
        learner_id: &str,
        node_id: &str,
        score: ReviewScore,
    ) -> Result<ReviewOutcome> {
        let key = PairKey::new(learner_id, node_id)?;
        let node = self.content.node(node_id)?;

        let (progress, item) = self.locks.with_lock(&key, || -> Result<(Progress, QueueItem)> {
            let mut item = self.store.queue_item(&key)?.ok_or_else(|| key.not_found())?;
            let mut progress = self.store.progress(&key)?.ok_or_else(|| key.not_found())?;
            let expected = ItemVersion::Exactly(item.version);

            let now = self.clock.now();
            let step = next_interval(item.interval_days, item.ease_factor, score);
            item.apply_review(step, score, self.clock.today(), now);

            if score.is_success() {
                progress.record_review(score, now);
                progress.reclassify(step.interval_days);
            }

            self.store.save_pair(&progress, &item, expected)?;
            Ok((progress, item))
        })?;

        let points_awarded = self.points.points_for(score, node.as_ref());

        info!(
            learner = learner_id,
            node = node_id,
            score = score.value(),
            interval_days = item.interval_days,
            ease_factor = item.ease_factor,
            mastery = %progress.mastery_level,
            "Review recorded"
        );
        self.record_history(
            learner_id,
            HistoryEventType::Reviewed {
                node_id: node_id.to_string(),
                score,
                interval_days: item.interval_days,
                ease_factor: item.ease_factor,
                due_date: item.due_date,
            },
        );

        Ok(ReviewOutcome {
            progress,
            item,
            points_awarded,
        })
    }

    /// Postpone a scheduled review to tomorrow without grading it.
    pub fn skip_review(&self, learner_id: &str, node_id: &str) -> Result<QueueItem> {
        let key = PairKey::new(learner_id, node_id)?;

        let item = self.locks.with_lock(&key, || -> Result<QueueItem> {
            let mut item = self.store.queue_item(&key)?.ok_or_else(|| key.not_found())?;
            let progress = self.store.progress(&key)?.ok_or_else(|| key.not_found())?;
            let expected = ItemVersion::Exactly(item.version);

            item.skip(self.clock.today());
            self.store.save_pair(&progress, &item, expected)?;
            Ok(item)
        })?;

        debug!(learner = learner_id, node = node_id, due = %item.due_date, "Skipped review");
        self.record_history(
            learner_id,
            HistoryEventType::Skipped {
                node_id: node_id.to_string(),
                due_date: item.due_date,
            },
        );

        Ok(item)
    }

    /// Progress for a pair, if any.
    pub fn progress(&self, learner_id: &str, node_id: &str) -> Result<Option<Progress>> {
        let key = PairKey::new(learner_id, node_id)?;
        self.store.progress(&key)
    }

    /// Queue item for a pair, if scheduled.
    pub fn queue_item(&self, learner_id: &str, node_id: &str) -> Result<Option<QueueItem>> {
        let key = PairKey::new(learner_id, node_id)?;
        self.store.queue_item(&key)
    }

    /// Aggregate counts for a learner as of `as_of`.
    pub fn summary(&self, learner_id: &str, as_of: NaiveDate) -> Result<QueueSummary> {
        validate_id(learner_id)?;

        let items = self.store.queue_items(learner_id)?;
        let due_count = items.iter().filter(|i| i.is_due(as_of)).count();
        let next_review_date = items
            .iter()
            .filter(|i| !i.is_due(as_of))
            .map(|i| i.due_date)
            .min();

        let mut mastery: BTreeMap<MasteryLevel, usize> =
            MasteryLevel::ALL.iter().map(|&level| (level, 0)).collect();
        let mut total_reviews = 0u64;
        for progress in self.store.learner_progress(learner_id)? {
            *mastery.entry(progress.mastery_level).or_default() += 1;
            total_reviews += u64::from(progress.total_reviews);
        }

        let review_dates = match &self.history {
            Some(log) => log
                .review_dates(learner_id)
                .fail_open_default("Failed to read review history"),
            None => Default::default(),
        };

        Ok(QueueSummary {
            learner_id: learner_id.to_string(),
            as_of,
            due_count,
            next_review_date,
            scheduled_count: items.len(),
            total_reviews,
            mastery,
            current_streak: current_streak(&review_dates, as_of),
            longest_streak: longest_streak(&review_dates),
        })
    }

    /// Append a history event. The triggering write has already committed.
    fn record_history(&self, learner_id: &str, data: HistoryEventType) {
        if let Some(log) = &self.history {
            log.append(&HistoryEvent::new(learner_id, data, self.clock.now()))
                .fail_open_default("Failed to append review history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::records::QueueStatus;
    use crate::storage::MemoryReviewStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn add(d: NaiveDate, days: u32) -> NaiveDate {
        crate::core::records::add_days(d, days)
    }

    fn start() -> NaiveDate {
        date(2026, 3, 2)
    }

    fn catalog() -> Catalog {
        Catalog::from_nodes([
            Node::new("armbar", "Armbar").with_order(2),
            Node::new("kimura", "Kimura").with_order(1),
            Node::new("triangle", "Triangle").with_order(1),
        ])
    }

    fn queue_with<S: ReviewStore>(store: S) -> (ReviewQueue<S>, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::on(start()));
        let queue = ReviewQueue::new(store)
            .with_content(catalog())
            .with_points(FixedPoints::new(10, 5))
            .with_clock(clock.clone());
        (queue, clock)
    }

    fn queue() -> (ReviewQueue<MemoryReviewStore>, Arc<FixedClock>) {
        queue_with(MemoryReviewStore::new())
    }

    fn complete<S: ReviewStore>(queue: &ReviewQueue<S>, learner: &str, node: &str) {
        for lesson in 1..=3 {
            queue.record_lesson(learner, node, lesson).unwrap();
        }
    }

    // =========================================================================
    // Lessons and scheduling
    // =========================================================================

    #[test]
    fn test_lesson_completion_schedules_review() {
        let (queue, _) = queue();

        let first = queue.record_lesson("ana", "armbar", 1).unwrap();
        assert!(!first.newly_completed);
        assert!(first.scheduled.is_none());
        assert!(queue.queue_item("ana", "armbar").unwrap().is_none());

        queue.record_lesson("ana", "armbar", 2).unwrap();
        let last = queue.record_lesson("ana", "armbar", 3).unwrap();
        assert!(last.newly_completed);
        assert_eq!(last.progress.mastery_level, MasteryLevel::Learned);

        let item = last.scheduled.unwrap();
        assert_eq!(item.interval_days, 0);
        assert!((item.ease_factor - 2.5).abs() < f64::EPSILON);
        assert_eq!(item.due_date, start());
        assert_eq!(item.status, QueueStatus::Pending);
    }

    #[test]
    fn test_repeated_lesson_is_idempotent() {
        let (queue, _) = queue();
        complete(&queue, "ana", "armbar");

        let again = queue.record_lesson("ana", "armbar", 2).unwrap();
        assert!(!again.newly_completed);
        assert!(again.scheduled.is_none());
        assert_eq!(queue.store().queue_items("ana").unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_lesson_rejected() {
        let (queue, _) = queue();
        let err = queue.record_lesson("ana", "armbar", 4).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidLesson { lesson: 4 }));
        assert!(queue.progress("ana", "armbar").unwrap().is_none());
    }

    #[test]
    fn test_invalid_ids_rejected() {
        let (queue, _) = queue();
        assert!(matches!(
            queue.record_lesson("../ana", "armbar", 1),
            Err(ReviewError::InvalidId { .. })
        ));
        assert!(queue.list_due("", start()).is_err());
    }

    #[test]
    fn test_schedule_requires_completion() {
        let (queue, _) = queue();
        let err = queue.schedule_initial_review("ana", "armbar").unwrap_err();
        assert!(matches!(err, ReviewError::NotCompleted { .. }));

        queue.record_lesson("ana", "armbar", 1).unwrap();
        let err = queue.schedule_initial_review("ana", "armbar").unwrap_err();
        assert!(matches!(err, ReviewError::NotCompleted { .. }));
    }

    #[test]
    fn test_schedule_twice_rejected() {
        let store = MemoryReviewStore::new();
        let key = PairKey::new("ana", "armbar").unwrap();
        let mut progress = Progress::new(&key, chrono::Utc::now());
        for lesson in 1..=3 {
            progress.complete_lesson(lesson, chrono::Utc::now()).unwrap();
        }
        store.save_progress(&progress).unwrap();

        let (queue, _) = queue_with(store);
        let item = queue.schedule_initial_review("ana", "armbar").unwrap();
        assert_eq!(item.due_date, start());

        let err = queue.schedule_initial_review("ana", "armbar").unwrap_err();
        assert!(matches!(err, ReviewError::AlreadyScheduled { .. }));
        assert_eq!(queue.queue_item("ana", "armbar").unwrap().unwrap(), item);
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn test_list_due_filters_and_orders() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");
        complete(&queue, "ana", "triangle");
        complete(&queue, "ana", "kimura");
        complete(&queue, "ana", "unlisted");
        complete(&queue, "ben", "armbar");

        // Push triangle out of today's window
        queue.submit_review("ana", "triangle", ReviewScore::Good).unwrap();

        let due = queue.list_due("ana", clock.today()).unwrap();
        let ids: Vec<&str> = due.iter().map(|d| d.item.node_id.as_str()).collect();
        assert_eq!(ids, vec!["kimura", "armbar", "unlisted"]);
        assert_eq!(due[0].node.as_ref().unwrap().name, "Kimura");
        assert!(due[2].node.is_none());

        let tomorrow = add(clock.today(), 1);
        let ids: Vec<String> = queue
            .list_due("ana", tomorrow)
            .unwrap()
            .into_iter()
            .map(|d| d.item.node_id)
            .collect();
        assert_eq!(ids, vec!["kimura", "armbar", "unlisted", "triangle"]);
    }

    #[test]
    fn test_list_due_is_idempotent() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");
        complete(&queue, "ana", "kimura");

        let first = queue.list_due("ana", clock.today()).unwrap();
        let second = queue.list_due("ana", clock.today()).unwrap();
        let ids = |v: &[DueReview]| v.iter().map(|d| d.item.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_list_due_unknown_learner_is_empty() {
        let (queue, _) = queue();
        assert!(queue.list_due("nobody", start()).unwrap().is_empty());
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    #[test]
    fn test_review_sequence() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");

        let first = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(first.item.interval_days, 1);
        assert_eq!(first.item.due_date, add(start(), 1));
        assert_eq!(first.item.next_review_date, Some(add(start(), 1)));
        assert_eq!(first.item.status, QueueStatus::Completed);
        assert_eq!(first.item.last_review_score, Some(ReviewScore::Good));
        assert_eq!(first.progress.total_reviews, 1);
        assert_eq!(first.progress.mastery_level, MasteryLevel::Reviewed);
        assert_eq!(first.points_awarded, 10);

        clock.advance_days(1);
        let second = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(second.item.interval_days, 3);

        clock.advance_days(3);
        let third = queue.submit_review("ana", "armbar", ReviewScore::Easy).unwrap();
        assert_eq!(third.item.interval_days, 10);
        assert!((third.item.ease_factor - 2.65).abs() < 1e-9);
        assert_eq!(third.points_awarded, 15);
        assert_eq!(third.progress.total_reviews, 3);
        assert_eq!(third.progress.mastery_level, MasteryLevel::Practiced);
        assert!((third.progress.avg_review_score - 13.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_review_resets_interval_keeps_stats() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");
        queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        clock.advance_days(1);
        queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        clock.advance_days(3);

        let before = queue.progress("ana", "armbar").unwrap().unwrap();
        let outcome = queue.submit_review("ana", "armbar", ReviewScore::Forgot).unwrap();

        assert_eq!(outcome.item.interval_days, 1);
        assert!((outcome.item.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(outcome.item.last_review_score, Some(ReviewScore::Forgot));
        assert_eq!(outcome.progress.total_reviews, before.total_reviews);
        assert_eq!(outcome.progress.avg_review_score, before.avg_review_score);
        assert_eq!(outcome.progress.mastery_level, before.mastery_level);
        assert_eq!(outcome.points_awarded, 0);
    }

    #[test]
    fn test_review_unscheduled_pair_not_found() {
        let (queue, _) = queue();
        queue.record_lesson("ana", "armbar", 1).unwrap();

        let err = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { .. }));
        let err = queue.submit_review("ana", "kimura", ReviewScore::Good).unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { .. }));
    }

    #[test]
    fn test_early_review_allowed() {
        let (queue, _) = queue();
        complete(&queue, "ana", "armbar");
        queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();

        // Not due until tomorrow, still accepted
        let outcome = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(outcome.item.interval_days, 3);
    }

    #[test]
    fn test_mastery_can_fall() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");
        for _ in 0..10 {
            queue.submit_review("ana", "armbar", ReviewScore::Easy).unwrap();
            clock.advance_days(1);
        }
        let progress = queue.progress("ana", "armbar").unwrap().unwrap();
        assert_eq!(progress.mastery_level, MasteryLevel::Mastered);

        // A lapse resets the interval but leaves the level until the next success
        let lapse = queue.submit_review("ana", "armbar", ReviewScore::Forgot).unwrap();
        assert_eq!(lapse.item.interval_days, 1);
        assert_eq!(lapse.progress.mastery_level, MasteryLevel::Mastered);

        let recovered = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(recovered.item.interval_days, 3);
        assert_eq!(recovered.progress.total_reviews, 11);
        assert_eq!(recovered.progress.mastery_level, MasteryLevel::Proficient);
    }

    // =========================================================================
    // Skipping
    // =========================================================================

    #[test]
    fn test_skip_postpones_without_grading() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");

        let item = queue.skip_review("ana", "armbar").unwrap();
        assert_eq!(item.due_date, add(start(), 1));
        assert_eq!(item.status, QueueStatus::Skipped);
        assert_eq!(item.interval_days, 0);
        assert!(queue.list_due("ana", clock.today()).unwrap().is_empty());

        let progress = queue.progress("ana", "armbar").unwrap().unwrap();
        assert_eq!(progress.total_reviews, 0);
        assert_eq!(progress.mastery_level, MasteryLevel::Learned);
    }

    #[test]
    fn test_skip_unscheduled_not_found() {
        let (queue, _) = queue();
        let err = queue.skip_review("ana", "armbar").unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { .. }));
    }

    // =========================================================================
    // Summary and history
    // =========================================================================

    #[test]
    fn test_summary_counts() {
        let (queue, clock) = queue();
        complete(&queue, "ana", "armbar");
        complete(&queue, "ana", "kimura");
        complete(&queue, "ana", "triangle");
        queue.record_lesson("ana", "shrimp", 1).unwrap();
        queue.submit_review("ana", "kimura", ReviewScore::Good).unwrap();

        let summary = queue.summary("ana", clock.today()).unwrap();
        assert_eq!(summary.due_count, 2);
        assert_eq!(summary.scheduled_count, 3);
        assert_eq!(summary.next_review_date, Some(add(start(), 1)));
        assert_eq!(summary.total_reviews, 1);
        assert_eq!(summary.mastery[&MasteryLevel::Learned], 2);
        assert_eq!(summary.mastery[&MasteryLevel::Reviewed], 1);
        assert_eq!(summary.mastery[&MasteryLevel::NotStarted], 1);
        assert_eq!(summary.mastery[&MasteryLevel::Mastered], 0);
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_summary_streaks_from_history() {
        let temp = TempDir::new().unwrap();
        let log = ReviewLog::new(temp.path().join("history.log"));
        let (queue, clock) = queue();
        let queue = queue.with_history(log.clone());

        complete(&queue, "ana", "armbar");
        for _ in 0..3 {
            queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
            clock.advance_days(1);
        }

        let summary = queue.summary("ana", clock.today()).unwrap();
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.longest_streak, 3);

        let events = log.read_learner("ana").unwrap();
        let count = |name: &str| events.iter().filter(|e| e.data.event_name() == name).count();
        assert_eq!(count("lesson_completed"), 3);
        assert_eq!(count("scheduled"), 1);
        assert_eq!(count("reviewed"), 3);
    }

    #[test]
    fn test_history_failure_does_not_fail_review() {
        let temp = TempDir::new().unwrap();
        // A directory where the log file should be makes every append fail
        let path = temp.path().join("history.log");
        std::fs::create_dir_all(&path).unwrap();

        let (queue, _) = queue();
        let queue = queue.with_history(ReviewLog::new(&path));
        complete(&queue, "ana", "armbar");

        let outcome = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(outcome.item.interval_days, 1);
    }

    #[test]
    fn test_corrupt_pair_fails_aggregates() {
        let temp = TempDir::new().unwrap();
        let store = crate::storage::FileReviewStore::with_dir(temp.path()).unwrap();
        let (queue, clock) = queue_with(store);
        complete(&queue, "ana", "armbar");
        complete(&queue, "ana", "kimura");
        assert_eq!(queue.list_due("ana", clock.today()).unwrap().len(), 2);

        std::fs::write(temp.path().join("ana").join("kimura.json"), "{ truncated").unwrap();

        let err = queue.list_due("ana", clock.today()).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("kimura.json"));
        assert!(queue.summary("ana", clock.today()).unwrap_err().is_persistence());
        assert!(queue
            .submit_review("ana", "kimura", ReviewScore::Good)
            .unwrap_err()
            .is_persistence());

        // The healthy pair is still reachable directly
        assert!(queue.queue_item("ana", "armbar").unwrap().is_some());
    }

    // =========================================================================
    // Atomicity and concurrency
    // =========================================================================

    /// Store whose pair writes can be made to fail.
    struct FlakyStore {
        inner: MemoryReviewStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryReviewStore::new(),
                fail_writes: AtomicBool::new(false),
            }
        }
    }

    impl ReviewStore for FlakyStore {
        fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
            self.inner.progress(key)
        }
        fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
            self.inner.queue_item(key)
        }
        fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
            self.inner.queue_items(learner_id)
        }
        fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
            self.inner.learner_progress(learner_id)
        }
        fn save_progress(&self, progress: &Progress) -> Result<()> {
            self.inner.save_progress(progress)
        }
        fn save_pair(&self, progress: &Progress, item: &QueueItem, expected: ItemVersion) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ReviewError::from(std::io::Error::other("disk full")));
            }
            self.inner.save_pair(progress, item, expected)
        }
    }

    #[test]
    fn test_failed_write_leaves_pair_unchanged() {
        let (queue, _) = queue_with(FlakyStore::new());
        complete(&queue, "ana", "armbar");
        queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();

        let progress_before = queue.progress("ana", "armbar").unwrap().unwrap();
        let item_before = queue.queue_item("ana", "armbar").unwrap().unwrap();

        queue.store().fail_writes.store(true, Ordering::SeqCst);
        let err = queue.submit_review("ana", "armbar", ReviewScore::Easy).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.is_retryable());
        assert!(queue.skip_review("ana", "armbar").is_err());

        assert_eq!(queue.progress("ana", "armbar").unwrap().unwrap(), progress_before);
        assert_eq!(queue.queue_item("ana", "armbar").unwrap().unwrap(), item_before);

        // Retrying after the failure applies exactly one review
        queue.store().fail_writes.store(false, Ordering::SeqCst);
        let outcome = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap();
        assert_eq!(outcome.item.interval_days, 3);
        assert_eq!(outcome.progress.total_reviews, 2);
    }

    /// Store that slows down reads to widen race windows.
    struct SlowStore {
        inner: MemoryReviewStore,
        reads: AtomicUsize,
    }

    impl ReviewStore for SlowStore {
        fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
            self.inner.progress(key)
        }
        fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let item = self.inner.queue_item(key);
            thread::sleep(Duration::from_millis(20));
            item
        }
        fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
            self.inner.queue_items(learner_id)
        }
        fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
            self.inner.learner_progress(learner_id)
        }
        fn save_progress(&self, progress: &Progress) -> Result<()> {
            self.inner.save_progress(progress)
        }
        fn save_pair(&self, progress: &Progress, item: &QueueItem, expected: ItemVersion) -> Result<()> {
            self.inner.save_pair(progress, item, expected)
        }
    }

    #[test]
    fn test_concurrent_reviews_same_pair_serialize() {
        let store = SlowStore {
            inner: MemoryReviewStore::new(),
            reads: AtomicUsize::new(0),
        };
        let (queue, _) = queue_with(store);
        complete(&queue, "ana", "armbar");
        let queue = Arc::new(queue);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    queue
                        .submit_review("ana", "armbar", ReviewScore::Good)
                        .unwrap()
                        .item
                        .interval_days
                })
            })
            .collect();

        let mut intervals: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        intervals.sort();
        assert_eq!(intervals, vec![1, 3]);

        let progress = queue.progress("ana", "armbar").unwrap().unwrap();
        assert_eq!(progress.total_reviews, 2);
        assert_eq!(queue.queue_item("ana", "armbar").unwrap().unwrap().interval_days, 3);
    }

    #[test]
    fn test_concurrent_reviews_different_pairs() {
        let (queue, _) = queue();
        let nodes = ["armbar", "kimura", "triangle", "omoplata"];
        for node in nodes {
            complete(&queue, "ana", node);
        }
        let queue = Arc::new(queue);

        let handles: Vec<_> = nodes
            .iter()
            .map(|node| {
                let queue = Arc::clone(&queue);
                let node = node.to_string();
                thread::spawn(move || queue.submit_review("ana", &node, ReviewScore::Good))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().item.interval_days, 1);
        }
    }

    /// Store that lets another writer slip in between the read and the write.
    struct RacingStore {
        inner: MemoryReviewStore,
        raced: AtomicBool,
    }

    impl ReviewStore for RacingStore {
        fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
            self.inner.progress(key)
        }
        fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
            let read = self.inner.queue_item(key)?;
            if let Some(item) = &read {
                if !self.raced.swap(true, Ordering::SeqCst) {
                    let progress = self.inner.progress(key)?.ok_or_else(|| key.not_found())?;
                    let mut other = item.clone();
                    other.interval_days = 42;
                    other.version += 1;
                    self.inner
                        .save_pair(&progress, &other, ItemVersion::Exactly(item.version))?;
                }
            }
            Ok(read)
        }
        fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
            self.inner.queue_items(learner_id)
        }
        fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
            self.inner.learner_progress(learner_id)
        }
        fn save_progress(&self, progress: &Progress) -> Result<()> {
            self.inner.save_progress(progress)
        }
        fn save_pair(&self, progress: &Progress, item: &QueueItem, expected: ItemVersion) -> Result<()> {
            self.inner.save_pair(progress, item, expected)
        }
    }

    #[test]
    fn test_stale_write_conflicts() {
        let store = RacingStore {
            inner: MemoryReviewStore::new(),
            raced: AtomicBool::new(true),
        };
        let (queue, _) = queue_with(store);
        complete(&queue, "ana", "armbar");

        queue.store().raced.store(false, Ordering::SeqCst);
        let err = queue.submit_review("ana", "armbar", ReviewScore::Good).unwrap_err();
        assert!(matches!(err, ReviewError::Conflict { .. }));

        // The other writer's state survives
        let item = queue.queue_item("ana", "armbar").unwrap().unwrap();
        assert_eq!(item.interval_days, 42);
        assert_eq!(queue.progress("ana", "armbar").unwrap().unwrap().total_reviews, 0);
    }
}
