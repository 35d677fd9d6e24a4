// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Reconciliation pipeline
//
// Logs that were interrupted, concatenated or split more than once contain
// locally sorted runs that interleave globally, plus repeated records. The
// stages here restore one clean chronological stream:
//
//   where_valid -> partition_chronological -> merge_all -> remove_duplicates
//
// `process` composes all four.

use crate::activity::Activity;
use crate::category::Category;
use crate::timestamp::Timestamp;
use std::collections::{HashSet, VecDeque};
use std::iter::Peekable;

/// Drop everything before the first sync marker. Unreadable lines never
/// reach this stage; the reader has already filtered them.
pub fn where_valid<I>(activities: I) -> impl Iterator<Item = Activity>
where
    I: IntoIterator<Item = Activity>,
{
    activities
        .into_iter()
        .skip_while(|activity| !activity.is_sync_marker())
}

/// Split into maximal runs of non-decreasing timestamps
pub fn partition_chronological<I>(activities: I) -> ChronologicalRuns<I::IntoIter>
where
    I: IntoIterator<Item = Activity>,
{
    ChronologicalRuns {
        inner: activities.into_iter().peekable(),
    }
}

pub struct ChronologicalRuns<I: Iterator<Item = Activity>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Activity>> Iterator for ChronologicalRuns<I> {
    type Item = Vec<Activity>;

    fn next(&mut self) -> Option<Vec<Activity>> {
        let first = self.inner.next()?;
        let mut last = first.timestamp();
        let mut run = vec![first];
        while let Some(activity) = self.inner.next_if(|a| a.timestamp() >= last) {
            last = activity.timestamp();
            run.push(activity);
        }
        Some(run)
    }
}

/// Stable two-way merge of chronological streams.
///
/// The active side is drained while its head is `<=` the other side's head,
/// then the roles swap. Equal timestamps therefore come from whichever side
/// is active, starting with `left`.
pub fn merge<L, R>(left: L, right: R) -> Merge<L::IntoIter, R::IntoIter>
where
    L: IntoIterator<Item = Activity>,
    R: IntoIterator<Item = Activity>,
{
    Merge {
        left: left.into_iter().peekable(),
        right: right.into_iter().peekable(),
        left_active: true,
    }
}

pub struct Merge<L: Iterator<Item = Activity>, R: Iterator<Item = Activity>> {
    left: Peekable<L>,
    right: Peekable<R>,
    left_active: bool,
}

impl<L, R> Iterator for Merge<L, R>
where
    L: Iterator<Item = Activity>,
    R: Iterator<Item = Activity>,
{
    type Item = Activity;

    fn next(&mut self) -> Option<Activity> {
        loop {
            let (left, right) = match (self.left.peek(), self.right.peek()) {
                (None, None) => return None,
                (Some(_), None) => return self.left.next(),
                (None, Some(_)) => return self.right.next(),
                (Some(l), Some(r)) => (l.timestamp(), r.timestamp()),
            };
            let (active, other) = if self.left_active {
                (left, right)
            } else {
                (right, left)
            };
            if active <= other {
                return if self.left_active {
                    self.left.next()
                } else {
                    self.right.next()
                };
            }
            self.left_active = !self.left_active;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (l_lo, l_hi) = self.left.size_hint();
        let (r_lo, r_hi) = self.right.size_hint();
        let hi = match (l_hi, r_hi) {
            (Some(l), Some(r)) => l.checked_add(r),
            _ => None,
        };
        (l_lo.saturating_add(r_lo), hi)
    }
}

pub type ActivityStream = Box<dyn Iterator<Item = Activity>>;

/// Merge any number of runs by repeatedly merging the two front runs of a
/// queue and queueing the result at the back.
pub fn merge_all<I>(runs: I) -> ActivityStream
where
    I: IntoIterator<Item = Vec<Activity>>,
{
    let mut queue: VecDeque<ActivityStream> = runs
        .into_iter()
        .map(|run| Box::new(run.into_iter()) as ActivityStream)
        .collect();

    while queue.len() > 1 {
        if let (Some(left), Some(right)) = (queue.pop_front(), queue.pop_front()) {
            queue.push_back(Box::new(merge(left, right)));
        }
    }
    queue
        .pop_front()
        .unwrap_or_else(|| Box::new(std::iter::empty()))
}

/// Within each block of equal timestamps, keep only the first record of each
/// (category, payload) pair. Order is otherwise unchanged.
pub fn remove_duplicates<I>(activities: I) -> RemoveDuplicates<I::IntoIter>
where
    I: IntoIterator<Item = Activity>,
{
    RemoveDuplicates {
        inner: activities.into_iter(),
        block: None,
        seen: HashSet::new(),
    }
}

pub struct RemoveDuplicates<I> {
    inner: I,
    block: Option<Timestamp>,
    seen: HashSet<(Category, String)>,
}

impl<I: Iterator<Item = Activity>> Iterator for RemoveDuplicates<I> {
    type Item = Activity;

    fn next(&mut self) -> Option<Activity> {
        loop {
            let activity = self.inner.next()?;
            if self.block != Some(activity.timestamp()) {
                self.block = Some(activity.timestamp());
                self.seen.clear();
            }
            let key = (activity.category(), activity.payload().to_string());
            if self.seen.insert(key) {
                return Some(activity);
            }
        }
    }
}

/// The full pipeline applied before any archive is rewritten
pub fn process<I>(activities: I) -> RemoveDuplicates<ActivityStream>
where
    I: IntoIterator<Item = Activity>,
{
    remove_duplicates(merge_all(partition_chronological(where_valid(activities))))
}

/// A trusted sequence starts with a sync marker and never goes backwards.
/// The empty sequence is valid.
pub fn is_valid(activities: &[Activity]) -> bool {
    match activities.first() {
        None => true,
        Some(first) => {
            first.is_sync_marker()
                && activities
                    .windows(2)
                    .all(|pair| pair[0].timestamp() <= pair[1].timestamp())
        }
    }
}

/// Group a stream into consecutive blocks of at most `size` items (at least 1)
pub fn blocks<I: IntoIterator>(items: I, size: usize) -> Blocks<I::IntoIter> {
    Blocks {
        inner: items.into_iter(),
        size: size.max(1),
    }
}

pub struct Blocks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Blocks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Vec<I::Item>> {
        let block: Vec<_> = self.inner.by_ref().take(self.size).collect();
        (!block.is_empty()).then_some(block)
    }
}
