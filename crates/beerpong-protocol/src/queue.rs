use std::collections::VecDeque;

use bytes::Bytes;
use tracing::trace;

use crate::matcher::ExpressionMatcher;
use crate::tokenizer::Fragment;

/// Ordered fragments received since the last completed command.
///
/// Concatenated in order, the queued fragments always equal the unconsumed
/// history of the stream (minus CR/LF). Fragments leave the queue only as
/// part of a completed command, or through [`FragmentQueue::trim_to`].
///
/// The matcher state for the unmatched tail survives between scans, so a
/// command trickling in over many chunks is not rescanned from the start on
/// every call. That state is always re-derivable from the queued fragments.
#[derive(Debug, Default)]
pub struct FragmentQueue {
    fragments: VecDeque<Fragment>,
    buffered: usize,
    matcher: ExpressionMatcher,
    scanned: usize,
}

impl FragmentQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fragments at the back of the queue.
    pub fn extend<I>(&mut self, fragments: I)
    where
        I: IntoIterator<Item = Fragment>,
    {
        for fragment in fragments {
            self.buffered += fragment.len();
            self.fragments.push_back(fragment);
        }
    }

    /// Extract every command expression completed by the queued fragments.
    ///
    /// Fragments are folded into the running expression one at a time, and
    /// the expression is tested after each one. A match is returned and the
    /// expression restarts at the next fragment. Once the whole queue has
    /// been walked, every fragment up to and including the last matched one
    /// is removed. When nothing matches the queue is left as it was.
    pub fn scan(&mut self) -> Vec<Bytes> {
        let mut matched = Vec::new();
        let mut last_match = None;

        for (index, fragment) in self.fragments.iter().enumerate().skip(self.scanned) {
            if self.matcher.push(fragment) {
                matched.push(self.matcher.take());
                last_match = Some(index);
            }
        }
        self.scanned = self.fragments.len();

        if let Some(last) = last_match {
            let consumed: usize = self.fragments.drain(..=last).map(|f| f.len()).sum();
            self.buffered -= consumed;
            self.scanned -= last + 1;
            trace!(
                commands = matched.len(),
                consumed,
                remaining = self.fragments.len(),
                "queue truncated after last match"
            );
        }

        matched
    }

    /// Drop the oldest fragments until at most `max_bytes` are buffered.
    ///
    /// Returns the number of fragments and bytes dropped.
    pub fn trim_to(&mut self, max_bytes: usize) -> (usize, usize) {
        let mut dropped_fragments = 0usize;
        let mut dropped_bytes = 0usize;

        while self.buffered > max_bytes {
            let Some(fragment) = self.fragments.pop_front() else {
                break;
            };
            self.buffered -= fragment.len();
            dropped_fragments += 1;
            dropped_bytes += fragment.len();
        }

        if dropped_fragments > 0 {
            self.rederive();
        }
        (dropped_fragments, dropped_bytes)
    }

    /// Rebuild the tail matcher from the queued fragments.
    ///
    /// Any suffix of an unmatched tail is itself unmatched, so this never
    /// completes a command.
    fn rederive(&mut self) {
        self.matcher.clear();
        for fragment in &self.fragments {
            let complete = self.matcher.push(fragment);
            debug_assert!(!complete, "suffix of an unmatched tail matched");
        }
        self.scanned = self.fragments.len();
    }

    /// Drop every queued fragment.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.buffered = 0;
        self.matcher.clear();
        self.scanned = 0;
    }

    /// Number of queued fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether no fragment is queued.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Total bytes held by queued fragments.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered
    }

    /// Iterate queued fragments, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// The queued fragments concatenated, oldest first.
    pub fn pending(&self) -> Vec<u8> {
        self.fragments.iter().flat_map(|f| f.iter().copied()).collect()
    }
}
