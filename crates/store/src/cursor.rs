//! Range cursors that merge snapshot data with a context's staged writes
//!
//! The committed side is a lazy Fjall snapshot iterator, so memory use does
//! not grow with the size of the scanned interval. Only the context's own
//! staged writes inside the interval are captured when the cursor opens.

use crate::FjallIter;
use crate::encoding::Decode;
use crate::entry::{Key, Record, StagedWrite, VersionedEntry};
use crate::error::Result;
use crate::transaction::{ScannedRange, TransactionContext};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::ops::Bound;

/// Which side supplies the next key
enum Source {
    Committed,
    Staged,
    Both,
}

/// Forward-only cursor over `start <= key < end`
///
/// Holding a cursor borrows its context, so no write can be staged while it
/// is open. Dropping the cursor releases it; [`RangeCursor::close`] does the
/// same explicitly.
pub struct RangeCursor<'a> {
    ctx: &'a TransactionContext<'a>,
    start: Key,
    end: Key,

    committed: Peekable<FjallIter<'a>>,
    staged: Peekable<std::vec::IntoIter<(Key, StagedWrite)>>,

    /// Last key consumed from either side
    last_key: Option<Key>,
    exhausted: bool,
    failed: bool,
}

impl<'a> RangeCursor<'a> {
    pub(crate) fn new(
        ctx: &'a TransactionContext<'a>,
        start: Key,
        end: Key,
        committed: FjallIter<'a>,
        staged: Vec<(Key, StagedWrite)>,
    ) -> Self {
        ctx.store().cursor_opened();
        tracing::trace!("Opened cursor [{}, {}) in {}", start, end, ctx.id());

        Self {
            ctx,
            start,
            end,
            committed: committed.peekable(),
            staged: staged.into_iter().peekable(),
            last_key: None,
            exhausted: false,
            failed: false,
        }
    }

    /// Release the cursor
    pub fn close(self) {}

    fn next_source(&mut self) -> Option<Source> {
        let committed_key: Option<&[u8]> = match self.committed.peek() {
            Some(Ok((k, _))) => Some(&k[..]),
            // Surface the error on the next pull
            Some(Err(_)) => return Some(Source::Committed),
            None => None,
        };
        let staged_key = self.staged.peek().map(|(k, _)| k.as_bytes());

        match (committed_key, staged_key) {
            (None, None) => None,
            (Some(_), None) => Some(Source::Committed),
            (None, Some(_)) => Some(Source::Staged),
            (Some(c), Some(s)) => match c.cmp(s) {
                Ordering::Less => Some(Source::Committed),
                Ordering::Greater => Some(Source::Staged),
                Ordering::Equal => Some(Source::Both),
            },
        }
    }

    fn fail(&mut self, error: crate::Error) -> crate::Error {
        self.failed = true;
        self.ctx.observe_error(error)
    }

    /// Scanned interval, `None` if nothing was consumed
    fn scanned_range(&self) -> Option<ScannedRange> {
        let end = if self.exhausted {
            Bound::Excluded(self.end.clone())
        } else {
            Bound::Included(self.last_key.clone()?)
        };
        Some(ScannedRange {
            start: self.start.clone(),
            end,
        })
    }
}

impl Iterator for RangeCursor<'_> {
    type Item = Result<VersionedEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.exhausted || self.failed {
                return None;
            }

            let Some(source) = self.next_source() else {
                self.exhausted = true;
                return None;
            };

            // Staged writes shadow committed records for the same key
            let staged = match source {
                Source::Staged => self.staged.next(),
                Source::Both => {
                    if let Some(Err(e)) = self.committed.next() {
                        return Some(Err(self.fail(e.into())));
                    }
                    self.staged.next()
                }
                Source::Committed => None,
            };

            if let Some((key, write)) = staged {
                self.last_key = Some(key.clone());
                if let StagedWrite::Put(value) = write {
                    return Some(Ok(VersionedEntry {
                        key,
                        value,
                        version: None,
                    }));
                }
                continue;
            }

            match self.committed.next()? {
                Err(e) => return Some(Err(self.fail(e.into()))),
                Ok((k, v)) => {
                    let key = Key::from_stored(k.into_vec());
                    self.last_key = Some(key.clone());
                    match Record::decode(&v) {
                        Ok(record) => {
                            if let Some(entry) = record.into_entry(key) {
                                return Some(Ok(entry));
                            }
                            // Tombstone - skip it
                        }
                        Err(e) => return Some(Err(self.fail(e))),
                    }
                }
            }
        }
    }
}

impl Drop for RangeCursor<'_> {
    fn drop(&mut self) {
        if let Some(range) = self.scanned_range() {
            self.ctx.record_scan(range);
        }
        self.ctx.store().cursor_closed();
        tracing::trace!("Released cursor [{}, {}) in {}", self.start, self.end, self.ctx.id());
    }
}
