use crate::error::{Error, Result};
use crate::store::RowStore;

const FORWARD_ONLY: &str =
    "Operation not allowed for a result set of type ResultSet.TYPE_FORWARD_ONLY.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    BeforeFirst,
    /// 0-based row index
    At(usize),
    AfterLast,
}

/// Navigation state of a result set.
///
/// Streaming stores only ever move `BeforeFirst -> At(0) -> At(1) -> ... -> AfterLast`.
#[derive(Debug, Clone)]
pub struct Cursor {
    position: CursorPosition,
    forward_only: bool,
    scroll_tolerant: bool,
}

impl Cursor {
    pub fn new(forward_only: bool, scroll_tolerant: bool) -> Self {
        Self {
            position: CursorPosition::BeforeFirst,
            forward_only,
            scroll_tolerant,
        }
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    /// 0-based index of the current row
    pub fn current(&self) -> Option<usize> {
        match self.position {
            CursorPosition::At(i) => Some(i),
            _ => None,
        }
    }

    /// Whether random-access navigation may move the cursor.
    ///
    /// Forward-only result sets refuse it, unless scroll tolerance is on: then
    /// materialized rows navigate normally and streaming rows report `false`.
    fn scrollable(&self, store: &(impl RowStore + ?Sized)) -> Result<bool> {
        if !self.forward_only {
            return Ok(true);
        }
        if !self.scroll_tolerant {
            return Err(Error::UnsupportedNavigation(FORWARD_ONLY.to_owned()));
        }
        Ok(!store.is_streaming())
    }

    /// Move to `idx` if it is a row, otherwise to the nearest edge
    fn land(&mut self, idx: i64, len: usize) -> bool {
        if idx < 0 {
            self.position = CursorPosition::BeforeFirst;
            false
        } else if idx as u64 >= len as u64 {
            self.position = CursorPosition::AfterLast;
            false
        } else {
            self.position = CursorPosition::At(idx as usize);
            true
        }
    }

    pub fn next(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<bool> {
        let next = match self.position {
            CursorPosition::BeforeFirst => 0,
            CursorPosition::At(i) => i + 1,
            CursorPosition::AfterLast => return Ok(false),
        };
        if next >= store.rows_seen() && !store.fetch_next()? {
            self.position = CursorPosition::AfterLast;
            return Ok(false);
        }
        self.position = CursorPosition::At(next);
        Ok(true)
    }

    pub fn previous(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<bool> {
        if !self.scrollable(&*store)? {
            return Ok(false);
        }
        let len = store.rows_seen();
        let target = match self.position {
            CursorPosition::BeforeFirst => return Ok(false),
            CursorPosition::At(i) => i as i64 - 1,
            CursorPosition::AfterLast => len as i64 - 1,
        };
        Ok(self.land(target, len))
    }

    pub fn first(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<bool> {
        if !self.scrollable(&*store)? {
            return Ok(false);
        }
        if store.rows_seen() == 0 {
            return Ok(false);
        }
        self.position = CursorPosition::At(0);
        Ok(true)
    }

    pub fn last(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<bool> {
        if !self.scrollable(&*store)? {
            return Ok(false);
        }
        match store.rows_seen() {
            0 => Ok(false),
            len => {
                self.position = CursorPosition::At(len - 1);
                Ok(true)
            }
        }
    }

    /// `row` is 1-based; negative values count from the end, `0` is before the first row.
    pub fn absolute(&mut self, store: &mut (impl RowStore + ?Sized), row: i64) -> Result<bool> {
        if !self.scrollable(&*store)? {
            return Ok(false);
        }
        let len = store.rows_seen();
        let target = match row {
            0 => {
                self.position = CursorPosition::BeforeFirst;
                return Ok(false);
            }
            r if r > 0 => r - 1,
            r => len as i64 + r,
        };
        Ok(self.land(target, len))
    }

    pub fn relative(&mut self, store: &mut (impl RowStore + ?Sized), rows: i64) -> Result<bool> {
        if !self.scrollable(&*store)? {
            return Ok(false);
        }
        let len = store.rows_seen();
        let from = match self.position {
            CursorPosition::BeforeFirst => -1,
            CursorPosition::At(i) => i as i64,
            CursorPosition::AfterLast => len as i64,
        };
        Ok(self.land(from.saturating_add(rows), len))
    }

    pub fn before_first(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<()> {
        if self.scrollable(&*store)? {
            self.position = CursorPosition::BeforeFirst;
        }
        Ok(())
    }

    pub fn after_last(&mut self, store: &mut (impl RowStore + ?Sized)) -> Result<()> {
        if self.scrollable(&*store)? {
            self.position = CursorPosition::AfterLast;
        }
        Ok(())
    }

    pub fn is_before_first(&self) -> bool {
        self.position == CursorPosition::BeforeFirst
    }

    /// Never true for a result set without rows
    pub fn is_after_last(&self, store: &(impl RowStore + ?Sized)) -> bool {
        self.position == CursorPosition::AfterLast && store.rows_seen() > 0
    }

    pub fn is_first(&self) -> bool {
        self.position == CursorPosition::At(0)
    }

    pub fn is_last(&self, store: &(impl RowStore + ?Sized)) -> Result<bool> {
        let CursorPosition::At(i) = self.position else {
            return Ok(false);
        };
        match store.size() {
            Some(len) => Ok(i + 1 == len),
            None if self.scroll_tolerant => Ok(false),
            None => Err(Error::UnsupportedNavigation(
                "isLast() is not supported while a streaming result set has unread rows."
                    .to_owned(),
            )),
        }
    }

    /// 1-based number of the current row, `0` when not on a row
    pub fn row_number(&self) -> usize {
        self.current().map_or(0, |i| i + 1)
    }

    /// Reposition after the row at `idx` was removed from the store
    pub fn row_deleted(&mut self, idx: usize) {
        self.position = match idx.checked_sub(1) {
            Some(prev) => CursorPosition::At(prev),
            None => CursorPosition::BeforeFirst,
        };
    }
}
