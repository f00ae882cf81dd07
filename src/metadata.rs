use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::column::ColumnDescriptor;

/// Column descriptors of one result set.
///
/// Cheap to clone; a cached statement shares one allocation across its executions.
#[derive(Debug, Clone)]
pub struct ResultSetMetadata {
    columns: Arc<[ColumnDescriptor]>,
}

impl ResultSetMetadata {
    pub fn new(columns: impl Into<Arc<[ColumnDescriptor]>>) -> Self {
        Self {
            columns: columns.into(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Column by 0-based index
    pub fn column(&self, idx: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(idx)
    }

    /// 0-based index of the first column matching `name`.
    ///
    /// Labels are matched first, then base column names, then `table.column`,
    /// all ASCII case-insensitively.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        let by_label = self
            .columns
            .iter()
            .position(|c| c.label().eq_ignore_ascii_case(name));
        let by_name = || {
            self.columns
                .iter()
                .position(|c| c.column_name().eq_ignore_ascii_case(name))
        };
        let by_qualified = || {
            let (table, column) = name.split_once('.')?;
            self.columns.iter().position(|c| {
                (c.table.eq_ignore_ascii_case(table) || c.org_table.eq_ignore_ascii_case(table))
                    && c.column_name().eq_ignore_ascii_case(column)
            })
        };
        by_label.or_else(by_name).or_else(by_qualified)
    }

    pub(crate) fn shared(&self) -> Arc<[ColumnDescriptor]> {
        Arc::clone(&self.columns)
    }
}

/// Column descriptors keyed by statement text, evicting the oldest entry when full.
#[derive(Debug)]
pub struct MetadataCache {
    capacity: usize,
    entries: HashMap<String, ResultSetMetadata>,
    order: VecDeque<String>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, sql: &str) -> Option<ResultSetMetadata> {
        self.entries.get(sql).cloned()
    }

    pub fn insert(&mut self, sql: &str, metadata: ResultSetMetadata) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(sql.to_owned(), metadata).is_some() {
            return;
        }
        self.order.push_back(sql.to_owned());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
