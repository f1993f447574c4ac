use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::types::{DiffRow, DiffStatus, ObjectType, ResultRow, RowId};

/// Per-status row counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub identical: usize,
    pub different: usize,
    pub source_only: usize,
    pub target_only: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: DiffStatus) {
        match status {
            DiffStatus::Identical => self.identical += 1,
            DiffStatus::Different => self.different += 1,
            DiffStatus::SourceOnly => self.source_only += 1,
            DiffStatus::TargetOnly => self.target_only += 1,
        }
    }

    pub fn get(&self, status: DiffStatus) -> usize {
        match status {
            DiffStatus::Identical => self.identical,
            DiffStatus::Different => self.different,
            DiffStatus::SourceOnly => self.source_only,
            DiffStatus::TargetOnly => self.target_only,
        }
    }

    pub fn total(&self) -> usize {
        self.identical + self.different + self.source_only + self.target_only
    }
}

/// Aggregate view of one object type.
///
/// `counts` and `rows` always cover the unfiltered set; `visible_rows` is the
/// subset passing the current filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeGroup {
    pub object_type: ObjectType,
    pub counts: StatusCounts,
    pub rows: Vec<RowId>,
    pub visible_rows: Vec<RowId>,
}

/// Rows of one comparison attempt, with the visibility filter and the
/// selection used for script generation.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet {
    rows: Vec<ResultRow>,
    index: HashMap<RowId, usize>,
    filter: BTreeSet<DiffStatus>,
    selection: Vec<RowId>,
    selected: HashSet<RowId>,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty(Self::default_filter())
    }
}

impl ResultSet {
    /// Every status except `Identical`.
    pub fn default_filter() -> BTreeSet<DiffStatus> {
        BTreeSet::from([
            DiffStatus::Different,
            DiffStatus::SourceOnly,
            DiffStatus::TargetOnly,
        ])
    }

    pub fn empty(filter: BTreeSet<DiffStatus>) -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
            filter,
            selection: Vec::new(),
            selected: HashSet::new(),
        }
    }

    /// Builds a result set, numbering rows from `first_id` in engine order.
    pub fn ingest(rows: Vec<DiffRow>, first_id: u64, filter: BTreeSet<DiffStatus>) -> Self {
        let rows: Vec<ResultRow> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| ResultRow {
                id: RowId(first_id + i as u64),
                row,
            })
            .collect();
        let index = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

        Self {
            rows,
            index,
            filter,
            selection: Vec::new(),
            selected: HashSet::new(),
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: RowId) -> Option<&ResultRow> {
        self.index.get(&id).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn filter(&self) -> &BTreeSet<DiffStatus> {
        &self.filter
    }

    pub fn apply_filter(&mut self, statuses: impl IntoIterator<Item = DiffStatus>) {
        self.filter = statuses.into_iter().collect();
    }

    pub fn is_visible(&self, row: &ResultRow) -> bool {
        self.filter.contains(&row.row.status)
    }

    pub fn visible_rows(&self) -> Vec<&ResultRow> {
        self.rows.iter().filter(|r| self.is_visible(r)).collect()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for r in &self.rows {
            counts.add(r.row.status);
        }
        counts
    }

    /// Groups rows by object type in a single pass.
    pub fn group_by_type(&self) -> Vec<TypeGroup> {
        let mut groups: BTreeMap<ObjectType, TypeGroup> = BTreeMap::new();

        for r in &self.rows {
            let group = groups
                .entry(r.row.object_type)
                .or_insert_with(|| TypeGroup {
                    object_type: r.row.object_type,
                    counts: StatusCounts::default(),
                    rows: Vec::new(),
                    visible_rows: Vec::new(),
                });

            group.counts.add(r.row.status);
            group.rows.push(r.id);
            if self.is_visible(r) {
                group.visible_rows.push(r.id);
            }
        }

        groups.into_values().collect()
    }

    /// Adds ids to the selection, keeping first-selection order.
    /// Ids not in this result set are ignored. Returns how many were added.
    pub fn select(&mut self, ids: impl IntoIterator<Item = RowId>) -> usize {
        let mut added = 0;
        for id in ids {
            if self.contains(id) && self.selected.insert(id) {
                self.selection.push(id);
                added += 1;
            }
        }
        added
    }

    /// Removes ids from the selection. Returns how many were removed.
    pub fn deselect(&mut self, ids: impl IntoIterator<Item = RowId>) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.selected.remove(&id) {
                removed += 1;
            }
        }
        if removed > 0 {
            let selected = &self.selected;
            self.selection.retain(|id| selected.contains(id));
        }
        removed
    }

    pub fn select_visible(&mut self) -> usize {
        let ids: Vec<RowId> = self.visible_rows().iter().map(|r| r.id).collect();
        self.select(ids)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selected.clear();
    }

    pub fn selection(&self) -> &[RowId] {
        &self.selection
    }

    pub fn is_selected(&self, id: RowId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected rows in the order they were selected.
    pub fn selected_rows(&self) -> Vec<&ResultRow> {
        self.selection.iter().filter_map(|id| self.get(*id)).collect()
    }
}
