//! Mapping engine column numbers onto the columns a source actually fetches.

use vtab_types::ColumnSchema;

/// External (engine) 1-based column number to source 1-based column number.
///
/// Built once from the required-column list handed to scan initialization.
/// Required columns receive increasing source ordinals starting at 1 in
/// declared order; columns that are not required stay addressable by the
/// engine but have no source column and read as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionMap {
    slots: Vec<Option<usize>>,
}

impl ProjectionMap {
    /// Build the map from one slot per declared column.
    ///
    /// # Examples
    ///
    /// ```
    /// use vtab_scan::ProjectionMap;
    ///
    /// let map = ProjectionMap::from_required(&[None, Some("NAME".into()), Some("AGE".into())]);
    /// assert_eq!(map.map(1), None);
    /// assert_eq!(map.map(2), Some(1));
    /// assert_eq!(map.map(3), Some(2));
    /// ```
    pub fn from_required(required: &[Option<String>]) -> Self {
        let mut next = 0;
        let slots = required
            .iter()
            .map(|slot| {
                slot.as_ref().map(|_| {
                    next += 1;
                    next
                })
            })
            .collect();
        Self { slots }
    }

    /// Every column maps to itself.
    pub fn identity(column_count: usize) -> Self {
        Self {
            slots: (1..=column_count).map(Some).collect(),
        }
    }

    /// All columns of `schema`, mapped to themselves.
    pub fn for_schema(schema: &ColumnSchema) -> Self {
        Self::identity(schema.len())
    }

    /// Source column for the external column, if it is fetched.
    #[inline]
    pub fn map(&self, external: usize) -> Option<usize> {
        external
            .checked_sub(1)
            .and_then(|idx| self.slots.get(idx).copied().flatten())
    }

    #[inline]
    pub fn is_mapped(&self, external: usize) -> bool {
        self.map(external).is_some()
    }

    /// Number of external columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of columns the source fetches.
    pub fn mapped_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// `(external, source)` pairs in declared order.
    pub fn mapped_columns(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|source| (idx + 1, source)))
    }
}
