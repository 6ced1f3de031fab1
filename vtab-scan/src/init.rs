//! Scan initialization: telling an adapter which columns and rows the engine
//! needs before the first row is fetched.

use tracing::debug;
use vtab_expr::Restriction;
use vtab_result::{Error, Result};
use vtab_types::ColumnSchema;

use crate::projection::ProjectionMap;

/// Adapters that accept projection and restriction hints.
pub trait RestrictedScan {
    /// Record the columns the engine will read and the rows it wants.
    ///
    /// `required_columns` has exactly one slot per declared column; a slot
    /// holds the column's name when the engine reads it and `None` when it
    /// does not. The restriction may be used to narrow the fetch but the
    /// engine re-applies it, so ignoring it is always correct.
    ///
    /// Called at most once per adapter instance and only before the first
    /// `next()`.
    fn init_scan(
        &mut self,
        required_columns: &[Option<String>],
        restriction: Option<Restriction>,
    ) -> Result<()>;
}

/// Bookkeeping shared by adapters implementing [`RestrictedScan`].
///
/// Enforces the once-only, before-first-fetch rule, validates the
/// required-column list and owns the resulting [`ProjectionMap`] and
/// restriction.
#[derive(Debug, Default)]
pub struct ScanSetup {
    initialized: bool,
    fetch_started: bool,
    projection: Option<ProjectionMap>,
    restriction: Option<Restriction>,
}

impl ScanSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record one `init_scan` call.
    pub fn init(
        &mut self,
        schema: &ColumnSchema,
        required_columns: &[Option<String>],
        restriction: Option<Restriction>,
    ) -> Result<&ProjectionMap> {
        if self.initialized {
            return Err(Error::configuration(
                "init_scan may only be called once per scan",
            ));
        }
        if self.fetch_started {
            return Err(Error::configuration(
                "init_scan must be called before the first row is fetched",
            ));
        }
        if required_columns.len() != schema.len() {
            return Err(Error::configuration(format!(
                "init_scan expected {} column slots, got {}",
                schema.len(),
                required_columns.len()
            )));
        }
        for (idx, slot) in required_columns.iter().enumerate() {
            if let Some(name) = slot {
                let declared = schema.name(idx + 1)?;
                if name != declared {
                    return Err(Error::configuration(format!(
                        "required column {} is \"{name}\" but the declared column is \"{declared}\"",
                        idx + 1
                    )));
                }
            }
        }

        let projection = ProjectionMap::from_required(required_columns);
        debug!(
            required = projection.mapped_count(),
            declared = projection.len(),
            restricted = restriction.is_some(),
            "init_scan"
        );
        self.initialized = true;
        self.restriction = restriction;
        Ok(self.projection.insert(projection))
    }

    /// Note that row fetching has begun; later `init` calls fail.
    #[inline]
    pub fn mark_fetch_started(&mut self) {
        self.fetch_started = true;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn projection(&self) -> Option<&ProjectionMap> {
        self.projection.as_ref()
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// Whether the engine reads `column`. Everything is read until
    /// `init_scan` says otherwise.
    pub fn is_required(&self, column: usize) -> bool {
        self.projection
            .as_ref()
            .is_none_or(|projection| projection.is_mapped(column))
    }

    /// Drop the recorded columns and restriction when the cursor closes.
    pub fn release(&mut self) {
        self.projection = None;
        self.restriction = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtab_expr::CompareOp;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(["ID", "NAME"]).expect("schema")
    }

    #[test]
    fn second_init_is_rejected() {
        let mut setup = ScanSetup::new();
        setup
            .init(&schema(), &[Some("ID".into()), None], None)
            .expect("first init");
        let err = setup
            .init(&schema(), &[Some("ID".into()), None], None)
            .expect_err("second init");
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn init_after_fetch_is_rejected() {
        let mut setup = ScanSetup::new();
        setup.mark_fetch_started();
        assert!(matches!(
            setup.init(&schema(), &[None, None], None),
            Err(Error::Configuration(_))
        ));
        assert!(setup.is_required(2));
    }

    #[test]
    fn arity_and_names_are_checked() {
        let mut setup = ScanSetup::new();
        assert!(matches!(
            setup.init(&schema(), &[None], None),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            setup.init(&schema(), &[Some("NAME".into()), None], None),
            Err(Error::Configuration(_))
        ));
        assert!(!setup.is_initialized());
    }

    #[test]
    fn records_projection_and_restriction() {
        let mut setup = ScanSetup::new();
        let restriction = Restriction::compare("ID", CompareOp::Eq, 2);
        let projection = setup
            .init(&schema(), &[Some("ID".into()), None], Some(restriction.clone()))
            .expect("init");
        assert_eq!(projection.map(1), Some(1));
        assert_eq!(projection.map(2), None);
        assert_eq!(setup.restriction(), Some(&restriction));
        assert!(!setup.is_required(2));

        setup.release();
        assert!(setup.projection().is_none());
        assert!(setup.restriction().is_none());
    }
}
