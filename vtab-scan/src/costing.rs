//! Planner estimates supplied by table-function adapters.

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use vtab_result::Result;

/// Row count assumed when an adapter gives no usable estimate.
pub const DEFAULT_ROW_COUNT: f64 = 10_000.0;
/// Cost of one instantiation assumed when an adapter gives no usable
/// estimate.
pub const DEFAULT_COST_PER_INSTANTIATION: f64 = 100_000.0;

/// Compile-time environment passed to costing calls.
///
/// The shared-state bag is visible to every instantiation of the function
/// within one statement.
#[derive(Default, Clone)]
pub struct CostingEnvironment {
    original_sql: Option<String>,
    shared: FxHashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for CostingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostingEnvironment")
            .field("original_sql", &self.original_sql)
            .field("shared_keys", &self.shared.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CostingEnvironment {
    pub fn new(original_sql: impl Into<String>) -> Self {
        Self {
            original_sql: Some(original_sql.into()),
            shared: FxHashMap::default(),
        }
    }

    /// Text of the statement being compiled, if known.
    pub fn original_sql(&self) -> Option<&str> {
        self.original_sql.as_deref()
    }

    pub fn set_shared_state<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.shared.insert(key.into(), Arc::new(value));
    }

    pub fn shared_state<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.shared.get(key)?.downcast_ref::<T>()
    }
}

/// Estimates an adapter may provide to the planner.
///
/// Every method has a default; adapters override the ones they can answer.
pub trait ScanCosting {
    fn estimated_row_count(&self, env: &CostingEnvironment) -> Result<f64> {
        let _ = env;
        Ok(DEFAULT_ROW_COUNT)
    }

    fn estimated_cost_per_instantiation(&self, env: &CostingEnvironment) -> Result<f64> {
        let _ = env;
        Ok(DEFAULT_COST_PER_INSTANTIATION)
    }

    /// Whether the scan may be instantiated (and re-read) more than once per
    /// statement, for example as the inner side of a join.
    fn supports_multiple_instantiations(&self, env: &CostingEnvironment) -> Result<bool> {
        let _ = env;
        Ok(true)
    }
}

/// Costing answers resolved once for a planned scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub row_count: f64,
    pub cost_per_instantiation: f64,
    pub multiple_instantiations: bool,
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self {
            row_count: DEFAULT_ROW_COUNT,
            cost_per_instantiation: DEFAULT_COST_PER_INSTANTIATION,
            multiple_instantiations: true,
        }
    }
}

impl CostEstimate {
    /// Ask `costing` once for each estimate, falling back to the defaults for
    /// any answer that fails or is negative or not finite.
    pub fn resolve(costing: Option<&dyn ScanCosting>, env: &CostingEnvironment) -> Self {
        let Some(costing) = costing else {
            debug!("no costing interface, using default estimates");
            return Self::default();
        };
        let estimate = Self {
            row_count: usable(
                "estimated_row_count",
                costing.estimated_row_count(env),
                DEFAULT_ROW_COUNT,
            ),
            cost_per_instantiation: usable(
                "estimated_cost_per_instantiation",
                costing.estimated_cost_per_instantiation(env),
                DEFAULT_COST_PER_INSTANTIATION,
            ),
            multiple_instantiations: match costing.supports_multiple_instantiations(env) {
                Ok(flag) => flag,
                Err(err) => {
                    warn!(%err, "supports_multiple_instantiations failed, assuming true");
                    true
                }
            },
        };
        debug!(?estimate, "resolved scan costing");
        estimate
    }

    /// Cost of the scan when its enclosing plan produces `outer_rows` rows.
    ///
    /// A scan that cannot be re-instantiated is read once and materialized,
    /// so its cost does not grow with the outer side.
    pub fn total_cost(&self, outer_rows: f64) -> f64 {
        if self.multiple_instantiations {
            self.cost_per_instantiation * outer_rows.max(1.0)
        } else {
            self.cost_per_instantiation
        }
    }
}

fn usable(what: &'static str, answer: Result<f64>, default: f64) -> f64 {
    match answer {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        Ok(value) => {
            warn!(what, value, default, "unusable costing estimate, using default");
            default
        }
        Err(err) => {
            warn!(what, %err, default, "costing call failed, using default");
            default
        }
    }
}
