//! Costing-driven choices for table-function scans.

use rustc_hash::FxHashMap;
use tracing::debug;
use vtab_scan::{CostEstimate, CostingEnvironment, ScanContext, ScanCosting};

/// How often a scan's adapter is instantiated within one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationStrategy {
    /// A fresh instance (and scan) per outer row.
    PerOuterRow,
    /// One instance, read once; its rows are materialized and reused.
    MaterializeOnce,
}

/// Planner decision for one table-function reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPlan {
    pub estimate: CostEstimate,
    pub strategy: InstantiationStrategy,
    pub total_cost: f64,
}

/// Resolves costing answers for the table functions of one statement.
///
/// Each function is consulted once; later plans for the same function reuse
/// the cached answers.
#[derive(Debug, Default)]
pub struct ScanPlanner {
    env: CostingEnvironment,
    estimates: FxHashMap<(String, String), CostEstimate>,
}

impl ScanPlanner {
    pub fn new(env: CostingEnvironment) -> Self {
        Self {
            env,
            estimates: FxHashMap::default(),
        }
    }

    pub fn environment(&self) -> &CostingEnvironment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut CostingEnvironment {
        &mut self.env
    }

    /// The cached estimate for `context`, consulting `costing` on a miss.
    pub fn estimate(
        &mut self,
        context: &ScanContext,
        costing: Option<&dyn ScanCosting>,
    ) -> CostEstimate {
        let key = (context.schema_name.clone(), context.function_name.clone());
        if let Some(estimate) = self.estimates.get(&key) {
            return *estimate;
        }
        let estimate = CostEstimate::resolve(costing, &self.env);
        self.estimates.insert(key, estimate);
        estimate
    }

    /// Plan a scan whose enclosing plan yields `outer_rows` rows.
    pub fn plan(
        &mut self,
        context: &ScanContext,
        costing: Option<&dyn ScanCosting>,
        outer_rows: f64,
    ) -> ScanPlan {
        let estimate = self.estimate(context, costing);
        let strategy = if estimate.multiple_instantiations {
            InstantiationStrategy::PerOuterRow
        } else {
            InstantiationStrategy::MaterializeOnce
        };
        let plan = ScanPlan {
            estimate,
            strategy,
            total_cost: estimate.total_cost(outer_rows),
        };
        debug!(
            function = %context.function_name,
            ?strategy,
            total_cost = plan.total_cost,
            "planned table-function scan"
        );
        plan
    }
}
