//! A `ComputedFieldProvider` fixture for the `totalBudgetInfo` computed
//! field (spec §8 scenario S5), grounded on `filterql_engine::resolver`'s
//! `NoBeanResolver` registry-of-factories pattern.

use filterql_core::{Result, Value};
use filterql_engine::ComputedFieldProvider;

/// Formats `"Company#<id>: budget=<sum>"` from its two dependency values —
/// the company's own id (a plain, non-aggregate dependency) and the
/// `SUM(departments.budget)` reducer result.
pub struct CompanyBudgetProvider;

impl ComputedFieldProvider for CompanyBudgetProvider {
    fn compute(&self, _method_name: &str, dependency_values: &[Value]) -> Result<Value> {
        let id = dependency_values.first().cloned().unwrap_or(Value::Null);
        let budget = dependency_values.get(1).cloned().unwrap_or(Value::Null);
        Ok(Value::Str(format!("Company#{id}: budget={budget}")))
    }
}
