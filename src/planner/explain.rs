//! Explain output for scan plans
//!
//! Deterministic, human-readable and serializable.

use std::fmt;

use serde::Serialize;

use super::errors::PlannerError;
use super::selector::PhysicalPlan;

/// Explain plan output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// `INDEX_SCAN` or `TABLE_SCAN` (if accepted)
    pub scan_type: Option<String>,
    pub table: Option<String>,
    pub index: Option<String>,
    /// Index sort order
    pub collation: Option<String>,
    /// One entry per bounded collation column
    pub bounds: Vec<String>,
    /// Predicate evaluated per row
    pub filter: Option<String>,
    pub projects: Vec<String>,
    pub required_columns: Option<Vec<usize>>,
    /// Why an index scan was ruled out
    pub fallback_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a physical plan
    pub fn from_plan(plan: &PhysicalPlan) -> Self {
        let mut out = Self {
            accepted: true,
            scan_type: Some(plan.kind().to_string()),
            table: Some(plan.table().to_string()),
            index: plan.index().map(str::to_string),
            collation: None,
            bounds: Vec::new(),
            filter: None,
            projects: Vec::new(),
            required_columns: None,
            fallback_reason: None,
            rejection_code: None,
            rejection_reason: None,
        };

        let (filter, projects, required) = match plan {
            PhysicalPlan::IndexScan(p) => {
                out.collation = Some(p.collation.to_string());
                out.bounds = p.conditions.bounds().iter().map(|b| b.to_string()).collect();
                (&p.filter, &p.projects, &p.required_columns)
            }
            PhysicalPlan::TableScan(p) => {
                out.fallback_reason = p.reason.map(|r| r.as_str().to_string());
                (&p.filter, &p.projects, &p.required_columns)
            }
        };
        out.filter = filter.as_ref().map(|f| f.to_string());
        out.projects = projects
            .iter()
            .flatten()
            .map(|p| p.to_string())
            .collect();
        out.required_columns = required.as_ref().map(|r| r.columns().to_vec());
        out
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self {
            accepted: false,
            scan_type: None,
            table: err.table().map(str::to_string),
            index: None,
            collation: None,
            bounds: Vec::new(),
            filter: None,
            projects: Vec::new(),
            required_columns: None,
            fallback_reason: None,
            rejection_code: Some(err.code().code().to_string()),
            rejection_reason: Some(err.message().to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        if let Some(scan) = &self.scan_type {
            writeln!(f, "Scan Type: {}", scan)?;
        }
        if let Some(table) = &self.table {
            writeln!(f, "Table: {}", table)?;
        }
        if let Some(index) = &self.index {
            writeln!(f, "Index: {}", index)?;
        }
        if let Some(collation) = &self.collation {
            writeln!(f, "Collation: {}", collation)?;
        }
        if !self.bounds.is_empty() {
            writeln!(f, "Bounds:")?;
            for b in &self.bounds {
                writeln!(f, "  - {}", b)?;
            }
        }
        if let Some(filter) = &self.filter {
            writeln!(f, "Filter: {}", filter)?;
        }
        if let Some(required) = &self.required_columns {
            let cols: Vec<String> = required.iter().map(|c| format!("${}", c)).collect();
            writeln!(f, "Required Columns: {}", cols.join(", "))?;
        }
        if !self.projects.is_empty() {
            writeln!(f, "Projects: {}", self.projects.join(", "))?;
        }
        if let Some(reason) = &self.fallback_reason {
            writeln!(f, "Fallback: {}", reason)?;
        }
        Ok(())
    }
}
