use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Ordered field values for one CSV line, straight from the tokenizer.
/// Transient: produced by the parser, consumed immediately by the mapper.
pub type RawRow = Vec<String>;

/// The dashboards this pipeline serves, one per department sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dashboard {
    Sales,
    It,
    Dpo,
    Payroll,
    Bonus,
}

impl Dashboard {
    pub fn label(&self) -> &'static str {
        match self {
            Dashboard::Sales => "sales",
            Dashboard::It => "it",
            Dashboard::Dpo => "dpo",
            Dashboard::Payroll => "payroll",
            Dashboard::Bonus => "bonus",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesLead {
    pub date: String,
    pub firm: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
    pub source: String,
    pub status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItTicket {
    pub reported_at: String,
    pub requester: String,
    pub department: String,
    pub issue: String,
    pub category: String,
    pub status: String,
    /// "yes"/"no" column; OR'd with `status` when counting resolutions.
    pub solved: String,
    /// Primary free-form duration field ("1h 20m 5s").
    pub time_to_resolve: String,
    /// Secondary duration field, consulted when the primary is blank.
    pub resolution_time: String,
    pub satisfied: String,
    pub technician: String,
}

/// One numbered sub-item under a DPO lead group.
#[derive(Debug, Clone, Serialize)]
pub struct DpoItem {
    pub number: String,
    pub description: String,
    pub status: String,
}

/// A DPO lead group: a "LEAD n" marker row, the descriptive statement row
/// found within a few rows of it, and the numbered items that follow.
#[derive(Debug, Clone, Serialize)]
pub struct DpoTask {
    pub lead_label: String,
    pub statement: String,
    pub status: String,
    pub due_date: String,
    pub items: Vec<DpoItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayrollConcern {
    pub date: String,
    pub employee: String,
    pub department: String,
    pub concern_type: String,
    pub details: String,
    pub status: String,
    pub resolved_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeBonusProfile {
    pub employee: String,
    pub department: String,
    pub position: String,
    pub monthly_bonus: i64,
    pub quarterly_bonus: i64,
    pub attendance_bonus: i64,
}

/// A full parse result for one sheet fetch. Records are created fresh on
/// every fetch and never mutated afterwards; comparison is structural.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecordBatch {
    Sales(Vec<SalesLead>),
    It(Vec<ItTicket>),
    Dpo(Vec<DpoTask>),
    Payroll(Vec<PayrollConcern>),
    Bonus(Vec<EmployeeBonusProfile>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Sales(records) => records.len(),
            RecordBatch::It(records) => records.len(),
            RecordBatch::Dpo(records) => records.len(),
            RecordBatch::Payroll(records) => records.len(),
            RecordBatch::Bonus(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dashboard(&self) -> Dashboard {
        match self {
            RecordBatch::Sales(_) => Dashboard::Sales,
            RecordBatch::It(_) => Dashboard::It,
            RecordBatch::Dpo(_) => Dashboard::Dpo,
            RecordBatch::Payroll(_) => Dashboard::Payroll,
            RecordBatch::Bonus(_) => Dashboard::Bonus,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesStats {
    pub total: usize,
    pub converted: usize,
    pub conversion_rate: u32,
    pub by_status: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub completion_rate: u32,
    pub satisfaction_rate: u32,
    pub avg_resolution_secs: u64,
    pub avg_resolution: String,
    pub by_status: BTreeMap<String, usize>,
    pub by_technician: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DpoStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completion_rate: u32,
    pub item_count: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayrollStats {
    pub total: usize,
    pub resolved: usize,
    pub pending: usize,
    pub overdue: usize,
    pub resolution_rate: u32,
    pub by_status: BTreeMap<String, usize>,
    pub by_concern_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BonusStats {
    pub total: usize,
    pub total_monthly: i64,
    pub total_quarterly: i64,
    pub avg_monthly: i64,
    pub by_department: BTreeMap<String, usize>,
}

/// One dashboard's aggregate snapshot. Plain data, recomputed wholesale on
/// every request, safe to serialize for the UI layer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatsSnapshot {
    Sales(SalesStats),
    It(ItStats),
    Dpo(DpoStats),
    Payroll(PayrollStats),
    Bonus(BonusStats),
}

/// Request body for the asset submission endpoint. The endpoint itself is an
/// external collaborator; only the wire shape belongs to this crate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub name: String,
    pub email: String,
    pub department: String,
    pub asset: String,
    pub reason: String,
    /// PNG signature as a `data:image/png;base64,..` URL, when captured.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub request_id: Option<String>,
    pub message: Option<String>,
}
