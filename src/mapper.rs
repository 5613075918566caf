//! Positional row-to-record mapping for each dashboard schema.
//!
//! Rows with a blank key column, repeated header rows pasted mid-sheet, and
//! rows with too few columns are skipped silently. Out-of-range columns read
//! as empty strings and numeric cells parse leniently to 0. Row-level
//! problems never fail a batch; the only observable effect is a smaller
//! output count.

use tracing::debug;

use crate::models::{
    Dashboard, DpoItem, DpoTask, EmployeeBonusProfile, ItTicket, PayrollConcern, RawRow,
    RecordBatch, SalesLead,
};

/// Per-schema mapping table: where the identifying key lives, how many
/// columns a usable row needs, the header labels that betray a pasted-again
/// header, whether the schema uses "LEAD n" group markers, and whether its
/// fields are whitespace-trimmed at tokenize time. Schema drift in a sheet
/// is a one-place edit here.
pub struct SchemaSpec {
    pub key_column: usize,
    pub min_columns: usize,
    pub header_labels: &'static [&'static str],
    pub group_markers: bool,
    pub trims_fields: bool,
}

pub fn schema_spec(dashboard: Dashboard) -> &'static SchemaSpec {
    match dashboard {
        Dashboard::Sales => &SchemaSpec {
            key_column: 1,
            min_columns: 3,
            header_labels: &["firm", "firm name", "company"],
            group_markers: false,
            trims_fields: false,
        },
        Dashboard::It => &SchemaSpec {
            key_column: 1,
            min_columns: 6,
            header_labels: &["requester", "reported by", "name"],
            group_markers: false,
            trims_fields: false,
        },
        Dashboard::Dpo => &SchemaSpec {
            key_column: 1,
            min_columns: 2,
            header_labels: &["statement", "task", "task name"],
            group_markers: true,
            trims_fields: false,
        },
        Dashboard::Payroll => &SchemaSpec {
            key_column: 1,
            min_columns: 4,
            header_labels: &["employee", "employee name"],
            group_markers: false,
            trims_fields: true,
        },
        Dashboard::Bonus => &SchemaSpec {
            key_column: 0,
            min_columns: 3,
            header_labels: &["employee", "employee name", "name"],
            group_markers: false,
            trims_fields: true,
        },
    }
}

/// Classification of one raw row, so the mapping loops and the DPO grouping
/// machine work on tagged input instead of re-deriving string checks inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Blank,
    /// A repeated header pasted into the data region.
    Header,
    /// A "LEAD n" group marker (marker schemas only).
    Marker,
    /// A numbered sub-item row like "1." (marker schemas only).
    Numbered,
    /// Too few columns to map; excluded, batch continues.
    Short,
    Data,
}

/// Marker and numbered checks look at column 0 and take precedence over the
/// blank-key rule: a marker row commonly has nothing in the key column.
pub fn classify_row(row: &RawRow, spec: &SchemaSpec) -> RowClass {
    if row.iter().all(|cell| cell.trim().is_empty()) {
        return RowClass::Blank;
    }
    if spec.group_markers {
        let first = row.first().map(|cell| cell.trim()).unwrap_or("");
        if is_marker(first) {
            return RowClass::Marker;
        }
        if is_numbered(first) {
            return RowClass::Numbered;
        }
    }
    let key = row
        .get(spec.key_column)
        .map(|cell| cell.trim())
        .unwrap_or("");
    if key.is_empty() {
        return RowClass::Blank;
    }
    if spec.header_labels.contains(&key.to_lowercase().as_str()) {
        return RowClass::Header;
    }
    if row.len() < spec.min_columns {
        return RowClass::Short;
    }
    RowClass::Data
}

fn is_marker(text: &str) -> bool {
    match text.to_lowercase().strip_prefix("lead ") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn is_numbered(text: &str) -> bool {
    let body = text.trim_end_matches('.');
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit())
}

/// Column accessor: out-of-range reads as empty, never an error.
fn field(row: &RawRow, index: usize) -> String {
    row.get(index).cloned().unwrap_or_default()
}

/// Lenient integer parse in the sheet's spirit: optional sign, then leading
/// digits; anything else (including empty) is 0.
pub fn lenient_int(text: &str) -> i64 {
    let text = text.trim();
    let mut digits = String::new();
    let mut chars = text.chars().peekable();
    if let Some('-') = chars.peek() {
        digits.push('-');
        chars.next();
    }
    while let Some(ch) = chars.peek() {
        if ch.is_ascii_digit() {
            digits.push(*ch);
            chars.next();
        } else {
            break;
        }
    }
    digits.parse().unwrap_or(0)
}

/// Map tokenized rows (header first) into typed records for `dashboard`.
pub fn map_batch(dashboard: Dashboard, rows: &[RawRow]) -> RecordBatch {
    let batch = match dashboard {
        Dashboard::Sales => RecordBatch::Sales(map_sales(rows)),
        Dashboard::It => RecordBatch::It(map_it(rows)),
        Dashboard::Dpo => RecordBatch::Dpo(map_dpo(rows)),
        Dashboard::Payroll => RecordBatch::Payroll(map_payroll(rows)),
        Dashboard::Bonus => RecordBatch::Bonus(map_bonus(rows)),
    };
    debug!(
        dashboard = dashboard.label(),
        rows = rows.len(),
        records = batch.len(),
        "mapped sheet rows"
    );
    batch
}

/// Rows after the header that classify as plain data for this schema.
fn data_rows<'a>(
    rows: &'a [RawRow],
    spec: &'static SchemaSpec,
) -> impl Iterator<Item = &'a RawRow> + 'a {
    rows.iter()
        .skip(1)
        .filter(move |row| classify_row(row, spec) == RowClass::Data)
}

pub fn map_sales(rows: &[RawRow]) -> Vec<SalesLead> {
    data_rows(rows, schema_spec(Dashboard::Sales))
        .map(|row| SalesLead {
            date: field(row, 0),
            firm: field(row, 1).trim().to_string(),
            contact: field(row, 2),
            phone: field(row, 3),
            email: field(row, 4),
            source: field(row, 5),
            status: field(row, 6),
            remarks: field(row, 7),
        })
        .collect()
}

pub fn map_it(rows: &[RawRow]) -> Vec<ItTicket> {
    data_rows(rows, schema_spec(Dashboard::It))
        .map(|row| ItTicket {
            reported_at: field(row, 0),
            requester: field(row, 1).trim().to_string(),
            department: field(row, 2),
            issue: field(row, 3),
            category: field(row, 4),
            status: field(row, 5),
            solved: field(row, 6),
            time_to_resolve: field(row, 7),
            resolution_time: field(row, 8),
            satisfied: field(row, 9),
            technician: field(row, 10),
        })
        .collect()
}

pub fn map_payroll(rows: &[RawRow]) -> Vec<PayrollConcern> {
    data_rows(rows, schema_spec(Dashboard::Payroll))
        .map(|row| PayrollConcern {
            date: field(row, 0),
            employee: field(row, 1).trim().to_string(),
            department: field(row, 2),
            concern_type: field(row, 3),
            details: field(row, 4),
            status: field(row, 5),
            resolved_at: field(row, 6),
        })
        .collect()
}

pub fn map_bonus(rows: &[RawRow]) -> Vec<EmployeeBonusProfile> {
    data_rows(rows, schema_spec(Dashboard::Bonus))
        .map(|row| EmployeeBonusProfile {
            employee: field(row, 0).trim().to_string(),
            department: field(row, 1),
            position: field(row, 2),
            monthly_bonus: lenient_int(&field(row, 3)),
            quarterly_bonus: lenient_int(&field(row, 4)),
            attendance_bonus: lenient_int(&field(row, 5)),
        })
        .collect()
}

/// DPO sheets are group-structured: a "LEAD n" marker starts a group, the
/// first plain row within four rows of the marker supplies the group's
/// statement and status, and numbered rows become child items of the current
/// group until the next marker. Numbered rows seen before any marker have no
/// home and are dropped.
pub fn map_dpo(rows: &[RawRow]) -> Vec<DpoTask> {
    const STATEMENT_SEARCH_LIMIT: usize = 4;
    let spec = schema_spec(Dashboard::Dpo);
    let mut tasks: Vec<DpoTask> = Vec::new();
    let mut index = 1;

    while index < rows.len() {
        let row = &rows[index];
        match classify_row(row, spec) {
            RowClass::Marker => {
                let mut task = DpoTask {
                    lead_label: field(row, 0).trim().to_string(),
                    statement: String::new(),
                    status: String::new(),
                    due_date: String::new(),
                    items: Vec::new(),
                };
                let mut consumed = 0;
                for offset in 1..=STATEMENT_SEARCH_LIMIT {
                    let Some(candidate) = rows.get(index + offset) else {
                        break;
                    };
                    match classify_row(candidate, spec) {
                        RowClass::Marker | RowClass::Numbered => break,
                        RowClass::Blank | RowClass::Header => continue,
                        RowClass::Data | RowClass::Short => {
                            task.statement = field(candidate, 1).trim().to_string();
                            task.status = field(candidate, 2).trim().to_string();
                            task.due_date = field(candidate, 3).trim().to_string();
                            consumed = offset;
                            break;
                        }
                    }
                }
                tasks.push(task);
                index += consumed + 1;
            }
            RowClass::Numbered => {
                if let Some(task) = tasks.last_mut() {
                    task.items.push(DpoItem {
                        number: field(row, 0).trim().to_string(),
                        description: field(row, 1).trim().to_string(),
                        status: field(row, 2).trim().to_string(),
                    });
                }
                index += 1;
            }
            _ => index += 1,
        }
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_line::parse_line;

    fn rows(lines: &[&str]) -> Vec<RawRow> {
        lines.iter().map(|line| parse_line(line)).collect()
    }

    #[test]
    fn sales_rows_map_positionally() {
        let input = rows(&[
            "Date,Firm,Contact,Phone,Email,Source,Status,Remarks",
            "2024-01-05,Acme Corp,Jane Doe,555-0101,jane@acme.test,Referral,New,call back",
        ]);
        let leads = map_sales(&input);
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].firm, "Acme Corp");
        assert_eq!(leads[0].source, "Referral");
        assert_eq!(leads[0].status, "New");
    }

    #[test]
    fn blank_key_and_repeated_header_rows_are_skipped() {
        let input = rows(&[
            "Date,Firm,Contact",
            "2024-01-05,Acme Corp,Jane",
            "2024-01-06,,nobody",
            "Date,Firm,Contact",
            "2024-01-07,Globex,Sam",
        ]);
        let leads = map_sales(&input);
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].firm, "Acme Corp");
        assert_eq!(leads[1].firm, "Globex");
    }

    #[test]
    fn short_rows_are_excluded_without_failing_the_batch() {
        // Ten lines, one of them (line 5) has 2 of the 6 required columns.
        let mut lines = vec!["When,Requester,Dept,Issue,Category,Status".to_string()];
        for n in 1..=9 {
            if n == 4 {
                lines.push("2024-01-04,Pat".to_string());
            } else {
                lines.push(format!(
                    "2024-01-{n:02},Requester {n},Ops,broken thing,Hardware,Pending"
                ));
            }
        }
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let tickets = map_it(&rows(&line_refs));
        assert_eq!(tickets.len(), 8);
    }

    #[test]
    fn missing_trailing_columns_default_to_empty() {
        let input = rows(&[
            "When,Requester,Dept,Issue,Category,Status",
            "2024-01-04,Pat,Ops,printer jam,Hardware,Pending",
        ]);
        let tickets = map_it(&input);
        assert_eq!(tickets[0].technician, "");
        assert_eq!(tickets[0].time_to_resolve, "");
    }

    #[test]
    fn bonus_numeric_cells_parse_leniently() {
        let input = rows(&[
            "Employee,Department,Position,Monthly,Quarterly,Attendance",
            "Avery Lee,Finance,Analyst,1200,peanuts,300",
        ]);
        let profiles = map_bonus(&input);
        assert_eq!(profiles[0].monthly_bonus, 1200);
        assert_eq!(profiles[0].quarterly_bonus, 0);
        assert_eq!(profiles[0].attendance_bonus, 300);
    }

    #[test]
    fn lenient_int_takes_leading_digits_only() {
        assert_eq!(lenient_int("1500"), 1500);
        assert_eq!(lenient_int("  42 "), 42);
        assert_eq!(lenient_int("-7"), -7);
        assert_eq!(lenient_int("12abc"), 12);
        assert_eq!(lenient_int("abc"), 0);
        assert_eq!(lenient_int(""), 0);
    }

    #[test]
    fn dpo_markers_open_groups_and_numbered_rows_attach() {
        let input = rows(&[
            "Lead,Statement,Status,Due",
            "LEAD 1,,,",
            ",Finish privacy audit,Pending,2024-03-01",
            "1.,collect processor list,Resolved",
            "2.,review retention policy,Pending",
            "LEAD 2,,,",
            ",Update consent forms,Resolved,2024-04-01",
            "1.,draft new wording,Resolved",
        ]);
        let tasks = map_dpo(&input);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].lead_label, "LEAD 1");
        assert_eq!(tasks[0].statement, "Finish privacy audit");
        assert_eq!(tasks[0].status, "Pending");
        assert_eq!(tasks[0].items.len(), 2);
        assert_eq!(tasks[1].items[0].description, "draft new wording");
    }

    #[test]
    fn numbered_row_before_any_marker_is_dropped() {
        let input = rows(&[
            "Lead,Statement,Status",
            "1.,orphan item,Pending",
            "LEAD 1,,,",
            ",Real statement,Pending,",
        ]);
        let tasks = map_dpo(&input);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].statement, "Real statement");
        assert!(tasks[0].items.is_empty());
    }

    #[test]
    fn dpo_statement_search_skips_blank_rows() {
        let input = rows(&[
            "Lead,Statement,Status",
            "LEAD 3,,,",
            ",,,",
            ",Late statement,Overdue,",
        ]);
        let tasks = map_dpo(&input);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].statement, "Late statement");
        assert_eq!(tasks[0].status, "Overdue");
    }

    #[test]
    fn marker_without_statement_still_opens_a_group() {
        let input = rows(&[
            "Lead,Statement,Status",
            "LEAD 1,,,",
            "LEAD 2,,,",
            ",Second statement,Pending,",
        ]);
        let tasks = map_dpo(&input);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].statement, "");
        assert_eq!(tasks[1].statement, "Second statement");
    }

    #[test]
    fn classify_recognizes_each_row_kind() {
        let spec = schema_spec(Dashboard::Dpo);
        assert_eq!(classify_row(&parse_line("LEAD 4,x"), spec), RowClass::Marker);
        assert_eq!(classify_row(&parse_line("lead 12,x"), spec), RowClass::Marker);
        assert_eq!(classify_row(&parse_line("2.,x"), spec), RowClass::Numbered);
        assert_eq!(classify_row(&parse_line(",,"), spec), RowClass::Blank);
        assert_eq!(classify_row(&parse_line(",Statement,x"), spec), RowClass::Header);
        assert_eq!(
            classify_row(&parse_line(",Review the DPIA backlog,Pending"), spec),
            RowClass::Data
        );
    }
}
