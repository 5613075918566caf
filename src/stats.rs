//! Dashboard aggregates. Every `compute_*` function is pure: same records
//! in, same snapshot out, recomputed wholesale on each request.

use std::collections::BTreeMap;

use crate::models::{
    BonusStats, DpoStats, DpoTask, EmployeeBonusProfile, ItStats, ItTicket, PayrollConcern,
    PayrollStats, RecordBatch, SalesLead, SalesStats, StatsSnapshot,
};
use crate::temporal::{
    bucket_by_week, format_duration, iso_week_year, parse_duration, parse_sheet_date,
};

/// Percentage as the dashboards display it: `round(matching / total * 100)`,
/// 0 when the input set is empty. Never divides by zero, never yields NaN.
pub fn rate(matching: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((matching as f64 / total as f64) * 100.0).round() as u32
    }
}

fn is_yes(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

fn has_status(text: &str, expected: &str) -> bool {
    text.trim().eq_ignore_ascii_case(expected)
}

/// Count records by a category label. Empty labels are excluded rather than
/// bucketed under an "unknown" key; the UI asks for that fallback explicitly
/// when it wants one.
fn count_by<T>(records: &[T], label_of: impl Fn(&T) -> &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let label = label_of(record).trim();
        if label.is_empty() {
            continue;
        }
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn compute_sales_stats(leads: &[SalesLead]) -> SalesStats {
    let converted = leads
        .iter()
        .filter(|lead| has_status(&lead.status, "converted"))
        .count();
    SalesStats {
        total: leads.len(),
        converted,
        conversion_rate: rate(converted, leads.len()),
        by_status: count_by(leads, |lead| &lead.status),
        by_source: count_by(leads, |lead| &lead.source),
    }
}

/// A ticket counts as resolved when its status says so OR when the
/// "is problem solved" column says yes, even if the status column disagrees.
fn ticket_resolved(ticket: &ItTicket) -> bool {
    has_status(&ticket.status, "resolved") || is_yes(&ticket.solved)
}

/// Resolution duration text for a ticket: the primary field, falling back to
/// the secondary when the primary is blank.
fn ticket_duration_text(ticket: &ItTicket) -> &str {
    let primary = ticket.time_to_resolve.trim();
    if primary.is_empty() {
        ticket.resolution_time.trim()
    } else {
        primary
    }
}

pub fn compute_it_stats(tickets: &[ItTicket]) -> ItStats {
    let resolved = tickets.iter().filter(|t| ticket_resolved(t)).count();
    let satisfied = tickets.iter().filter(|t| is_yes(&t.satisfied)).count();

    // Mean resolution time over tickets that are both resolved and carry a
    // duration; an empty subset averages to 0, shown as "0s".
    let durations: Vec<u64> = tickets
        .iter()
        .filter(|t| ticket_resolved(t) && !ticket_duration_text(t).is_empty())
        .map(|t| parse_duration(ticket_duration_text(t)))
        .collect();
    let avg_resolution_secs = if durations.is_empty() {
        0
    } else {
        durations.iter().sum::<u64>() / durations.len() as u64
    };

    ItStats {
        total: tickets.len(),
        resolved,
        pending: tickets.len() - resolved,
        completion_rate: rate(resolved, tickets.len()),
        satisfaction_rate: rate(satisfied, tickets.len()),
        avg_resolution_secs,
        avg_resolution: format_duration(avg_resolution_secs),
        by_status: count_by(tickets, |t| &t.status),
        by_technician: count_by(tickets, |t| &t.technician),
        by_category: count_by(tickets, |t| &t.category),
    }
}

pub fn compute_dpo_stats(tasks: &[DpoTask]) -> DpoStats {
    let resolved = tasks
        .iter()
        .filter(|task| has_status(&task.status, "resolved"))
        .count();
    let pending = tasks
        .iter()
        .filter(|task| has_status(&task.status, "pending"))
        .count();
    let overdue = tasks
        .iter()
        .filter(|task| has_status(&task.status, "overdue"))
        .count();
    DpoStats {
        total: tasks.len(),
        resolved,
        pending,
        overdue,
        completion_rate: rate(resolved, tasks.len()),
        item_count: tasks.iter().map(|task| task.items.len()).sum(),
        by_status: count_by(tasks, |task| &task.status),
    }
}

pub fn compute_payroll_stats(concerns: &[PayrollConcern]) -> PayrollStats {
    // A filled resolved-at date counts as resolved even when the status
    // column lags behind.
    let resolved = concerns
        .iter()
        .filter(|c| has_status(&c.status, "resolved") || !c.resolved_at.trim().is_empty())
        .count();
    let pending = concerns
        .iter()
        .filter(|c| has_status(&c.status, "pending"))
        .count();
    let overdue = concerns
        .iter()
        .filter(|c| has_status(&c.status, "overdue"))
        .count();
    PayrollStats {
        total: concerns.len(),
        resolved,
        pending,
        overdue,
        resolution_rate: rate(resolved, concerns.len()),
        by_status: count_by(concerns, |c| &c.status),
        by_concern_type: count_by(concerns, |c| &c.concern_type),
    }
}

pub fn compute_bonus_stats(profiles: &[EmployeeBonusProfile]) -> BonusStats {
    let total_monthly: i64 = profiles.iter().map(|p| p.monthly_bonus).sum();
    let total_quarterly: i64 = profiles.iter().map(|p| p.quarterly_bonus).sum();
    let avg_monthly = if profiles.is_empty() {
        0
    } else {
        total_monthly / profiles.len() as i64
    };
    BonusStats {
        total: profiles.len(),
        total_monthly,
        total_quarterly,
        avg_monthly,
        by_department: count_by(profiles, |p| &p.department),
    }
}

/// Restrict a batch to one ISO week. Records whose date does not parse are
/// excluded from week-filtered views. Bonus profiles carry no date column,
/// so that batch passes through unchanged.
pub fn filter_to_week(batch: &RecordBatch, year: i32, week: u32) -> RecordBatch {
    fn keep<T: Clone>(records: &[T], date_of: impl Fn(&T) -> &str, year: i32, week: u32) -> Vec<T> {
        records
            .iter()
            .filter(|record| {
                parse_sheet_date(date_of(record))
                    .map(|date| iso_week_year(date) == (week, year))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    match batch {
        RecordBatch::Sales(leads) => {
            RecordBatch::Sales(keep(leads, |lead| &lead.date, year, week))
        }
        RecordBatch::It(tickets) => {
            RecordBatch::It(keep(tickets, |ticket| &ticket.reported_at, year, week))
        }
        RecordBatch::Dpo(tasks) => {
            RecordBatch::Dpo(keep(tasks, |task| &task.due_date, year, week))
        }
        RecordBatch::Payroll(concerns) => {
            RecordBatch::Payroll(keep(concerns, |concern| &concern.date, year, week))
        }
        RecordBatch::Bonus(profiles) => RecordBatch::Bonus(profiles.clone()),
    }
}

/// Record counts per `(iso_year, iso_week)` plus the count of records whose
/// date column could not be parsed (kept visible, not dropped).
pub fn weekly_counts(batch: &RecordBatch) -> (BTreeMap<(i32, u32), usize>, usize) {
    fn tally<T>(records: &[T], date_of: impl Fn(&T) -> &str) -> (BTreeMap<(i32, u32), usize>, usize) {
        let buckets = bucket_by_week(records.iter(), |record| parse_sheet_date(date_of(record)));
        let weeks = buckets
            .weeks
            .into_iter()
            .map(|(key, bucket)| (key, bucket.len()))
            .collect();
        (weeks, buckets.undated.len())
    }

    match batch {
        RecordBatch::Sales(leads) => tally(leads, |lead| &lead.date),
        RecordBatch::It(tickets) => tally(tickets, |ticket| &ticket.reported_at),
        RecordBatch::Dpo(tasks) => tally(tasks, |task| &task.due_date),
        RecordBatch::Payroll(concerns) => tally(concerns, |concern| &concern.date),
        RecordBatch::Bonus(_) => (BTreeMap::new(), 0),
    }
}

pub fn compute_stats(batch: &RecordBatch) -> StatsSnapshot {
    match batch {
        RecordBatch::Sales(leads) => StatsSnapshot::Sales(compute_sales_stats(leads)),
        RecordBatch::It(tickets) => StatsSnapshot::It(compute_it_stats(tickets)),
        RecordBatch::Dpo(tasks) => StatsSnapshot::Dpo(compute_dpo_stats(tasks)),
        RecordBatch::Payroll(concerns) => StatsSnapshot::Payroll(compute_payroll_stats(concerns)),
        RecordBatch::Bonus(profiles) => StatsSnapshot::Bonus(compute_bonus_stats(profiles)),
    }
}
