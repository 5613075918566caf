use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{RecordBatch, StatsSnapshot};
use crate::stats::{compute_stats, weekly_counts};

/// Render one dashboard's markdown report from a fetched batch.
pub fn build_report(batch: &RecordBatch) -> String {
    let snapshot = compute_stats(batch);
    let (weeks, undated) = weekly_counts(batch);

    let mut output = String::new();
    let _ = writeln!(
        output,
        "# {} Dashboard Report",
        title_case(batch.dashboard().label())
    );
    let _ = writeln!(output, "Built from {} records.", batch.len());

    match &snapshot {
        StatsSnapshot::Sales(stats) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Pipeline");
            let _ = writeln!(
                output,
                "- {} leads, {} converted ({}% conversion)",
                stats.total, stats.converted, stats.conversion_rate
            );
            write_group(&mut output, "Leads by Status", &stats.by_status);
            write_group(&mut output, "Leads by Source", &stats.by_source);
        }
        StatsSnapshot::It(stats) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Resolution");
            let _ = writeln!(
                output,
                "- {} tickets, {} resolved ({}% completion, {}% satisfaction)",
                stats.total, stats.resolved, stats.completion_rate, stats.satisfaction_rate
            );
            let _ = writeln!(output, "- average resolution time {}", stats.avg_resolution);
            write_group(&mut output, "Tickets by Status", &stats.by_status);
            write_group(&mut output, "Tickets by Technician", &stats.by_technician);
            write_group(&mut output, "Tickets by Category", &stats.by_category);
        }
        StatsSnapshot::Dpo(stats) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Task Groups");
            let _ = writeln!(
                output,
                "- {} lead groups ({} sub-items), {} resolved / {} pending / {} overdue",
                stats.total, stats.item_count, stats.resolved, stats.pending, stats.overdue
            );
            let _ = writeln!(output, "- completion rate {}%", stats.completion_rate);
            write_group(&mut output, "Groups by Status", &stats.by_status);
        }
        StatsSnapshot::Payroll(stats) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Concerns");
            let _ = writeln!(
                output,
                "- {} concerns, {} resolved ({}% resolution), {} pending, {} overdue",
                stats.total, stats.resolved, stats.resolution_rate, stats.pending, stats.overdue
            );
            write_group(&mut output, "Concerns by Status", &stats.by_status);
            write_group(&mut output, "Concerns by Type", &stats.by_concern_type);
        }
        StatsSnapshot::Bonus(stats) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "## Bonuses");
            let _ = writeln!(
                output,
                "- {} profiles, {} monthly total ({} average), {} quarterly total",
                stats.total, stats.total_monthly, stats.avg_monthly, stats.total_quarterly
            );
            write_group(&mut output, "Profiles by Department", &stats.by_department);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Activity");
    if weeks.is_empty() && undated == 0 {
        let _ = writeln!(output, "No dated records in this batch.");
    } else {
        for ((year, week), count) in &weeks {
            let _ = writeln!(output, "- {year} W{week:02}: {count} records");
        }
        if undated > 0 {
            let _ = writeln!(output, "- Undated: {undated} records");
        }
    }

    output
}

/// Group-by section, largest categories first, ties broken by label.
fn write_group(output: &mut String, title: &str, counts: &BTreeMap<String, usize>) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if counts.is_empty() {
        let _ = writeln!(output, "No categorized records.");
        return;
    }
    let mut ordered: Vec<(&String, &usize)> = counts.iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, count) in ordered.iter().take(10) {
        let _ = writeln!(output, "- {label}: {count}");
    }
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
