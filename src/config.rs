//! Source URL configuration. Each dashboard's published-CSV URL comes from
//! an environment variable, with a CLI override for ad-hoc runs. Nothing
//! else is environment-driven.

use anyhow::Context;

use crate::models::Dashboard;

pub fn sheet_env_var(dashboard: Dashboard) -> &'static str {
    match dashboard {
        Dashboard::Sales => "SHEET_URL_SALES",
        Dashboard::It => "SHEET_URL_IT",
        Dashboard::Dpo => "SHEET_URL_DPO",
        Dashboard::Payroll => "SHEET_URL_PAYROLL",
        Dashboard::Bonus => "SHEET_URL_BONUS",
    }
}

/// Resolve the CSV source URL for `dashboard`: the `--url` override when
/// given, otherwise the dashboard's environment variable.
pub fn source_url(dashboard: Dashboard, override_url: Option<&str>) -> anyhow::Result<String> {
    if let Some(url) = override_url {
        return Ok(url.to_string());
    }
    let var = sheet_env_var(dashboard);
    std::env::var(var)
        .with_context(|| format!("{var} must be set to the {} sheet's published CSV URL (or pass --url)", dashboard.label()))
}

/// Endpoint for asset request submissions.
pub fn submit_url(override_url: Option<&str>) -> anyhow::Result<String> {
    if let Some(url) = override_url {
        return Ok(url.to_string());
    }
    std::env::var("ASSET_REQUEST_URL")
        .context("ASSET_REQUEST_URL must be set to the submission endpoint (or pass --url)")
}
