use tidemark_engine::{StatusReport, VersionState};

use crate::config::Settings;

pub async fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let engine = settings.connect().await?;
    let report = engine.get_migration_status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn state_marker(state: VersionState) -> &'static str {
    match state {
        VersionState::Applied => "✅",
        VersionState::Pending => "⏳",
        VersionState::Reverted => "⏪",
        VersionState::Corrupt => "⚠️",
    }
}

pub fn render_report(report: &StatusReport) -> String {
    let total = report.versions.len();
    let applied = report
        .versions
        .iter()
        .filter(|line| line.state == VersionState::Applied)
        .count();

    let mut out = format!(
        "Migrations: {total} total, {applied} applied, {} pending\n\n",
        report.pending.len()
    );

    for line in &report.versions {
        out.push_str(&format!(
            "  {} {} {}",
            state_marker(line.state),
            line.version,
            line.description
        ));
        if let Some(at) = line.executed_at {
            out.push_str(&format!("  [{}", at.format("%Y-%m-%d %H:%M:%S UTC")));
            if let Some(ms) = line.execution_ms {
                out.push_str(&format!(", {ms}ms"));
            }
            out.push(']');
        }
        out.push('\n');

        if let Some(message) = &line.error_message {
            if line.state == VersionState::Corrupt {
                out.push_str(&format!("      ledger row needs attention: {message}\n"));
            } else if line.success == Some(false) {
                out.push_str(&format!("      last attempt failed: {message}\n"));
            }
        }
    }

    if report.pending.is_empty() {
        out.push_str("\nDatabase is up to date.\n");
    } else {
        out.push_str("\nPending files:\n");
        for filename in &report.pending {
            out.push_str(&format!("  {filename}\n"));
        }
    }
    out
}
