//! Result files: machine-readable JSON and a static HTML report

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::E2eResult;
use crate::runner::{ScenarioResult, SuiteResult};
use crate::step::{StepKind, StepRecord, StepStatus};

pub const RESULTS_FILE: &str = "test-results.json";
pub const REPORT_FILE: &str = "index.html";

/// Write `results` as pretty JSON into `dir`
pub fn write_json(results: &SuiteResult, dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Write the HTML report into `dir`
pub fn write_html(results: &SuiteResult, dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(REPORT_FILE);
    std::fs::write(&path, render_html(results))?;
    Ok(path)
}

pub fn render_html(results: &SuiteResult) -> String {
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>POS acceptance report</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; margin-bottom: 2rem; }}
td, th {{ border: 1px solid #ccc; padding: 4px 8px; text-align: left; }}
.passed {{ color: #1a7f37; }}
.failed {{ color: #cf222e; }}
.skipped {{ color: #9a6700; }}
</style>
</head>
<body>
<h1>POS acceptance report</h1>
<p>{started} &middot; {passed} passed, {failed} failed &middot; {duration} ms</p>
"#,
        started = escape(&results.started_at.to_rfc3339()),
        passed = results.passed,
        failed = results.failed,
        duration = results.duration_ms,
    );

    for result in &results.results {
        render_scenario(&mut html, result);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_scenario(html: &mut String, result: &ScenarioResult) {
    let (class, verdict) = if result.success { ("passed", "PASS") } else { ("failed", "FAIL") };

    let _ = writeln!(
        html,
        r#"<h2 class="{class}">{verdict} {name} #{instance} ({duration} ms)</h2>"#,
        name = escape(&result.name),
        instance = result.instance,
        duration = result.duration_ms,
    );
    if let Some(error) = &result.error {
        let _ = writeln!(html, r#"<p class="failed">{}</p>"#, escape(error));
    }

    html.push_str("<table>\n<tr><th>Stage</th><th>Step</th><th>Kind</th><th>Status</th><th>ms</th></tr>\n");
    for step in &result.steps {
        render_step(html, step);
    }
    html.push_str("</table>\n");

    let artifacts = [
        ("screenshot", result.artifacts.screenshot.as_ref()),
        ("video", result.artifacts.video.as_ref()),
    ];
    for (label, path) in artifacts {
        if let Some(path) = path {
            let path = path.to_string_lossy();
            let _ = writeln!(
                html,
                r#"<p>{label}: <a href="file://{href}">{text}</a></p>"#,
                href = escape(&path),
                text = escape(&path),
            );
        }
    }
}

fn render_step(html: &mut String, step: &StepRecord) {
    let (class, status) = match &step.status {
        StepStatus::Completed => ("passed", "completed".to_string()),
        StepStatus::NotApplicable { reason } => ("skipped", format!("not applicable: {}", reason)),
        StepStatus::Failed { error, .. } => ("failed", format!("failed: {}", error)),
    };
    let kind = match step.kind {
        StepKind::Mandatory => "checkpoint",
        StepKind::BestEffort => "best effort",
    };

    let _ = writeln!(
        html,
        r#"<tr><td>{stage}</td><td>{name}</td><td>{kind}</td><td class="{class}">{status}</td><td>{ms}</td></tr>"#,
        stage = step.checkpoint.label(),
        name = escape(&step.name),
        status = escape(&status),
        ms = step.duration_ms,
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
