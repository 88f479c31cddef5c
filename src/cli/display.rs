//! Terminal rendering for pipeline results

use colored::Colorize;
use std::fmt::Write;

use crate::types::PipelineResult;

/// Default `tracing` filter for the binary at the given crate log level
pub fn default_filter(level: &str) -> String {
    format!("itemrag={}", level)
}

/// Render a result for humans: answer, cited sources, counts and optionally timings
pub fn render_result(result: &PipelineResult, show_timings: bool) -> String {
    let mut out = String::new();

    let status = if result.cancelled {
        "✗ Cancelled".yellow()
    } else if result.success {
        "✓ Answered".green()
    } else {
        "✗ Fallback answer".red()
    };
    let _ = writeln!(out, "{} {}", status, format!("({:.2}s)", result.total_time).dimmed());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", result.answer);

    if !result.sources.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Sources:".bold().cyan());
        for source in &result.sources {
            let marker = source.marker.as_deref().unwrap_or("-");
            let _ = write!(
                out,
                "  {:<5} {} {}",
                marker.green(),
                source.title(),
                format!("[{:.3}]", source.final_score).dimmed()
            );
            if let Some(url) = &source.hit.url {
                let _ = write!(out, " {}", url.dimmed());
            }
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        format!(
            "semantic {} · keyword {} · cited {} · ~{} context tokens",
            result.hits_sem, result.hits_kw, result.hits_final, result.token_estimate
        )
        .dimmed()
    );

    if result.is_degraded() {
        let stages: Vec<String> = result.degraded.iter().map(|s| s.to_string()).collect();
        let _ = writeln!(out, "{} {}", "Degraded:".yellow(), stages.join(", "));
    }

    if show_timings {
        let t = &result.timings;
        let _ = writeln!(out, "{}", "Timings:".bold());
        for (name, secs) in [
            ("optimize", t.optimize),
            ("retrieve", t.retrieve),
            ("fuse", t.fuse),
            ("assemble", t.assemble),
            ("answer", t.answer),
        ] {
            let _ = writeln!(out, "  {:<9} {:>8.1}ms", name, secs * 1000.0);
        }
        let _ = writeln!(out, "  {}", format!("run {} · itemrag {}", result.run_id, crate::VERSION).dimmed());
    }

    out
}
