//! Terminal rendering for CLI results

use anyhow::Result;
use console::style;
use serde::Serialize;
use user_recon::aliases::AliasCandidate;
use user_recon::patterns::PatternReport;
use user_recon::pipeline::ReconReport;
use user_recon::presence::Presence;
use user_recon::reasoning::LightweightComparison;
use user_recon::similarity::SimilarityResult;
use user_recon::trainer::{LabelPrediction, TrainOutcome};

/// Result row for the `check` command
#[derive(Debug, Serialize)]
pub struct HygieneCheck {
    pub username: String,
    pub valid: bool,
    pub sanitized: String,
    pub warnings: Vec<&'static str>,
    pub sha256: String,
    pub rate_limited: bool,
}

/// Print `value` as pretty JSON, or hand it to the text renderer
pub fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

pub fn print_report(report: &ReconReport) {
    let analysis = &report.analysis;
    println!("\n{} {}", style("Recon:").bold(), style(&report.username).cyan());
    println!("  {}", style(report.timestamp.to_rfc3339()).dim());

    let found: Vec<&str> = analysis
        .social_presence
        .iter()
        .filter(|(_, r)| r.presence() == Presence::Found)
        .map(|(name, _)| name.as_str())
        .collect();
    let unknown = analysis
        .social_presence
        .values()
        .filter(|r| r.presence() == Presence::Unknown)
        .count();
    println!(
        "  Presence: {} found, {} unknown{}",
        style(found.len()).cyan(),
        style(unknown).dim(),
        if found.is_empty() {
            String::new()
        } else {
            format!(" ({})", found.join(", "))
        }
    );

    println!(
        "  Entropy: {:.3} (normalized {:.3}) {}",
        analysis.entropy.raw,
        analysis.entropy.normalized,
        style(&analysis.entropy.class).yellow()
    );
    println!("  Patterns: {}", style(&analysis.patterns.verdict).yellow());

    println!("\n{}", style("Predicted aliases").bold());
    print_aliases(&analysis.predicted_aliases);

    println!("\n{}", style("Anomaly reports").bold());
    for line in &analysis.anomaly_reports {
        println!("  - {line}");
    }
}

pub fn print_similarity(result: &SimilarityResult) {
    println!(
        "{} vs {}: {} {}",
        style(&result.identifier_a).cyan(),
        style(&result.identifier_b).cyan(),
        style(format!("{:.2}%", result.combined_score)).bold(),
        verdict_style(&result.verdict, result.combined_score)
    );
    println!(
        "  sequence={:.3} vector={:.3}",
        result.sequence_score, result.vector_score
    );
    println!("  {}", style(&result.reasoning).dim());
}

fn verdict_style(verdict: &str, score: f64) -> console::StyledObject<&str> {
    if score >= 80.0 {
        style(verdict).green()
    } else if score >= 60.0 {
        style(verdict).yellow()
    } else {
        style(verdict).red()
    }
}

pub fn print_aliases(aliases: &[AliasCandidate]) {
    for a in aliases {
        println!(
            "  {:<24} similarity={:>6.2} entropy_diff={:>5.3} likelihood={}",
            a.candidate,
            a.similarity,
            a.entropy_diff,
            style(format!("{:.2}", a.likelihood)).cyan()
        );
    }
}

pub fn print_patterns(report: &PatternReport) {
    println!(
        "{} entropy={:.2} verdict={}",
        style(&report.username).cyan(),
        report.entropy,
        style(&report.verdict).yellow()
    );
    for signal in &report.signals {
        println!("  - {signal}");
    }
}

pub fn print_comparison(c: &LightweightComparison) {
    println!(
        "{} vs {}: {}%",
        style(&c.username_1).cyan(),
        style(&c.username_2).cyan(),
        style(c.similarity_score).bold()
    );
    println!(
        "  entropy {:.3} / {:.3}",
        c.entropy_user1, c.entropy_user2
    );
    println!("  {}", c.reasoning);
}

pub fn print_outcome(outcome: &TrainOutcome) {
    println!(
        "{} Model {} at {}",
        style("[OK]").green(),
        outcome.status,
        style(outcome.model.display()).dim()
    );
}

pub fn print_score(first: &str, second: &str, score: f64) {
    println!(
        "{} vs {}: {}",
        style(first).cyan(),
        style(second).cyan(),
        style(format!("{score:.2}%")).bold()
    );
}

pub fn print_prediction(p: &LabelPrediction) {
    println!(
        "{}: {} ({:.2}% confidence)",
        style(&p.username).cyan(),
        style(&p.label).yellow(),
        p.confidence
    );
}

pub fn print_checks(checks: &[HygieneCheck]) {
    for c in checks {
        let status = if c.valid && !c.rate_limited {
            style("[OK]").green()
        } else {
            style("[!!]").red()
        };
        println!("{} {}", status, style(&c.username).cyan());
        if !c.valid {
            println!("  invalid username, sanitized: {}", c.sanitized);
        }
        if c.rate_limited {
            println!("  rate limited");
        }
        for w in &c.warnings {
            println!("  - {w}");
        }
        println!("  {}", style(&c.sha256).dim());
    }
}
