//! CLI command definitions and handlers

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use user_recon::aliases::AliasPredictor;
use user_recon::config::ReconConfig;
use user_recon::patterns::PatternAnalyzer;
use user_recon::pipeline::run_recon;
use user_recon::presence::OfflineProbe;
use user_recon::reasoning;
use user_recon::security::{detect_suspicious_activity, hash_value, sanitize_input, validate_username};
use user_recon::similarity::SimilarityScorer;
use user_recon::trainer::ModelTrainer;

/// user-recon - identifier correlation analytics
///
/// Runs entirely offline. Platform presence is reported as unknown unless a
/// probe is wired in by a library caller.
#[derive(Parser, Debug)]
#[command(name = "user-recon")]
#[command(
    version,
    about = "Entropy, pattern, similarity, alias and outlier analysis for usernames",
    after_help = "\
Examples:
  user-recon analyze elhamjvdi -o report.json   Full report as JSON
  user-recon compare elhamjvdi elham87jvdi       Same-user likelihood
  user-recon aliases admin                       Predicted alias candidates
  user-recon train-similarity corpus.txt         Fit and persist a vector space"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Directory for trained models (overrides config)
    #[arg(long, global = true, env = "USER_RECON_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline for one username
    Analyze {
        username: String,

        /// Save the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Hybrid similarity between two usernames
    Compare { first: String, second: String },

    /// Predicted alias candidates with likelihood scores
    Aliases { username: String },

    /// Rule-based pattern signals and verdict
    Patterns { username: String },

    /// Lightweight sequence + entropy comparison with a narrative
    Explain { first: String, second: String },

    /// Fit a similarity vector space on a corpus (one username per line)
    TrainSimilarity { corpus: PathBuf },

    /// Similarity in the trained vector space
    Similarity { first: String, second: String },

    /// Train a label classifier on `username,label` lines
    TrainClassifier { data: PathBuf },

    /// Predict a label with the trained classifier
    PredictLabel { username: String },

    /// Validation, sanitization and suspicious-pattern checks
    Check {
        #[arg(required = true)]
        usernames: Vec<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = ReconConfig::load().context("Failed to load configuration")?;
    let json = cli.format == "json";
    let model_dir = cli.model_dir.clone().unwrap_or_else(|| config.model_dir());

    match cli.command {
        Commands::Analyze { username, output } => {
            let report = run_recon(&username, &OfflineProbe, &config)
                .with_context(|| format!("Recon failed for '{username}'"))?;
            if let Some(path) = output {
                let content = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Results saved to {}", path.display());
            }
            output::emit(json, &report, output::print_report)
        }

        Commands::Compare { first, second } => {
            let result = SimilarityScorer::new().compare(&first, &second, None, None);
            output::emit(json, &result, output::print_similarity)
        }

        Commands::Aliases { username } => {
            let aliases = AliasPredictor::new().predict_future_aliases(&username);
            output::emit(json, &aliases, |a| output::print_aliases(a))
        }

        Commands::Patterns { username } => {
            let report = PatternAnalyzer::new().analyze(&username);
            output::emit(json, &report, output::print_patterns)
        }

        Commands::Explain { first, second } => {
            let comparison = reasoning::compare_usernames(&first, &second);
            output::emit(json, &comparison, output::print_comparison)
        }

        Commands::TrainSimilarity { corpus } => {
            let usernames = read_lines(&corpus)?;
            let mut trainer = ModelTrainer::new(&model_dir);
            let outcome = trainer
                .train_similarity(&usernames)
                .context("Similarity training failed")?;
            output::emit(json, &outcome, output::print_outcome)
        }

        Commands::Similarity { first, second } => {
            let trainer = ModelTrainer::new(&model_dir);
            let score = trainer
                .compare_usernames(&first, &second)
                .context("Trained similarity failed")?;
            let value = serde_json::json!({ "username1": first, "username2": second, "similarity": score });
            output::emit(json, &value, |_| output::print_score(&first, &second, score))
        }

        Commands::TrainClassifier { data } => {
            let (usernames, labels) = read_labeled(&data)?;
            let mut trainer = ModelTrainer::new(&model_dir);
            let outcome = trainer
                .train_classifier(&usernames, &labels)
                .context("Classifier training failed")?;
            output::emit(json, &outcome, output::print_outcome)
        }

        Commands::PredictLabel { username } => {
            let trainer = ModelTrainer::new(&model_dir);
            let prediction = trainer
                .predict_label(&username)
                .context("Label prediction failed")?;
            output::emit(json, &prediction, output::print_prediction)
        }

        Commands::Check { usernames } => {
            let limiter = config.rate_limiter();
            let checks: Vec<output::HygieneCheck> = usernames
                .iter()
                .map(|u| output::HygieneCheck {
                    username: u.clone(),
                    valid: validate_username(u),
                    sanitized: sanitize_input(u),
                    warnings: detect_suspicious_activity(u),
                    sha256: hash_value(u),
                    rate_limited: !limiter.check(u),
                })
                .collect();
            output::emit(json, &checks, |c| output::print_checks(c))
        }
    }
}

/// Non-empty trimmed lines, `#` comments skipped
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

/// `username,label` lines
fn read_labeled(path: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let mut usernames = Vec::new();
    let mut labels = Vec::new();
    for (i, line) in read_lines(path)?.iter().enumerate() {
        let (username, label) = line
            .rsplit_once(',')
            .with_context(|| format!("{}:{}: expected 'username,label'", path.display(), i + 1))?;
        usernames.push(username.trim().to_string());
        labels.push(label.trim().to_string());
    }
    Ok((usernames, labels))
}
