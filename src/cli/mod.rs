//! Command-line interface for training, scoring, and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifacts::ArtifactStore;
use crate::data::load_student_table;
use crate::evaluation::ComparisonRow;
use crate::model::EstimatorKind;
use crate::pipeline::{score_batch, PipelineConfig, TrainingPipeline};
use crate::server::{run_server, ServerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: &str) {
    println!("  {} {}", muted(key), val.white());
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "retention")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Student withdrawal prediction: train, evaluate, score, serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train and compare models on a student table
    Train {
        /// Student info CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Optional per-student interaction aggregates CSV
        #[arg(short, long)]
        interactions: Option<PathBuf>,

        /// Artifact output directory
        #[arg(short, long, default_value = "./artifacts")]
        artifacts: PathBuf,

        /// Models to train (logistic, naive_bayes, random_forest)
        #[arg(short, long, value_delimiter = ',', default_values_t = [
            "logistic".to_string(),
            "naive_bayes".to_string(),
            "random_forest".to_string(),
        ])]
        models: Vec<String>,

        /// Number of cross-validation folds (0 disables CV)
        #[arg(long, default_value = "0")]
        cv_folds: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Render diagnostic SVG plots
        #[arg(long)]
        plots: bool,
    },

    /// Score a student table with a trained model
    Predict {
        /// Model name in the artifact store
        #[arg(short, long)]
        model: String,

        /// Student info CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Optional per-student interaction aggregates CSV
        #[arg(short, long)]
        interactions: Option<PathBuf>,

        /// Artifact directory
        #[arg(short, long, default_value = "./artifacts")]
        artifacts: PathBuf,

        /// Output predictions CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a data file's shape and columns
    Info {
        /// Student info CSV
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Start the prediction API server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Artifact directory
        #[arg(short, long, default_value = "./artifacts")]
        artifacts: PathBuf,

        /// Model name to serve
        #[arg(short, long, default_value = "logistic_regression")]
        model: String,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    data: &Path,
    interactions: Option<&Path>,
    artifacts: &Path,
    models: &[String],
    cv_folds: usize,
    seed: u64,
    plots: bool,
) -> anyhow::Result<()> {
    section("Train");

    let kinds = models
        .iter()
        .map(|m| m.parse::<EstimatorKind>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut config = PipelineConfig::new(data, artifacts);
    config.interaction_data = interactions.map(Path::to_path_buf);
    config.models = kinds;
    config.seed = seed;
    config.cv_folds = (cv_folds > 0).then_some(cv_folds);
    config.render_plots = plots;

    step_run("Running training pipeline");
    let start = Instant::now();
    let outcome = TrainingPipeline::new(config).run()?;
    step_done(&format!(
        "{} rows × {} features in {:?}",
        outcome.n_rows,
        outcome.n_features,
        start.elapsed()
    ));

    print_comparison(&outcome.comparison);

    if let Some(best) = &outcome.best_model {
        println!();
        println!("  {} best model: {}", ok("✓"), best.cyan());
    }
    kv("run id", &outcome.run_id);
    kv("artifacts", &artifacts.display().to_string());
    Ok(())
}

pub fn cmd_predict(
    model: &str,
    data: &Path,
    interactions: Option<&Path>,
    artifacts: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    let store = ArtifactStore::new(artifacts);

    step_run(&format!("Scoring with {}", model.cyan()));
    let start = Instant::now();
    let scored = score_batch(&store, model, data, interactions)?;
    step_done(&format!("{} rows in {:?}", scored.probabilities.len(), start.elapsed()));

    let flagged = scored.labels.iter().filter(|&&l| l == 1).count();
    kv(
        "flagged as at-risk",
        &format!("{} / {}", flagged, scored.labels.len()),
    );

    if let Some(path) = output {
        let mut csv = String::from("id_student,withdrawal_probability,withdrawal_predicted\n");
        for i in 0..scored.probabilities.len() {
            let id = scored.student_ids[i]
                .map(|v| v.to_string())
                .unwrap_or_default();
            csv.push_str(&format!(
                "{},{:.6},{}\n",
                id, scored.probabilities[i], scored.labels[i]
            ));
        }
        std::fs::write(path, csv)?;
        println!("  {} predictions written to {}", ok("✓"), path.display());
    }
    Ok(())
}

pub fn cmd_info(data: &Path) -> anyhow::Result<()> {
    section("Info");

    let df = load_student_table(data)?;
    kv("file", &data.display().to_string());
    kv("rows", &df.height().to_string());
    kv("columns", &df.width().to_string());

    println!();
    for (name, dtype) in df.get_column_names().iter().zip(df.dtypes()) {
        println!("    {} {}", name.to_string().white(), dim(&dtype.to_string()));
    }
    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, artifacts: &Path, model: &str) -> anyhow::Result<()> {
    section("Serve");
    kv("model", model);
    kv("address", &format!("{}:{}", host, port));

    let config = ServerConfig {
        host: host.to_string(),
        port,
        artifact_dir: artifacts.to_path_buf(),
        model_name: model.to_string(),
    };
    run_server(config).await?;
    Ok(())
}

fn print_comparison(rows: &[ComparisonRow]) {
    section("Model comparison");
    println!(
        "  {:<22} {:>9} {:>10} {:>8} {:>8} {:>8}",
        muted("model"),
        muted("accuracy"),
        muted("precision"),
        muted("recall"),
        muted("f1"),
        muted("auc")
    );
    for row in rows {
        println!(
            "  {:<22} {:>9.3} {:>10.3} {:>8.3} {:>8.3} {:>8.3}",
            row.model.white(),
            row.accuracy,
            row.precision,
            row.recall,
            row.f1_score,
            row.roc_auc
        );
    }
}
