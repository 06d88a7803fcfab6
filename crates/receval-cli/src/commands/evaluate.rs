//! Evaluate command: score a directory of model outputs against ground truth.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use receval_core::report::{self, DatasetReport, DatasetSummary, FieldStat, SampleReport};
use receval_core::{NormalizedRecord, Pipeline, ProcessedSample, RawRecord};

/// Arguments for the evaluate command.
#[derive(Args)]
pub struct EvaluateArgs {
    /// Directory of model output text files (one .txt per sample)
    #[arg(short, long)]
    predictions: PathBuf,

    /// Directory of ground truth JSON files (same stem, .json extension)
    #[arg(short, long)]
    ground_truth: PathBuf,

    /// Where to write the nested JSON report
    #[arg(long, default_value = "report.json")]
    report_json: PathBuf,

    /// Where to write the flat per-field CSV report
    #[arg(long, default_value = "report.csv")]
    report_csv: PathBuf,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Run cross-field consistency checks on each sample
    #[arg(long)]
    validate: bool,
}

/// One prediction file paired with its ground truth file.
struct SampleJob {
    sample_id: String,
    prediction: PathBuf,
    truth: PathBuf,
}

/// Everything worth reporting for one sample, stages included.
#[derive(Serialize)]
struct SampleOutput {
    sample_id: String,
    #[serde(flatten)]
    processed: ProcessedSample,
    truth: NormalizedRecord,
    metrics: SampleReport,
}

/// Nested JSON report: headline numbers first, then per-sample detail.
#[derive(Serialize)]
struct EvaluationOutput {
    summary: DatasetSummary,
    field_stats: Vec<FieldStat>,
    samples: Vec<SampleOutput>,
}

pub async fn run(args: EvaluateArgs, schema_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let schema = super::load_schema(schema_path)?;
    let pipeline = Arc::new(Pipeline::new(schema).with_validation(args.validate));

    let jobs = discover_samples(&args.predictions, &args.ground_truth)?;
    println!(
        "{} Found {} samples to evaluate",
        style("ℹ").blue(),
        jobs.len()
    );

    let progress = ProgressBar::new(jobs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples")
            .unwrap()
            .progress_chars("=>-"),
    );

    // Bounded worker pool: each permit admits one blocking scoring task.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let progress = progress.clone();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = tokio::task::spawn_blocking(move || score_sample(&pipeline, &job))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r);
            progress.inc(1);
            result
        });
    }

    let mut outputs = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outputs.push(joined??);
    }

    progress.finish_with_message("Complete");

    outputs.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));
    let dataset = report::build(outputs.iter().map(|o| o.metrics.clone()).collect());

    write_reports(&args, &dataset, outputs)?;
    print_summary(&dataset, start.elapsed());

    println!(
        "{} Reports written to {} and {}",
        style("✓").green(),
        args.report_json.display(),
        args.report_csv.display()
    );

    Ok(())
}

/// Pair prediction files with their ground truth files.
///
/// A prediction without ground truth is a setup problem, not a model miss,
/// so it aborts the run instead of scoring as zero.
fn discover_samples(predictions: &Path, ground_truth: &Path) -> anyhow::Result<Vec<SampleJob>> {
    let pattern = predictions.join("*.txt");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Prediction path is not valid UTF-8"))?;

    let mut jobs = Vec::new();
    let mut missing = Vec::new();

    for entry in glob::glob(pattern)? {
        let prediction = entry?;
        let sample_id = prediction
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sample")
            .to_string();

        let truth = ground_truth.join(format!("{sample_id}.json"));
        if truth.is_file() {
            jobs.push(SampleJob {
                sample_id,
                prediction,
                truth,
            });
        } else {
            missing.push(sample_id);
        }
    }

    if !missing.is_empty() {
        anyhow::bail!(
            "Missing ground truth for {} sample(s): {}",
            missing.len(),
            missing.join(", ")
        );
    }
    if jobs.is_empty() {
        anyhow::bail!(
            "No prediction files found in {}",
            predictions.display()
        );
    }

    jobs.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));
    Ok(jobs)
}

fn score_sample(pipeline: &Pipeline, job: &SampleJob) -> anyhow::Result<SampleOutput> {
    let raw_text = fs::read_to_string(&job.prediction)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", job.prediction.display(), e))?;
    let truth_raw = RawRecord::from_json_file(&job.truth)?;

    let processed = pipeline.process(&raw_text);
    let truth = pipeline.normalize_truth(&truth_raw);
    let metrics = pipeline.score_against(&job.sample_id, &processed, &truth);

    debug!(sample = %job.sample_id, status = %processed.status, "sample scored");

    Ok(SampleOutput {
        sample_id: job.sample_id.clone(),
        processed,
        truth,
        metrics,
    })
}

fn write_reports(
    args: &EvaluateArgs,
    dataset: &DatasetReport,
    samples: Vec<SampleOutput>,
) -> anyhow::Result<()> {
    let output = EvaluationOutput {
        summary: dataset.summary.clone(),
        field_stats: dataset.field_stats.clone(),
        samples,
    };
    fs::write(&args.report_json, serde_json::to_string_pretty(&output)?)?;

    let mut wtr = csv::Writer::from_path(&args.report_csv)?;
    for row in dataset.to_rows() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(())
}

fn print_summary(dataset: &DatasetReport, elapsed: std::time::Duration) {
    println!();
    println!(
        "{} Evaluated {} samples in {:?}",
        style("✓").green(),
        dataset.summary.samples,
        elapsed
    );
    println!(
        "   Mean F1: {}   Parse failures: {}",
        style(format!("{:.3}", dataset.summary.mean_f1)).cyan(),
        if dataset.summary.parse_failures > 0 {
            style(dataset.summary.parse_failures.to_string()).red()
        } else {
            style("0".to_string()).green()
        }
    );

    println!();
    println!(
        "   {:<24} {:>9} {:>9} {:>9}",
        style("Field").bold(),
        "Precision",
        "Recall",
        "F1"
    );
    for stat in &dataset.field_stats {
        println!(
            "   {:<24} {:>9.3} {:>9.3} {:>9.3}",
            stat.field, stat.mean_precision, stat.mean_recall, stat.mean_f1
        );
    }
}
