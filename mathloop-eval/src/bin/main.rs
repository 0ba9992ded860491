//! CLI for the math reasoning evaluation pipeline.
//!
//! Prepare reproducible GSM8K subsets and evaluate a reasoning backend
//! against them.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mathloop_core::{AdapterRef, CompletionClient, GenerationConfig, PipelineConfig, ReasoningEngine};
use mathloop_eval::{
    prepare_subset, save_problems, EvalProgress, Evaluator, Gsm8k, Gsm8kSplit, Metrics,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Math word-problem evaluation pipeline.
#[derive(Parser, Debug)]
#[command(name = "mathloop")]
#[command(about = "Prepare GSM8K subsets and evaluate a reasoning backend")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download GSM8K and write a reproducible random subset as JSON.
    Prepare {
        /// Which GSM8K split to sample from
        #[arg(long, default_value = "train")]
        split: Gsm8kSplit,

        /// Number of problems to sample (default: NUM_TRAIN_SAMPLES)
        #[arg(long, short = 'n')]
        samples: Option<usize>,

        /// Random seed for subset selection
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output file (default: <DATA_DIR>/raw/gsm8k_subset.json)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Evaluate a reasoning backend against a prepared problem file.
    Eval {
        /// Problem file (default: <DATA_DIR>/raw/gsm8k_subset.json)
        #[arg(long, short = 'd')]
        data: Option<PathBuf>,

        /// Output directory (default: <OUTPUT_DIR>/metrics/<split-name>)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Name recorded in metrics for this run
        #[arg(long, default_value = "eval")]
        split_name: String,

        /// LoRA adapter directory (omit to evaluate the base model)
        #[arg(long)]
        adapter: Option<PathBuf>,

        /// Evaluate only the first N problems
        #[arg(long, short = 's')]
        sample: Option<usize>,

        /// Sampling temperature
        #[arg(long, default_value_t = 0.7)]
        temperature: f32,

        /// Nucleus sampling threshold
        #[arg(long, default_value_t = 0.9)]
        top_p: f32,

        /// Generation budget per problem
        #[arg(long, default_value = "512")]
        max_new_tokens: u32,

        /// Request timeout in seconds
        #[arg(long, default_value = "120")]
        timeout: u64,

        /// API key for the inference endpoint (optional for local servers)
        #[arg(long, env = "API_KEY")]
        api_key: Option<String>,
    },

    /// Print the resolved pipeline configuration as JSON.
    ShowConfig,
}

impl Command {
    fn validate(&self) -> Result<(), String> {
        if let Command::Eval {
            temperature, top_p, ..
        } = self
        {
            if !(0.0..=2.0).contains(temperature) {
                return Err(format!(
                    "temperature ({}) must be between 0.0 and 2.0",
                    temperature
                ));
            }
            if !(0.0..=1.0).contains(top_p) {
                return Err(format!("top-p ({}) must be between 0.0 and 1.0", top_p));
            }
        }
        Ok(())
    }
}

async fn run_prepare(
    cfg: &PipelineConfig,
    split: Gsm8kSplit,
    samples: Option<usize>,
    seed: u64,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let n = samples.unwrap_or(cfg.num_train_samples);
    let out = out.unwrap_or_else(|| cfg.raw_data_dir().join("gsm8k_subset.json"));

    cfg.ensure_dirs()
        .map_err(|e| format!("Failed to create directory layout: {}", e))?;

    let loader = Gsm8k::new(split).map_err(|e| e.to_string())?;
    let problems = loader.load().await.map_err(|e| e.to_string())?;
    let subset = prepare_subset(&problems, n, seed);

    save_problems(&out, &subset)
        .await
        .map_err(|e| e.to_string())?;

    eprintln!(
        "Wrote {} problems (seed {}) to {}",
        subset.len(),
        seed,
        out.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_eval(
    cfg: &PipelineConfig,
    data: Option<PathBuf>,
    out: Option<PathBuf>,
    split_name: &str,
    adapter: Option<PathBuf>,
    sample: Option<usize>,
    generation: GenerationConfig,
    max_new_tokens: u32,
) -> Result<Metrics, String> {
    let data = data.unwrap_or_else(|| cfg.raw_data_dir().join("gsm8k_subset.json"));
    let out = out.unwrap_or_else(|| cfg.metrics_dir().join(split_name));

    // The served model id: the adapter directory name, or the base model.
    let adapter_ref = adapter
        .map(AdapterRef::from_path)
        .transpose()
        .map_err(|e| e.to_string())?;
    let model = adapter_ref
        .as_ref()
        .map(|a| a.model_id().to_string())
        .unwrap_or_else(|| cfg.base_model.clone());

    let client = CompletionClient::connect(&cfg.api_base, cfg.api_key.as_deref(), &model, generation)
        .await
        .map_err(|e| e.to_string())?;
    let engine =
        ReasoningEngine::new(client, adapter_ref).with_max_prompt_chars(cfg.max_prompt_chars);

    let mut evaluator = Evaluator::new(engine).with_max_new_tokens(max_new_tokens);
    if let Some(n) = sample {
        evaluator = evaluator.with_sample_limit(n);
    }

    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let metrics = evaluator
        .evaluate_with_progress(&data, &out, split_name, |progress| match progress {
            EvalProgress::Started { total } => {
                progress_bar.set_length(total as u64);
                progress_bar.set_message("Evaluating...");
            }
            EvalProgress::ProblemCompleted { completed, .. } => {
                progress_bar.set_position(completed as u64);
            }
            _ => {} // Handle future variants gracefully
        })
        .await
        .map_err(|e| format!("Evaluation failed: {}", e))?;

    progress_bar.finish_with_message("Complete");
    Ok(metrics)
}

fn print_metrics(metrics: &Metrics) {
    println!();
    println!("=== Evaluation Summary ===");
    println!("Split: {}", metrics.split);
    println!("Adapter: {}", metrics.adapter);
    println!("Correct: {}/{}", metrics.correct, metrics.total);
    println!("Accuracy: {:.2}%", metrics.accuracy);
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if let Err(e) = args.command.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let cfg = match PipelineConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Prepare {
            split,
            samples,
            seed,
            out,
        } => run_prepare(&cfg, split, samples, seed, out).await,

        Command::Eval {
            data,
            out,
            split_name,
            adapter,
            sample,
            temperature,
            top_p,
            max_new_tokens,
            timeout,
            api_key,
        } => {
            let mut cfg = cfg;
            if api_key.is_some() {
                cfg.api_key = api_key;
            }
            let generation = GenerationConfig::default()
                .with_temperature(temperature)
                .with_top_p(top_p)
                .with_max_new_tokens(max_new_tokens)
                .with_timeout(Duration::from_secs(timeout));

            run_eval(
                &cfg,
                data,
                out,
                &split_name,
                adapter,
                sample,
                generation,
                max_new_tokens,
            )
            .await
            .map(|metrics| print_metrics(&metrics))
        }

        Command::ShowConfig => serde_json::to_string_pretty(&cfg)
            .map(|json| println!("{}", json))
            .map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
