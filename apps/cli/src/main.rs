//! Prefkit CLI - format conversational preference datasets for training
//!
//! The `prefkit` command reads JSONL dataset splits, renders every record
//! through the configured chat template for one of the four consumption
//! modes (sft, generation, rm, simpo), and writes the flattened splits plus
//! a run manifest to an output directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use prefkit_data::{ChatMlTokenizer, Task, TemplateSpec};
use prefkit_training::{
    find_last_checkpoint, prepare_split, read_jsonl_split, rename_preference_columns, write_json,
    write_jsonl_rows, PipelineConfig, PreparedSplit, RunId, RunManifest, TrainMetrics,
};

#[derive(Parser, Debug)]
#[command(
    name = "prefkit",
    author,
    version,
    about = "Prefkit - preference data preparation for alignment training"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Format dataset splits for a training run
    ///
    /// Reads raw conversation records (one JSON object per line), renders
    /// them for the selected task, applies the per-split row caps, and
    /// writes the formatted splits and a manifest under the output
    /// directory.
    Prepare {
        /// Training split (JSONL, one raw record per line)
        #[arg(long)]
        train: PathBuf,

        /// Evaluation split (JSONL)
        #[arg(long)]
        eval: Option<PathBuf>,

        /// Consumption mode: sft, generation, rm or simpo
        #[arg(long, default_value = "simpo")]
        task: String,

        /// Base model identifier; selects the chat template unless
        /// --template overrides it
        #[arg(long)]
        model: String,

        /// Template override: default or mistral
        #[arg(long)]
        template: Option<String>,

        /// Do not insert an empty leading system message
        #[arg(long)]
        no_insert_system: bool,

        /// Formatting worker threads (0 = one per core)
        #[arg(long, default_value_t = 12)]
        workers: usize,

        /// Keep only the first N training rows
        #[arg(long)]
        train_cap: Option<usize>,

        /// Keep only the first N evaluation rows
        #[arg(long)]
        eval_cap: Option<usize>,

        /// Where formatted splits and the manifest are written
        #[arg(long, default_value = "outputs/prepared")]
        out_dir: PathBuf,

        /// Beginning-of-sequence marker of the built-in template engine
        #[arg(long, default_value = "<s>")]
        bos: String,

        /// End-of-sequence marker of the built-in template engine
        #[arg(long, default_value = "<|im_end|>")]
        eos: String,
    },

    /// Show the checkpoint a run in the given output directory would resume from
    Checkpoint {
        /// Trainer output directory containing checkpoint-<step> dirs
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    match args.command {
        Command::Prepare {
            train,
            eval,
            task,
            model,
            template,
            no_insert_system,
            workers,
            train_cap,
            eval_cap,
            out_dir,
            bos,
            eos,
        } => {
            let task = Task::from_str(&task)?;
            let template = template.as_deref().map(TemplateSpec::from_str).transpose()?;
            let config = PipelineConfig {
                task,
                model_id: model,
                template,
                insert_system: !no_insert_system,
                workers,
                train_cap,
                eval_cap,
                output_dir: out_dir,
                resume_from: None,
                push_to_hub: false,
                dataset_tags: dataset_tags(&train),
                seed: 42,
            };
            run_prepare(&config, &train, eval.as_deref(), &bos, &eos)
        }
        Command::Checkpoint { output_dir } => {
            match find_last_checkpoint(&output_dir)? {
                Some(path) => println!("{}", path.display()),
                None => println!("no checkpoint found in {}", output_dir.display()),
            }
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let level = Level::from_str(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to initialize logging")?;
    Ok(())
}

fn dataset_tags(train: &Path) -> Vec<String> {
    train
        .file_stem()
        .map(|stem| vec![stem.to_string_lossy().into_owned()])
        .unwrap_or_default()
}

fn run_prepare(
    config: &PipelineConfig,
    train_path: &Path,
    eval_path: Option<&Path>,
    bos: &str,
    eos: &str,
) -> anyhow::Result<()> {
    let tokenizer = ChatMlTokenizer::with_markers(bos, eos);
    info!(
        task = %config.task,
        template = %config.template_spec(),
        "formatting comparisons with prompt template"
    );

    let train_split = read_jsonl_split(train_path, "train")?;
    info!("train split: {} rows", train_split.len());
    let train = prepare_split(&train_split, &tokenizer, config, config.train_cap)?;

    let eval = eval_path
        .map(|path| -> anyhow::Result<PreparedSplit> {
            let split = read_jsonl_split(path, "test")?;
            info!("eval split: {} rows", split.len());
            Ok(prepare_split(&split, &tokenizer, config, config.eval_cap)?)
        })
        .transpose()?;

    std::fs::create_dir_all(&config.output_dir)?;
    write_prepared(config, &train)?;
    if let Some(eval) = &eval {
        write_prepared(config, eval)?;
    }

    let manifest = RunManifest {
        run_id: RunId::new(),
        created_at: chrono::Utc::now(),
        model_id: config.model_id.clone(),
        task: config.task,
        template: config.template_spec(),
        train_split_id: train.id.clone(),
        eval_split_id: eval.as_ref().map(|e| e.id.clone()),
        train_rows: train.len() as u64,
        eval_rows: eval.as_ref().map_or(0, |e| e.len() as u64),
        metrics: TrainMetrics::default(),
    };
    write_json(&config.output_dir.join("run_manifest.json"), &manifest)?;
    info!("prepared splits written to {}", config.output_dir.display());
    Ok(())
}

fn write_prepared(config: &PipelineConfig, prepared: &PreparedSplit) -> anyhow::Result<()> {
    let path = config.output_dir.join(format!("{}.jsonl", prepared.name));
    if config.task == Task::Simpo {
        let rows = rename_preference_columns(prepared.rows.clone())?;
        write_jsonl_rows(&path, &rows)?;
    } else {
        write_jsonl_rows(&path, &prepared.rows)?;
    }
    info!("wrote {} rows to {}", prepared.len(), path.display());
    Ok(())
}
