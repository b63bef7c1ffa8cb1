use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use draftline::llm::GenerationRequest;
use draftline::{
    classify_materials, match_style, topic_keywords, AnthropicClient, AnthropicConfig,
    BackendError, BackendErrorKind, Catalog, ConfirmationPayload, JsonDirStore, Orchestrator,
    PipelineConfig, Stage, StageOutput, StageParams, StageReport, StyleProfile, Task, TaskStatus,
    TextBackend,
};

#[derive(Parser)]
#[command(name = "draftline")]
#[command(author, version, about = "Resumable nine-stage content pipeline with author checkpoints", long_about = None)]
struct Cli {
    /// Directory holding tasks and the channel catalog
    #[arg(long, global = true, default_value = "draftline-data")]
    data_dir: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task from a brief and run stage 1
    Create {
        /// Channel the article is written for
        #[arg(short, long)]
        channel: String,

        /// The brief text
        #[arg(short, long, conflicts_with = "brief_file")]
        brief: Option<String>,

        /// Read the brief from a file
        #[arg(long)]
        brief_file: Option<PathBuf>,
    },

    /// Execute stages until the next checkpoint or completion
    Run {
        #[arg(short, long)]
        task: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Execute exactly one stage
    Step {
        #[arg(short, long)]
        task: String,

        /// Stage number (1-9); must be the task's current step
        #[arg(short, long, value_parser = parse_stage)]
        stage: Stage,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Confirm the checkpoint the task is waiting at
    Confirm {
        #[arg(short, long)]
        task: String,

        /// Chosen topic (topic selection checkpoint)
        #[arg(long)]
        topic: Option<String>,

        /// Reviewed research summary (research checkpoint)
        #[arg(long)]
        research_summary: Option<String>,

        /// Real cases, views and data (material readiness checkpoint)
        #[arg(long)]
        materials: Option<String>,

        /// Edited style profile as JSON (style checkpoint)
        #[arg(long)]
        style_file: Option<PathBuf>,

        /// Free-text note stored with the confirmation
        #[arg(long)]
        note: Option<String>,
    },

    /// Abort a task, keeping its outputs
    Abort {
        #[arg(short, long)]
        task: String,
    },

    /// Print a task
    Show {
        #[arg(short, long)]
        task: String,

        /// Print the full stored JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks, newest first
    List {
        #[arg(short, long)]
        channel: Option<String>,

        /// draft, processing, awaiting_confirmation, completed or aborted
        #[arg(short, long)]
        status: Option<TaskStatus>,
    },

    /// Classify a channel's material items without touching any task
    Classify {
        #[arg(short, long)]
        channel: String,
    },

    /// Rank a channel's style exemplars for a topic
    MatchStyle {
        #[arg(short, long)]
        channel: String,

        #[arg(short, long)]
        topic: String,

        /// Extra keyword (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
    },
}

/// Per-execution overrides for stage inputs
#[derive(Args)]
struct ParamArgs {
    /// Use this topic instead of the confirmed one
    #[arg(long)]
    topic: Option<String>,

    /// Use these materials instead of the confirmed ones
    #[arg(long)]
    materials: Option<String>,

    /// Extra style keyword (repeatable)
    #[arg(long = "keyword")]
    keywords: Vec<String>,
}

impl From<ParamArgs> for StageParams {
    fn from(args: ParamArgs) -> Self {
        StageParams {
            selected_topic: args.topic,
            materials: args.materials,
            keywords: args.keywords,
        }
    }
}

fn parse_stage(s: &str) -> std::result::Result<Stage, String> {
    let number: u8 = s.parse().map_err(|_| format!("not a stage number: {}", s))?;
    Stage::from_number(number).ok_or_else(|| format!("stage must be 1-9, got {}", number))
}

/// Stand-in used when no API key is configured
///
/// Commands that never reach the model still work; the rest fail with the
/// configuration error.
struct UnconfiguredBackend {
    reason: String,
}

#[async_trait]
impl TextBackend for UnconfiguredBackend {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> std::result::Result<String, BackendError> {
        Err(BackendError::new(BackendErrorKind::Auth, self.reason.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = PipelineConfig::load(cli.config.as_deref())?;
    let store = Arc::new(
        JsonDirStore::open(&cli.data_dir)
            .await
            .with_context(|| format!("Failed to open data directory {}", cli.data_dir.display()))?,
    );

    match cli.command {
        Commands::Classify { channel } => return classify(store.as_ref(), &channel, &config).await,
        Commands::MatchStyle {
            channel,
            topic,
            keywords,
        } => return rank_styles(store.as_ref(), &channel, &topic, &keywords, &config).await,
        _ => {}
    }

    let backend: Arc<dyn TextBackend> = match AnthropicConfig::from_env() {
        Ok(api_config) => {
            info!("Using model {}", api_config.model);
            Arc::new(AnthropicClient::new(api_config))
        }
        Err(e) => Arc::new(UnconfiguredBackend {
            reason: e.to_string(),
        }),
    };
    let orchestrator = Orchestrator::new(
        store.clone(),
        store.clone(),
        backend,
        config.engine_settings()?,
    );

    match cli.command {
        Commands::Create {
            channel,
            brief,
            brief_file,
        } => {
            let brief = read_brief(brief, brief_file.as_deref())?;
            let created = orchestrator.create_task(&channel, &brief).await?;
            println!("Created task {}", created.task_id);
            match created.stage_one {
                Ok(report) => print_report(&report),
                Err(e) => {
                    warn!("Stage 1 failed: {}", e);
                    println!("Stage 1 failed; retry with `draftline run --task {}`", created.task_id);
                }
            }
        }
        Commands::Run { task, params } => {
            let params: StageParams = params.into();
            loop {
                let report = orchestrator.execute_next(&task, params.clone()).await?;
                print_report(&report);
                if report.next_stage.is_none() {
                    break;
                }
            }
        }
        Commands::Step {
            task,
            stage,
            params,
        } => {
            let report = orchestrator.execute_stage(&task, stage, params.into()).await?;
            print_report(&report);
        }
        Commands::Confirm {
            task,
            topic,
            research_summary,
            materials,
            style_file,
            note,
        } => {
            let style_profile = style_file
                .as_deref()
                .map(read_style_profile)
                .transpose()?;
            let payload = ConfirmationPayload {
                selected_topic: topic,
                research_summary,
                style_profile,
                materials,
                note,
            };
            let task = orchestrator.confirm(&task, payload).await?;
            println!(
                "Confirmed. Task {} is now {} at stage {} ({})",
                task.id,
                task.status,
                task.current_step.number(),
                task.current_step.name()
            );
        }
        Commands::Abort { task } => {
            let task = orchestrator.abort(&task).await?;
            println!("Task {} aborted at stage {}", task.id, task.current_step.number());
        }
        Commands::Show { task, json } => {
            let task = orchestrator.get_task(&task).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                print_task(&task);
            }
        }
        Commands::List { channel, status } => {
            let tasks = orchestrator.list_tasks(channel.as_deref(), status).await?;
            if tasks.is_empty() {
                println!("No tasks");
            }
            for t in tasks {
                println!(
                    "{}  {:<22} stage {}  {:<14} {}",
                    t.id,
                    t.status.to_string(),
                    t.current_step.number(),
                    t.channel_id,
                    t.title.as_deref().unwrap_or("(untitled)")
                );
            }
        }
        Commands::Classify { .. } | Commands::MatchStyle { .. } => {}
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn read_brief(brief: Option<String>, brief_file: Option<&Path>) -> Result<String> {
    match (brief, brief_file) {
        (Some(brief), _) => Ok(brief),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read brief from {}", path.display())),
        (None, None) => bail!("either --brief or --brief-file is required"),
    }
}

fn read_style_profile(path: &Path) -> Result<StyleProfile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read style profile {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse style profile {}", path.display()))
}

fn print_report(report: &StageReport) {
    println!();
    println!(
        "Stage {}: {} ({})",
        report.stage.number(),
        report.stage.name(),
        report.status
    );
    println!("{}", "-".repeat(40));
    match &report.output {
        StageOutput::StyleAndMaterials(o) => {
            match &o.style.recommended_id {
                Some(id) => println!("Recommended exemplar: {}", id),
                None => println!("No exemplar recommended"),
            }
            println!(
                "Materials: {} long-form, {} fragments ({} dropped)",
                o.materials.long_form.len(),
                o.materials.fragments.len(),
                o.materials.report.total_dropped()
            );
        }
        output => println!("{}", output.text()),
    }
    if report.is_checkpoint {
        println!();
        println!("Waiting for confirmation: draftline confirm --task {}", report.task_id);
    }
}

fn print_task(task: &Task) {
    println!("Task {}", task.id);
    println!("==================");
    println!("Channel: {}", task.channel_id);
    println!("Title: {}", task.title.as_deref().unwrap_or("(untitled)"));
    println!("Status: {}", task.status);
    println!("Stage: {} ({})", task.current_step.number(), task.current_step.name());
    println!("Brief: {}", task.brief_data.brief);
    if let Some(summary) = &task.research_summary {
        println!("Research summary: {}", summary);
    }
    println!();

    println!("Stages");
    println!("------");
    for (stage, record) in &task.brief_data.stages {
        let confirmed = if record.confirmed_at.is_some() {
            ", confirmed"
        } else {
            ""
        };
        println!(
            "{}. {}: {} chars{}",
            stage.number(),
            stage.name(),
            record.output.text().chars().count(),
            confirmed
        );
    }

    if let Some(content) = task.final_content.as_ref().or(task.draft_content.as_ref()) {
        println!();
        println!("Article");
        println!("-------");
        println!("{}", content);
    }
}

async fn classify(store: &dyn Catalog, channel: &str, config: &PipelineConfig) -> Result<()> {
    let noise = config
        .materials
        .noise_filter()
        .context("Invalid material noise pattern")?;
    let items = store.materials(channel).await?;
    let classified = classify_materials(items, &noise, &config.materials);

    let report = &classified.report;
    println!("Material Classification: {}", channel);
    println!("==================");
    println!("Input items: {}", report.input_count);
    println!("Malformed: {}", report.malformed_dropped);
    println!("Noise: {}", report.noise_dropped);
    println!("Same source: {}", report.source_duplicates);
    println!("Near duplicates: {}", report.content_duplicates);
    println!();

    for (heading, cards) in [
        ("Long-form", &classified.long_form),
        ("Fragments", &classified.fragments),
    ] {
        println!("{} ({})", heading, cards.len());
        println!("{}", "-".repeat(heading.len()));
        for card in cards {
            println!(
                "[{}] {} ({} chars): {}",
                card.id,
                card.source.as_deref().unwrap_or("-"),
                card.content_length,
                card.summary
            );
        }
        println!();
    }
    Ok(())
}

async fn rank_styles(
    store: &dyn Catalog,
    channel: &str,
    topic: &str,
    extra: &[String],
    config: &PipelineConfig,
) -> Result<()> {
    let exemplars = store.exemplars(channel).await?;
    let keywords = topic_keywords(topic, extra);
    let matched = match_style(&exemplars, &keywords, &config.style);

    println!("Keywords: {}", matched.keywords.join(", "));
    println!();
    for (rank, scored) in matched.ranked.iter().enumerate() {
        println!(
            "{}. {} [{}] score {} (tags {}, features {})",
            rank + 1,
            scored.title,
            scored.exemplar_id,
            scored.score,
            scored.tag_hits,
            scored.feature_hits
        );
    }
    if matched.ranked.is_empty() {
        println!("No exemplars for channel {}", channel);
    }
    Ok(())
}
