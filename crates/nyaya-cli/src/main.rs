mod display;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use nyaya_ai::gemini::DEFAULT_MODEL;
use nyaya_ai::{GeminiConfig, GeminiOracle, Oracle};
use nyaya_core::{AnnotatedDocument, ClauseId, RiskLevel, score_clause, segment};
use nyaya_pipeline::{DEFAULT_TITLE, Pipeline, PipelineConfig, RiskReport};
use nyaya_store::{ReportStore, SavedRun, load_pages};
use tracing::{Level, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[derive(Parser)]
#[command(name = "nyaya", version, about = "Contract clause risk analysis and annotation")]
struct Cli {
    /// Maximum log level: error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    /// Also append logs to this file.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full analysis and write the report, annotated contract and summary.
    Analyze {
        /// Extracted contract text (.txt with form-feed page breaks, or .json pages).
        #[arg(long, short, value_name = "PATH")]
        input: PathBuf,

        #[arg(long, short, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        /// Heading of the annotated contract.
        #[arg(long, default_value = DEFAULT_TITLE)]
        title: String,

        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Seconds to wait between consecutive citation or redline calls.
        #[arg(long, default_value_t = 2)]
        call_delay: u64,
    },
    /// Segment a document into clauses without calling the model.
    Segment {
        #[arg(long, short, value_name = "PATH")]
        input: PathBuf,

        /// Print the initial annotated markup instead of the clause table.
        #[arg(long)]
        markup: bool,
    },
    /// Score a single clause text with the deterministic rules.
    Score {
        #[arg(long)]
        text: String,

        #[arg(long, value_enum)]
        level: LevelArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    High,
    Medium,
    Low,
}

impl From<LevelArg> for RiskLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::High => RiskLevel::High,
            LevelArg::Medium => RiskLevel::Medium,
            LevelArg::Low => RiskLevel::Low,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_file.as_deref())?;
    info!("nyaya v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Analyze {
            input,
            output,
            title,
            model,
            api_key,
            call_delay,
        } => {
            let api_key = require_api_key(api_key)?;
            let config = PipelineConfig {
                call_delay: std::time::Duration::from_secs(call_delay),
                ..PipelineConfig::default()
            }
            .with_title(title);
            let oracle = GeminiOracle::new(GeminiConfig::new(api_key).with_model(model));
            analyze(&input, &output, Arc::new(oracle), config).await?;
            Ok(())
        }
        Command::Segment { input, markup } => {
            let pages = load_pages(&input)
                .with_context(|| format!("loading {}", input.display()))?;
            let seg = segment(&pages).context("segmenting document")?;
            if markup {
                print!("{}", AnnotatedDocument::new(DEFAULT_TITLE, &seg.clauses).render());
            } else {
                display::print_clause_table(&seg.clauses);
            }
            Ok(())
        }
        Command::Score { text, level } => {
            let score = score_clause(&ClauseId::from("input"), &text, level.into());
            display::print_score(&score);
            Ok(())
        }
    }
}

fn init_logging(level: Level, log_file: Option<&Path>) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(level);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn require_api_key(api_key: Option<String>) -> anyhow::Result<String> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("GOOGLE_API_KEY is not set; pass --api-key or export it"),
    }
}

/// Run the pipeline and persist its outputs. Nothing is written unless every
/// stage succeeds.
async fn analyze(
    input: &Path,
    output: &Path,
    oracle: Arc<dyn Oracle>,
    config: PipelineConfig,
) -> anyhow::Result<SavedRun> {
    let pages =
        load_pages(input).with_context(|| format!("loading {}", input.display()))?;
    let store = ReportStore::open(output)
        .with_context(|| format!("opening output directory {}", output.display()))?;

    let pipeline = Pipeline::new(oracle, config);
    let state = pipeline.run(&pages).await;

    if let Some(err) = &state.error {
        display::print_failure(&state);
        bail!("analysis failed in {} stage: {err}", err.stage());
    }

    let report = RiskReport::build(
        &state,
        &input.display().to_string(),
        pipeline.model(),
        chrono::Utc::now(),
    );
    let annotated = state.render().context("run finished without a document")?;
    let summary = state.executive_summary.as_ref().map(|s| s.to_text());
    let saved = store
        .save_run(&report, &annotated, summary.as_deref(), chrono::Local::now())
        .context("saving run outputs")?;

    display::print_run_card(input, &state, &saved);
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use nyaya_ai::{OracleError, OracleRequest, ScriptedOracle, Task};
    use tempfile::TempDir;

    use super::*;

    const CONTRACT: &str = "1. The Vendor may terminate this agreement at its sole discretion without notice.\n\
                            2. Notices shall be delivered in writing to the registered office.";

    fn reply(req: &OracleRequest) -> Result<String, OracleError> {
        let clause = req.clause_id.as_ref().map_or("", ClauseId::as_str);
        let text = match (req.task, clause) {
            (Task::Classify, _) => r#"{"type": "Termination", "confidence": 0.9}"#,
            (Task::Risk, "clause_1") => {
                r#"{"risk_level": "High", "issues": [{"issue_type": "Unilateral exit",
                    "explanation": "No notice.", "trigger_terms": ["sole discretion"]}]}"#
            }
            (Task::Risk, _) => r#"{"risk_level": "Low", "issues": []}"#,
            (Task::Cite, _) => {
                r#"{"section": "Section 23", "law_name": "Indian Contract Act, 1872",
                    "explanation": "Unfair terms.", "found": true}"#
            }
            (Task::Redline, _) => {
                r#"{"original_text": "The Vendor may terminate",
                    "suggested_text": "Require 30 days written notice.", "rationale": "Balance."}"#
            }
            (Task::Summarize, _) => {
                r#"{"summary": "Termination is one-sided.", "top_risks": [],
                    "recommendations": ["Add a notice period"]}"#
            }
        };
        Ok(text.to_string())
    }

    fn write_contract(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("msa.txt");
        std::fs::write(&path, CONTRACT).unwrap();
        path
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, |entries| entries.count())
    }

    #[tokio::test]
    async fn successful_run_writes_three_outputs() {
        let tmp = TempDir::new().unwrap();
        let input = write_contract(&tmp);
        let output = tmp.path().join("out");

        let saved = analyze(
            &input,
            &output,
            Arc::new(ScriptedOracle::new(reply)),
            PipelineConfig::immediate(),
        )
        .await
        .unwrap();

        assert_eq!(files_in(&output), 3);
        let annotated = std::fs::read_to_string(&saved.annotated).unwrap();
        assert!(annotated.contains("-sg-Require 30 days written notice.-sg-"));
        let summary = std::fs::read_to_string(saved.summary.unwrap()).unwrap();
        assert!(summary.contains("EXECUTIVE SUMMARY"));
        let report = std::fs::read_to_string(&saved.report).unwrap();
        assert!(report.contains("\"overall_risk_score\""));
    }

    #[tokio::test]
    async fn missing_input_fails_without_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out");
        let oracle = Arc::new(ScriptedOracle::new(reply));

        let result = analyze(
            &tmp.path().join("absent.txt"),
            &output,
            oracle.clone(),
            PipelineConfig::immediate(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(files_in(&output), 0);
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn fatal_stage_fails_without_output() {
        let tmp = TempDir::new().unwrap();
        let input = write_contract(&tmp);
        let output = tmp.path().join("out");
        let oracle = ScriptedOracle::new(|req| match req.task {
            Task::Redline => Err(OracleError::Server {
                status: 500,
                body: "internal".into(),
            }),
            _ => reply(req),
        });

        let err = analyze(&input, &output, Arc::new(oracle), PipelineConfig::immediate())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("redline"), "got {err}");
        assert_eq!(files_in(&output), 0);
    }

    #[test]
    fn api_key_is_required() {
        assert!(require_api_key(None).is_err());
        assert!(require_api_key(Some("   ".into())).is_err());
        assert_eq!(require_api_key(Some("abc".into())).unwrap(), "abc");
    }

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "nyaya",
            "--log-level",
            "debug",
            "--log-file",
            "run.log",
            "analyze",
            "--input",
            "msa.txt",
            "--api-key",
            "k",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Level::DEBUG);
        assert_eq!(cli.log_file.as_deref(), Some(Path::new("run.log")));
        let Command::Analyze { output, model, .. } = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(output, PathBuf::from("output"));
        assert_eq!(model, DEFAULT_MODEL);
    }
}
