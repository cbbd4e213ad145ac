use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use subtitle_align::{
    AlignerConfig, AlignmentSummary, ConceptTable, HashedNgramSimilarity, LexicalSimilarity,
    PhraseGroupSimilarity, SimilarityProvider, SubtitleAligner, SubtitleAlignerBuilder,
};
use tracing_subscriber::EnvFilter;

#[path = "subtitle_align/bilingual_srt_formatter.rs"]
mod bilingual_srt_formatter;
#[path = "subtitle_align/json_report_formatter.rs"]
mod json_report_formatter;
#[path = "subtitle_align/srt_reader.rs"]
mod srt_reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderChoice {
    Lexical,
    #[value(name = "phrase-groups")]
    PhraseGroups,
    Ngram,
}

#[derive(Debug, Parser)]
#[command(name = "subtitle_align")]
#[command(about = "Align two independently authored subtitle tracks into bilingual pairs")]
struct Args {
    #[arg(long, env = "SUBTITLE_ALIGN_SOURCE")]
    source: PathBuf,
    #[arg(long, env = "SUBTITLE_ALIGN_TARGET")]
    target: PathBuf,
    /// JSON aligner configuration; missing fields keep their defaults.
    #[arg(long, env = "SUBTITLE_ALIGN_CONFIG")]
    config: Option<PathBuf>,
    /// JSON object mapping source concept keys to target surface forms.
    #[arg(long, env = "SUBTITLE_ALIGN_CONCEPTS")]
    concepts: Option<PathBuf>,
    /// JSON array of reviewer decisions replayed before aligning.
    #[arg(long, env = "SUBTITLE_ALIGN_FEEDBACK")]
    feedback: Option<PathBuf>,
    #[arg(long, env = "SUBTITLE_ALIGN_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "SUBTITLE_ALIGN_SRT_OUT")]
    srt_out: Option<PathBuf>,
    #[arg(long, env = "SUBTITLE_ALIGN_SEARCH_RADIUS")]
    search_radius: Option<usize>,
    #[arg(long, env = "SUBTITLE_ALIGN_BATCH_SIZE")]
    batch_size: Option<usize>,
    #[arg(
        long,
        env = "SUBTITLE_ALIGN_PROVIDER",
        value_enum,
        default_value_t = ProviderChoice::Lexical
    )]
    provider: ProviderChoice,
}

#[derive(Debug, Deserialize)]
struct FeedbackSubmission {
    source_text: String,
    target_text: String,
    #[serde(default)]
    was_correct: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let mut config = match args.config.as_ref() {
        Some(path) => AlignerConfig::load(path).map_err(|err| err.to_string())?,
        None => AlignerConfig::default(),
    };
    if let Some(search_radius) = args.search_radius {
        config.search_radius = search_radius;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    let source = srt_reader::read_track(&args.source)?;
    let target = srt_reader::read_track(&args.target)?;
    if source.is_empty() {
        return Err(format!(
            "Could not parse any subtitles from source file '{}'.",
            args.source.display()
        ));
    }
    if target.is_empty() {
        return Err(format!(
            "Could not parse any subtitles from target file '{}'.",
            args.target.display()
        ));
    }

    let concepts = match args.concepts.as_ref() {
        Some(path) => ConceptTable::load(path).map_err(|err| err.to_string())?,
        None => ConceptTable::default(),
    };
    let aligner = build_aligner(config, concepts, args.provider)?;

    if let Some(path) = args.feedback.as_ref() {
        let stored = replay_feedback(&aligner, path)?;
        tracing::info!(stored, "feedback replayed");
    }

    let progress = ProgressBar::new(source.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} cues")
            .map_err(|err| format!("Invalid progress template: {err}"))?,
    );
    let output = aligner
        .align_with_progress(&source, &target, &|done| progress.inc(done as u64))
        .map_err(|err| format!("Alignment failed: {err}"))?;
    progress.finish_and_clear();

    let summary = AlignmentSummary::from_records(&output.records, target.len());
    if let Some(path) = args.out.as_ref() {
        let report = json_report_formatter::Report {
            schema_version: json_report_formatter::REPORT_SCHEMA_VERSION,
            meta: json_report_formatter::Meta {
                generated_at: Utc::now().to_rfc3339(),
                source_path: args.source.display().to_string(),
                target_path: args.target.display().to_string(),
                provider: aligner.provider_name(),
                config: aligner.config(),
            },
            summary: &summary,
            diagnostics: &output.diagnostics,
            records: &output.records,
        };
        json_report_formatter::write_json(path, &report)?;
        tracing::info!(path = %path.display(), "report written");
    }
    if let Some(path) = args.srt_out.as_ref() {
        let cues = bilingual_srt_formatter::write_bilingual_srt(path, &output.records)?;
        tracing::info!(path = %path.display(), cues, "bilingual SRT written");
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&summary)
            .map_err(|err| format!("Failed to serialize summary: {err}"))?
    );
    Ok(())
}

fn build_aligner(
    config: AlignerConfig,
    concepts: ConceptTable,
    choice: ProviderChoice,
) -> Result<SubtitleAligner, String> {
    let lexical: Arc<dyn SimilarityProvider> =
        Arc::new(LexicalSimilarity::new(Arc::new(concepts.clone())));
    let provider: Arc<dyn SimilarityProvider> = match choice {
        ProviderChoice::Lexical => lexical,
        ProviderChoice::PhraseGroups => Arc::new(PhraseGroupSimilarity::with_builtin_groups(lexical)),
        ProviderChoice::Ngram => Arc::new(HashedNgramSimilarity::default()),
    };
    SubtitleAlignerBuilder::new(config)
        .with_concepts(concepts)
        .with_similarity_provider(provider)
        .build()
        .map_err(|err| format!("Failed to build aligner: {err}"))
}

fn replay_feedback(aligner: &SubtitleAligner, path: &Path) -> Result<usize, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read feedback file '{}': {err}", path.display()))?;
    let submissions: Vec<FeedbackSubmission> = serde_json::from_str(&data)
        .map_err(|err| format!("Failed to parse feedback file '{}': {err}", path.display()))?;
    let mut stored = aligner.feedback_store().len();
    for submission in &submissions {
        stored = aligner.submit_feedback(
            &submission.source_text,
            &submission.target_text,
            submission.was_correct,
        );
    }
    Ok(stored)
}
