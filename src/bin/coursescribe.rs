use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use coursescribe::audio_source::YtDlp;
use coursescribe::backends::whisper::WhisperBackend;
use coursescribe::batch::{LessonOutcome, RunSummary, fill_missing, transcribe_directory};
use coursescribe::booklet::{BookletMeta, default_markers, load_markers, render_booklet};
use coursescribe::captions::YoutubeCaptions;
use coursescribe::catalog::Catalog;
use coursescribe::course::Course;
use coursescribe::markdown::render_markdown;
use coursescribe::models::{download_to_path, lookup_model, model_list_string};
use coursescribe::opts::{Opts, default_caption_language_groups, parse_language_group};
use coursescribe::resolve::Resolver;
use coursescribe::{atomic_write, logging};

#[derive(Parser, Debug)]
#[command(name = "coursescribe")]
#[command(about = "Course video transcripts and branded booklets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill missing transcripts from captions, falling back to local transcription.
    Fetch(FetchArgs),

    /// Transcribe already-downloaded audio files for lessons without a transcript.
    TranscribeDir(TranscribeDirArgs),

    /// Regenerate the Markdown rendering from the JSON document.
    Render(RenderArgs),

    /// Show how many lessons have transcripts and list the missing ones.
    Status(DocumentArgs),

    /// Turn raw booklet text into a branded HTML booklet.
    Booklet(BookletArgs),

    /// Download a whisper.cpp GGML model.
    DownloadModel(DownloadModelArgs),
}

#[derive(Args, Debug)]
struct DocumentArgs {
    /// Transcript document (created from the catalog when missing).
    #[arg(long, default_value = "nlp-course-transcripts.json")]
    json: PathBuf,

    /// Catalog file; the built-in NLP Practitioner catalog when omitted.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MarkdownArgs {
    /// Markdown rendering written after the run.
    #[arg(long, default_value = "nlp-course-transcripts.md")]
    markdown: PathBuf,
}

#[derive(Args, Debug)]
struct WhisperArgs {
    /// Whisper language code.
    #[arg(long, default_value = "he")]
    language: String,

    /// Worker threads for whisper (0 = all CPUs).
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[command(flatten)]
    document: DocumentArgs,

    #[command(flatten)]
    markdown: MarkdownArgs,

    #[command(flatten)]
    whisper: WhisperArgs,

    /// Preferred caption languages as a comma separated group; repeat to add fallbacks.
    #[arg(long = "caption-language", value_name = "LANGS")]
    caption_languages: Vec<String>,

    /// Skip platform captions entirely.
    #[arg(long, default_value_t = false)]
    no_captions: bool,

    /// Do not fall back to captions in other languages.
    #[arg(long, default_value_t = false)]
    no_any_language: bool,

    /// GGML model file; enables local transcription when set.
    #[arg(long, value_name = "GGML")]
    model: Option<PathBuf>,

    /// yt-dlp executable used to fetch audio for local transcription.
    #[arg(long = "yt-dlp", default_value = "yt-dlp")]
    yt_dlp: PathBuf,
}

#[derive(Args, Debug)]
struct TranscribeDirArgs {
    #[command(flatten)]
    document: DocumentArgs,

    #[command(flatten)]
    markdown: MarkdownArgs,

    #[command(flatten)]
    whisper: WhisperArgs,

    /// Directory of `<module>_<lesson>_*.mp3` or `<video id>.<ext>` files.
    #[arg(long)]
    audio_dir: PathBuf,

    /// GGML model file.
    #[arg(long, value_name = "GGML")]
    model: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    document: DocumentArgs,

    #[command(flatten)]
    markdown: MarkdownArgs,
}

#[derive(Args, Debug)]
struct BookletArgs {
    /// Raw booklet text.
    #[arg(long)]
    input: PathBuf,

    /// HTML output path.
    #[arg(long, default_value = "nlp-booklet-branded.html")]
    output: PathBuf,

    /// JSON chapter marker table; the NLP Practitioner markers when omitted.
    #[arg(long)]
    markers: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    subtitle: Option<String>,

    #[arg(long)]
    instructor: Option<String>,

    #[arg(long)]
    slogan: Option<String>,
}

#[derive(Args, Debug)]
struct DownloadModelArgs {
    /// List supported model names and exit.
    #[arg(long)]
    list: bool,

    /// Model name (examples: small, large-v3-turbo)
    #[arg(long, required_unless_present = "list")]
    name: Option<String>,

    /// Target directory to store models (created if missing).
    #[arg(long, default_value = "./models")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    logging::init();

    match Cli::parse().command {
        Command::Fetch(args) => run_fetch(args),
        Command::TranscribeDir(args) => run_transcribe_dir(args),
        Command::Render(args) => run_render(args),
        Command::Status(args) => run_status(args),
        Command::Booklet(args) => run_booklet(args),
        Command::DownloadModel(args) => run_download_model(args),
    }
}

impl DocumentArgs {
    fn catalog(&self) -> Result<Catalog> {
        let catalog = match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        };
        Ok(catalog)
    }

    /// Load the document, seeding it from the catalog the first time.
    fn open(&self, catalog: &Catalog) -> Result<Course> {
        if self.json.exists() {
            return Ok(Course::load(&self.json)?);
        }

        let course = catalog.to_course();
        course.save(&self.json)?;
        println!(
            "Seeded {} with {} lessons.",
            self.json.display(),
            course.lesson_count()
        );
        Ok(course)
    }
}

impl WhisperArgs {
    fn apply(&self, opts: &mut Opts) {
        opts.language = Some(self.language.clone()).filter(|l| !l.is_empty());
        opts.threads = Some(self.threads).filter(|t| *t > 0);
    }
}

impl FetchArgs {
    fn opts(&self) -> Opts {
        let mut opts = Opts {
            enable_captions: !self.no_captions,
            enable_any_language_captions: !self.no_any_language,
            ..Opts::default()
        };

        let groups: Vec<Vec<String>> = self
            .caption_languages
            .iter()
            .map(|raw| parse_language_group(raw))
            .filter(|group| !group.is_empty())
            .collect();
        opts.caption_language_groups = if groups.is_empty() {
            default_caption_language_groups()
        } else {
            groups
        };

        self.whisper.apply(&mut opts);
        opts
    }
}

fn outcome_line(outcome: &LessonOutcome<'_>) -> String {
    let head = format!("  {}: {} ({})...", outcome.label, outcome.title, outcome.video_id);
    match (outcome.tier, outcome.failure) {
        (Some(tier), _) => format!("{head} OK via {tier} ({} chars)", outcome.chars),
        (None, Some(failure)) => format!("{head} UNAVAILABLE ({failure})"),
        (None, None) => format!("{head} UNAVAILABLE"),
    }
}

fn print_outcome(outcome: &LessonOutcome<'_>) {
    println!("{}", outcome_line(outcome));
}

fn print_summary(summary: &RunSummary, course: &Course, json: &Path, markdown: &Path) {
    println!("\n{}", "=".repeat(50));
    println!("SUMMARY:");
    println!("  Captions (preferred language): {}", summary.preferred_captions);
    println!("  Captions (any language): {}", summary.any_captions);
    println!("  Local transcriptions: {}", summary.local);
    println!("  Unavailable: {}", summary.unavailable);
    println!("  Filled this run: {}/{}", summary.filled(), summary.examined);
    println!(
        "  Document: {}/{} lessons transcribed",
        course.filled_count(),
        course.lesson_count()
    );
    println!("\nFiles updated:");
    println!("  {}", json.display());
    println!("  {}", markdown.display());
}

fn write_markdown(course: &Course, title: &str, path: &Path) -> Result<()> {
    let md = render_markdown(course, title);
    atomic_write::write_bytes_atomically(path, md.as_bytes())
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let catalog = args.document.catalog()?;
    let mut course = args.document.open(&catalog)?;

    let missing = course.missing().len();
    if missing == 0 {
        println!("All lessons already have transcripts!");
        write_markdown(&course, &catalog.title, &args.markdown.markdown)?;
        return Ok(());
    }
    println!("Found {missing} lessons with missing transcripts.\n");

    let mut resolver = Resolver::new(args.opts());
    if !args.no_captions {
        resolver = resolver.with_captions(YoutubeCaptions::new()?);
    }
    if let Some(model) = &args.model {
        resolver = resolver.with_local_transcription(
            YtDlp::new(&args.yt_dlp),
            WhisperBackend::lazy(model),
        );
    }

    let json = args.document.json.clone();
    let summary = fill_missing(
        &mut course,
        &mut resolver,
        |course| course.save(&json),
        print_outcome,
    )?;

    write_markdown(&course, &catalog.title, &args.markdown.markdown)?;
    print_summary(&summary, &course, &json, &args.markdown.markdown);
    Ok(())
}

fn run_transcribe_dir(args: TranscribeDirArgs) -> Result<()> {
    let catalog = args.document.catalog()?;
    let mut course = args.document.open(&catalog)?;

    let mut opts = Opts::default();
    args.whisper.apply(&mut opts);

    let mut backend = WhisperBackend::lazy(&args.model);
    let json = args.document.json.clone();
    let summary = transcribe_directory(
        &mut course,
        &args.audio_dir,
        &mut backend,
        &opts,
        |course| course.save(&json),
        print_outcome,
    )?;

    write_markdown(&course, &catalog.title, &args.markdown.markdown)?;
    print_summary(&summary, &course, &json, &args.markdown.markdown);
    Ok(())
}

fn run_render(args: RenderArgs) -> Result<()> {
    let catalog = args.document.catalog()?;
    let course = Course::load(&args.document.json)?;
    write_markdown(&course, &catalog.title, &args.markdown.markdown)?;
    println!("Created: {}", args.markdown.markdown.display());
    Ok(())
}

fn run_status(args: DocumentArgs) -> Result<()> {
    let course = Course::load(&args.json)?;
    println!(
        "{}/{} lessons transcribed",
        course.filled_count(),
        course.lesson_count()
    );

    for pos in course.missing() {
        if let Some(lesson) = course.lesson(pos) {
            println!("  missing {}: {} ({})", course.label(pos), lesson.title, lesson.id);
        }
    }
    Ok(())
}

fn run_booklet(args: BookletArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read booklet text: {}", args.input.display()))?;

    let markers = match &args.markers {
        Some(path) => load_markers(path)?,
        None => default_markers(),
    };

    let defaults = BookletMeta::default();
    let meta = BookletMeta {
        title: args.title.unwrap_or(defaults.title),
        subtitle: args.subtitle.unwrap_or(defaults.subtitle),
        instructor: args.instructor.unwrap_or(defaults.instructor),
        slogan: args.slogan.unwrap_or(defaults.slogan),
    };

    let html = render_booklet(&raw, &meta, &markers);
    atomic_write::write_bytes_atomically(&args.output, html.as_bytes())?;

    println!("Created: {}", args.output.display());
    Ok(())
}

fn run_download_model(args: DownloadModelArgs) -> Result<()> {
    if args.list {
        print!("{}", model_list_string());
        return Ok(());
    }

    let name = args
        .name
        .as_deref()
        .context("--name is required unless --list is given")?;

    let spec = lookup_model(name).with_context(|| {
        format!("unknown model '{name}'. Run with --list to see supported models.")
    })?;

    fs::create_dir_all(&args.dir)
        .with_context(|| format!("failed to create target dir: {}", args.dir.display()))?;
    let dest_path = args.dir.join(spec.filename);

    let url = spec.url();
    println!("⬇️  downloading {}", spec.filename);
    println!("    {url}");

    let client = Client::builder()
        .user_agent("coursescribe-model-downloader")
        .build()
        .context("failed to build HTTP client")?;

    let pb = ProgressBar::no_length();
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {bytes}/{total_bytes} {bar:40.cyan/blue} {eta}",
        )
        .context("invalid progress template")?
        .progress_chars("#>-"),
    );

    let downloaded = download_to_path(&client, &url, &dest_path, |done, total| {
        if let Some(total) = total {
            pb.set_length(total);
        }
        pb.set_position(done);
    });
    pb.finish_and_clear();

    if downloaded? {
        println!("✅ saved: {}", dest_path.display());
    } else {
        println!("✅ already exists: {}", dest_path.display());
    }
    Ok(())
}
