use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use hocrspell::cli::output::{self, OutputFormat};
use hocrspell::config::Overrides;
use hocrspell::dict::{wordlist, DeletionTable, Normalization};
use hocrspell::hocr::{extract_bboxes, extract_suggestions, extract_words, HocrContext};
use hocrspell::{Config, SpellChecker, SpellcheckReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const HOCR_EXTENSIONS: &[&str] = &["html", "htm", "hocr", "xhtml"];

#[derive(Parser, Debug)]
#[command(name = "hocrspell")]
#[command(version, about = "Write dictionary spelling suggestions into hOCR documents", long_about = None)]
struct Cli {
    /// hOCR files or directories to spellcheck
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Word list, one word per line
    #[arg(short, long, env = "HOCRSPELL_DICTIONARY")]
    dictionary: Option<PathBuf>,

    /// Deletion table (base<TAB>variant per line); generated when omitted
    #[arg(short = 't', long)]
    deletions: Option<PathBuf>,

    /// Maximum edit distance of a suggestion
    #[arg(short = 'e', long)]
    max_edit_distance: Option<usize>,

    /// Query selecting the words to check
    #[arg(short, long)]
    query: Option<String>,

    /// Unicode normalization of dictionary and document words (nfc, nfd, none)
    #[arg(short, long)]
    normalization: Option<Normalization>,

    /// Report suggestions without writing them back
    #[arg(long)]
    dry_run: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Log lookups and insertions
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Print the bounding boxes of a document
    Bboxes {
        file: PathBuf,

        /// Query to group boxes by (repeatable); all titled elements when omitted
        #[arg(short, long = "query")]
        queries: Vec<String>,
    },
    /// List every word with the alternatives already stored on it
    Suggestions { file: PathBuf },
    /// Generate a deletion table from a word list
    Deletions {
        wordlist: PathBuf,

        /// Maximum number of deleted characters per variant
        #[arg(short = 'e', long, default_value_t = 1)]
        max_edit_distance: usize,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract a word list from plain-text files
    Wordlist {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default = if verbose { "hocrspell=debug" } else { "hocrspell=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    init_tracing(cli.verbose);

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "hocrspell", &mut io::stdout());
        return Ok(());
    }

    if cli.no_color {
        colored::control::set_override(false);
    }
    let colored = !cli.no_color;

    // Load configuration
    let config = Config::load(Overrides {
        dictionary: cli.dictionary.clone(),
        deletions: cli.deletions.clone(),
        max_edit_distance: cli.max_edit_distance,
        unchecked_query: cli.query.clone(),
        normalization: cli.normalization,
        bbox_queries: Vec::new(),
    })?;

    // Handle subcommands
    if let Some(command) = cli.command.take() {
        return handle_command(command, &config, cli.format, colored);
    }

    // Validate input files
    let files = collect_files(&cli.files);
    if files.is_empty() {
        anyhow::bail!("No hOCR files specified. Use --help for usage information.");
    }

    // Initialize checker
    let checker = SpellChecker::new(&config)?;

    let pb = if files.len() > 1 && cli.format == OutputFormat::Text {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);
        pb
    } else {
        ProgressBar::hidden()
    };

    // Process files
    let mut total = SpellcheckReport::default();
    let mut failed = 0;

    for file_path in &files {
        pb.set_message(file_path.display().to_string());

        let result = if cli.dry_run {
            HocrContext::open(file_path)
                .and_then(|mut ctx| checker.check_document(&mut ctx, &config.unchecked_query))
        } else {
            HocrContext::session(file_path, |ctx| {
                checker.check_document(ctx, &config.unchecked_query)
            })
        };
        pb.inc(1);

        match result {
            Ok(report) => {
                pb.suspend(|| output::print_report(file_path, &report, colored, cli.format))?;
                total.merge(report);
            }
            Err(e) => {
                failed += 1;
                pb.suspend(|| eprintln!("Error: {}: {}", file_path.display(), e));
            }
        }
    }
    pb.finish_and_clear();

    // Print summary
    if cli.format == OutputFormat::Text {
        output::print_check_summary(&total, &files, colored, cli.dry_run);
    }

    // Exit with appropriate code
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn collect_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| is_hocr_file(path));
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            eprintln!("Error: File not found: {}", input.display());
        }
    }
    files
}

fn is_hocr_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| HOCR_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn handle_command(
    command: Commands,
    config: &Config,
    format: OutputFormat,
    colored: bool,
) -> Result<()> {
    match command {
        Commands::Bboxes { file, queries } => {
            let ctx = HocrContext::open(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let queries = if queries.is_empty() {
                config.bbox_queries.clone()
            } else {
                queries
            };
            let queries: Vec<&str> = queries.iter().map(String::as_str).collect();
            let result = extract_bboxes(&ctx, &queries);
            output::print_bboxes(&file, &result, colored, format)?;
        }
        Commands::Suggestions { file } => {
            let ctx = HocrContext::open(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let words: Vec<_> = extract_words(&ctx)
                .into_iter()
                .map(|w| {
                    let suggestions = extract_suggestions(&ctx, w.node);
                    let path = w.path(&ctx);
                    (w.text, path, suggestions)
                })
                .collect();
            output::print_stored_suggestions(&file, &words, colored, format)?;
        }
        Commands::Deletions {
            wordlist: list,
            max_edit_distance,
            output: out,
        } => {
            let words = wordlist::load(&list, config.normalization)
                .with_context(|| format!("Failed to read word list: {}", list.display()))?;
            let table = DeletionTable::generate(&words, max_edit_distance);
            table.write_tsv(open_output(out.as_deref())?)?;
            if let Some(out) = out {
                eprintln!(
                    "Wrote {} deletion rows for {} words to {}",
                    table.len(),
                    words.len(),
                    out.display()
                );
            }
        }
        Commands::Wordlist { files, output: out } => {
            let mut seen = HashSet::new();
            let mut writer = open_output(out.as_deref())?;
            for file in &files {
                let text = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                for word in wordlist::words_from_text(&text) {
                    let word = config.normalization.apply(word);
                    if seen.insert(word.clone()) {
                        writeln!(writer, "{}", word)?;
                    }
                }
            }
            writer.flush()?;
        }
    }
    Ok(())
}
