//! unscan CLI - scanned document flattening and Q&A tool

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unscan::{
    flatten_json, AnalysisDocument, AnthropicModel, ArtifactKeys, AwsContext, BedrockModel,
    BlobStore, BlockType, CancelToken, FsBlobStore, LanguageModel, MissingGeometry,
    OrderOptions, Pipeline, PipelineOptions, PollPolicy, S3BlobStore, Session, TextractClient,
};

/// Notice shown for any failed operation; details go to the log.
const FAILURE_NOTICE: &str = "Something went wrong";

#[derive(Parser)]
#[command(name = "unscan")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Flatten scanned documents and ask questions about them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload, analyse, flatten and restructure a document
    Process {
        /// Input PDF, PNG or JPEG file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Stop after flattening, without calling the model
        #[arg(long)]
        no_restructure: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Flatten a saved raw analysis result offline
    Flatten {
        /// Raw block JSON (`{"Blocks": [...]}`)
        #[arg(value_name = "RAW_JSON")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        order: OrderArgs,
    },

    /// Ask a question about a processed document
    Ask {
        /// Storage key of the uploaded document (e.g. uploads/form.pdf)
        #[arg(value_name = "KEY")]
        key: String,

        /// The question
        #[arg(value_name = "QUESTION")]
        question: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Process a document, then answer questions read from stdin
    Chat {
        /// Input PDF, PNG or JPEG file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Show statistics of a saved raw analysis result
    Info {
        /// Raw block JSON
        #[arg(value_name = "RAW_JSON")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct BackendArgs {
    /// S3 bucket holding uploads and artifacts
    #[arg(long, env = "UNSCAN_BUCKET")]
    bucket: Option<String>,

    /// Custom S3 endpoint (path-style addressing)
    #[arg(long, env = "UNSCAN_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// AWS region (defaults to the profile's region, then us-east-1)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Local directory used instead of S3
    #[arg(long, env = "UNSCAN_STORE_DIR", conflicts_with = "bucket")]
    store_dir: Option<PathBuf>,

    /// Model id (Bedrock model id, or Anthropic model name with an API key)
    #[arg(long, env = "UNSCAN_MODEL_ID")]
    model_id: Option<String>,

    /// Use the Anthropic API directly instead of Bedrock
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    /// Give up on the analysis job after this many seconds
    #[arg(long, default_value = "600", value_name = "SECS")]
    timeout: u64,

    #[command(flatten)]
    order: OrderArgs,
}

#[derive(Args, Clone)]
struct OrderArgs {
    /// Vertical tolerance for grouping blocks into one row
    #[arg(long, default_value_t = unscan::parser::DEFAULT_Y_TOLERANCE)]
    y_tolerance: f32,

    /// Placement of blocks without geometry
    #[arg(long, value_enum, default_value = "trailing")]
    missing_geometry: MissingGeometryArg,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MissingGeometryArg {
    /// After all positioned blocks, in original order
    Trailing,
    /// At the top-left page corner
    Origin,
}

impl From<&OrderArgs> for OrderOptions {
    fn from(args: &OrderArgs) -> Self {
        let missing = match args.missing_geometry {
            MissingGeometryArg::Trailing => MissingGeometry::Trailing,
            MissingGeometryArg::Origin => MissingGeometry::Origin,
        };
        OrderOptions::new()
            .with_y_tolerance(args.y_tolerance)
            .with_missing_geometry(missing)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Process {
            input,
            no_restructure,
            backend,
        }) => cmd_process(&input, no_restructure, &backend),
        Some(Commands::Flatten {
            input,
            output,
            order,
        }) => cmd_flatten(&input, output.as_deref(), &order),
        Some(Commands::Ask {
            key,
            question,
            backend,
        }) => cmd_ask(&key, &question, &backend),
        Some(Commands::Chat { input, backend }) => cmd_chat(&input, &backend),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: unscan <COMMAND>".yellow());
            println!("       unscan --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("{}: {}", "Error".red().bold(), FAILURE_NOTICE);
        std::process::exit(1);
    }
}

fn build_pipeline(args: &BackendArgs) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let aws = AwsContext::load_with_region(args.region.clone())?;

    let store: Box<dyn BlobStore> = match (&args.store_dir, &args.bucket) {
        (Some(dir), _) => Box::new(FsBlobStore::open(dir)?),
        (None, Some(bucket)) => match &args.s3_endpoint {
            Some(endpoint) => Box::new(S3BlobStore::with_endpoint(&aws, bucket.as_str(), endpoint)?),
            None => Box::new(S3BlobStore::new(&aws, bucket.as_str())?),
        },
        (None, None) => return Err("either --bucket or --store-dir is required".into()),
    };

    let model: Box<dyn LanguageModel> = match &args.anthropic_api_key {
        Some(key) => {
            let mut model = AnthropicModel::new(key.as_str())?;
            if let Some(id) = &args.model_id {
                model = model.with_model(id.as_str());
            }
            Box::new(model)
        }
        None => match &args.model_id {
            Some(id) => Box::new(BedrockModel::with_model(&aws, id.as_str())),
            None => Box::new(BedrockModel::new(&aws)),
        },
    };

    let options = PipelineOptions::new()
        .with_order(OrderOptions::from(&args.order))
        .with_poll(PollPolicy::new().with_timeout(Duration::from_secs(args.timeout)));

    let analysis = Box::new(TextractClient::new(&aws));
    let pipeline = Pipeline::from_boxed(store, analysis, model).with_options(options);
    log::debug!("{:?}", pipeline);
    Ok(pipeline)
}

fn file_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message);
    pb
}

fn cmd_process(
    input: &Path,
    no_restructure: bool,
    backend: &BackendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(backend)?;
    let data = fs::read(input)?;
    let cancel = CancelToken::never();

    let pb = spinner("Uploading file...");
    let key = pipeline.upload(&file_name(input), &data);
    let key = match key {
        Ok(key) => key,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };

    pb.set_message("Processing document...");
    if let Err(e) = pipeline.process_document(&key, &cancel) {
        pb.abandon();
        return Err(e.into());
    }

    if !no_restructure {
        pb.set_message("Restructuring document...");
        if let Err(e) = pipeline.restructure_document(&key) {
            pb.abandon();
            return Err(e.into());
        }
    }
    pb.finish_with_message("Done!");

    let keys = ArtifactKeys::for_upload(key.as_str());
    println!("\n{}", "Stored artifacts:".green().bold());
    println!("  {} {}", "├─".dimmed(), keys.upload());
    println!("  {} {}", "├─".dimmed(), keys.raw());
    if no_restructure {
        println!("  {} {}", "└─".dimmed(), keys.parsed());
    } else {
        println!("  {} {}", "├─".dimmed(), keys.parsed());
        println!("  {} {}", "└─".dimmed(), keys.context());
    }

    Ok(())
}

fn cmd_flatten(
    input: &Path,
    output: Option<&Path>,
    order: &OrderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(input)?;
    let text = flatten_json(&raw, &OrderOptions::from(order))?;

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_ask(key: &str, question: &str, backend: &BackendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(backend)?;

    let pb = spinner("Getting answer...");
    let answer = pipeline.ask(key, question);
    pb.finish_and_clear();

    println!("{} {}", "Answer:".green().bold(), answer?);
    Ok(())
}

fn cmd_chat(input: &Path, backend: &BackendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(backend)?;
    let data = fs::read(input)?;
    let mut session = Session::new();

    let pb = spinner("Processing document...");
    let ingested = pipeline.ingest(&mut session, &file_name(input), &data, &CancelToken::never());
    if let Err(e) = ingested {
        pb.abandon();
        return Err(e.into());
    }
    pb.finish_with_message("Document processed and restructured!");

    println!("{}", "Ask a question about the document (empty line to quit)".cyan().bold());
    let stdin = io::stdin();
    loop {
        print!("{} ", ">".cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        match pipeline.ask_in_session(&session, question) {
            Ok(answer) => println!("{} {}\n", "Answer:".green().bold(), answer),
            Err(e) => {
                log::error!("{}", e);
                println!("{}\n", "An error occurred while getting the answer.".red());
            }
        }
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(input)?;
    let mut doc = AnalysisDocument::from_json(&raw)?;

    println!("{}", "Analysis Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Blocks".bold(), doc.block_count());
    println!("{}: {}", "Pages".bold(), doc.page_count());
    println!("{}: {}", "Lines".bold(), doc.count_of(&BlockType::Line));
    println!("{}: {}", "Words".bold(), doc.count_of(&BlockType::Word));
    println!("{}: {}", "Tables".bold(), doc.count_of(&BlockType::Table));
    println!("{}: {}", "Cells".bold(), doc.count_of(&BlockType::Cell));

    let selected = doc
        .blocks
        .iter()
        .filter(|b| b.selection_status.map(|s| s.is_selected()).unwrap_or(false))
        .count();
    println!(
        "{}: {} ({} selected)",
        "Checkboxes".bold(),
        doc.count_of(&BlockType::SelectionElement),
        selected
    );

    unscan::order_blocks(&mut doc, &OrderOptions::default());
    let document = unscan::assemble(&doc);

    println!();
    println!("{}", "Flattened Content".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for page in &document.pages {
        println!(
            "{} {}: {} lines, {} tables",
            "Page".bold(),
            page.number,
            page.lines.len(),
            page.tables.len()
        );
    }
    println!("{}: {}", "Checkboxes on lines".bold(), document.selection_count());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "unscan".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Scanned document flattening and Q&A tool");
    println!();
    println!("License: MIT");
}
