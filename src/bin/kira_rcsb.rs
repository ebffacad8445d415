use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_rcsb::config::ConfigLoader;
use kira_rcsb::error::{ErrorKind, RcsbError};
use kira_rcsb::fasta::FastaSelection;
use kira_rcsb::fetch::{DataType, FetcherOutput, PropertyRequest};
use kira_rcsb::files::{FileType, PdbFileOptions, PdbFileResult};
use kira_rcsb::output::{JsonOutput, OutputMode};
use kira_rcsb::search::{QueryResults, QuerySearchOptions, QueryType, ReturnType};
use kira_rcsb::RcsbClient;

#[derive(Parser)]
#[command(name = "kira-rcsb")]
#[command(about = "Query the RCSB Protein Data Bank: search, metadata, sequences and structure files")]
#[command(version, author)]
struct Cli {
    /// JSON client config (defaults to ./kira-rcsb.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Search entries by term")]
    Search(SearchArgs),
    #[command(about = "Show the entry document for a PDB id")]
    Info(InfoArgs),
    #[command(about = "Describe a chemical component")]
    Chem { chem_id: String },
    #[command(about = "Print FASTA sequences of an entry")]
    Fasta(FastaArgs),
    #[command(about = "Fetch GraphQL metadata for a list of ids")]
    Fetch(FetchArgs),
    #[command(about = "Download and parse a structure file")]
    Download(DownloadArgs),
    #[command(about = "List primary citation titles for entries matching a term")]
    Papers(PapersArgs),
}

#[derive(Args)]
struct SearchArgs {
    term: String,

    #[arg(long, default_value = "full_text")]
    query_type: String,

    #[arg(long, default_value = "entry")]
    return_type: String,

    #[arg(long, default_value_t = 1)]
    attempts: u32,

    #[arg(long, default_value_t = 500)]
    sleep_ms: u64,
}

#[derive(Args)]
struct InfoArgs {
    pdb_id: String,

    /// Print headline fields instead of the full document
    #[arg(long)]
    summary: bool,
}

#[derive(Args)]
struct FastaArgs {
    entry_id: String,

    #[arg(long)]
    chain: Option<String>,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(required = true)]
    ids: Vec<String>,

    #[arg(long, default_value = "ENTRY")]
    data_type: String,

    /// `group=sub1,sub2`; repeat for more groups
    #[arg(long = "property", required = true)]
    properties: Vec<String>,

    /// Flatten the records into a table
    #[arg(long)]
    table: bool,

    #[arg(long)]
    tsv: bool,
}

#[derive(Args)]
struct DownloadArgs {
    pdb_id: String,

    #[arg(long, default_value = "pdb")]
    filetype: String,

    #[arg(long)]
    no_compression: bool,

    #[arg(long)]
    rm_insert: bool,

    #[arg(long)]
    keep_alt: bool,

    #[arg(long)]
    save: bool,

    #[arg(long)]
    path: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct PapersArgs {
    term: String,

    #[arg(long, default_value_t = 10)]
    max_results: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<RcsbError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RcsbError) -> u8 {
    match error.kind() {
        ErrorKind::InvalidInput | ErrorKind::UnsupportedMapping | ErrorKind::NotFound => 2,
        ErrorKind::Network => 3,
        ErrorKind::MalformedResponse => 4,
        ErrorKind::Io => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = RcsbClient::from_config(&config)?;

    match cli.command {
        Commands::Search(args) => run_search(&client, args),
        Commands::Info(args) => {
            if args.summary {
                JsonOutput::print(&client.get_entry_summary(&args.pdb_id)?).into_diagnostic()
            } else {
                JsonOutput::print(&client.get_info(&args.pdb_id)?).into_diagnostic()
            }
        }
        Commands::Chem { chem_id } => {
            JsonOutput::print(&client.describe_chemical(&chem_id)?).into_diagnostic()
        }
        Commands::Fasta(args) => run_fasta(&client, args),
        Commands::Fetch(args) => run_fetch(&client, args),
        Commands::Download(args) => run_download(&client, args),
        Commands::Papers(args) => {
            let papers = client.find_papers(&args.term, args.max_results)?;
            JsonOutput::print(&papers).into_diagnostic()
        }
    }
}

fn run_search(client: &RcsbClient, args: SearchArgs) -> miette::Result<()> {
    let query_type: QueryType = args.query_type.parse()?;
    let options = QuerySearchOptions {
        return_type: args.return_type.parse::<ReturnType>()?,
        num_attempts: args.attempts,
        sleep_time: Duration::from_millis(args.sleep_ms),
        ..QuerySearchOptions::default()
    };
    match client.query_search(&args.term, query_type, &options)? {
        QueryResults::Identifiers(ids) => JsonOutput::print_lines(&ids).into_diagnostic(),
        QueryResults::Raw(raw) => JsonOutput::print(&raw).into_diagnostic(),
    }
}

fn run_fasta(client: &RcsbClient, args: FastaArgs) -> miette::Result<()> {
    match client.get_fasta_from_rcsb_entry(&args.entry_id, args.chain.as_deref())? {
        FastaSelection::Entry(records) => {
            let lines: Vec<String> = records
                .iter()
                .flat_map(|record| [format!(">{}", record.header), record.sequence.clone()])
                .collect();
            JsonOutput::print_lines(&lines).into_diagnostic()
        }
        FastaSelection::Chain { chain_id, sequence } => {
            JsonOutput::print_lines(&[format!(">{}:{chain_id}", args.entry_id), sequence])
                .into_diagnostic()
        }
    }
}

fn parse_property(spec: &str) -> miette::Result<(String, Vec<String>)> {
    let (group, subs) = spec
        .split_once('=')
        .ok_or_else(|| miette::Report::msg(format!("property '{spec}' must look like group=sub1,sub2")))?;
    let subs = subs
        .split(',')
        .map(str::trim)
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .collect();
    Ok((group.trim().to_string(), subs))
}

fn run_fetch(client: &RcsbClient, args: FetchArgs) -> miette::Result<()> {
    let data_type: DataType = args.data_type.parse()?;
    let mut properties = PropertyRequest::new();
    for spec in &args.properties {
        let (group, subs) = parse_property(spec)?;
        properties.add(group, subs)?;
    }

    let as_table = args.table || args.tsv;
    match client.data_fetcher(&args.ids, data_type, &properties, as_table)? {
        FetcherOutput::Records(response) => JsonOutput::print(&response).into_diagnostic(),
        FetcherOutput::Table(table) => {
            let mode = if args.tsv {
                OutputMode::Tsv
            } else {
                OutputMode::Json
            };
            JsonOutput::print_table(&table, mode).into_diagnostic()
        }
    }
}

fn run_download(client: &RcsbClient, args: DownloadArgs) -> miette::Result<()> {
    let options = PdbFileOptions {
        filetype: args.filetype.parse::<FileType>()?,
        rm_insert: args.rm_insert,
        rm_alt: !args.keep_alt,
        compression: !args.no_compression,
        save: args.save,
        path: args.path,
    };
    match client.get_pdb_file(&args.pdb_id, &options)? {
        PdbFileResult::Coordinates(structure) => {
            println!(
                "{}: {} atoms, {} C-alpha",
                args.pdb_id,
                structure.atom.len(),
                structure.calpha_count()
            );
            if let Some(path) = &structure.saved_path {
                println!("saved to {path}");
            }
            Ok(())
        }
        other => JsonOutput::print(&other).into_diagnostic(),
    }
}
