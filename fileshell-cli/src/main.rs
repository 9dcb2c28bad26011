use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fileshell_core::{FileManager, SettingsManager};

mod commands;
mod serve;

#[derive(Parser, Debug)]
#[command(name = "fileshell")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sandboxed file browsing, editing and search from the terminal")]
struct Args {
    /// Directory to work in. Defaults to the current directory
    #[arg(long, global = true, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Settings file to use instead of ~/.fileshell/settings.toml
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the entries of the working directory
    Ls,

    /// Print the directory tree
    Tree {
        /// Levels to expand; unlimited when omitted
        #[arg(long)]
        depth: Option<usize>,

        /// Directories to list without expanding
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Find files and directories whose relative path matches a regex
    Find {
        pattern: String,

        /// Directory levels to descend, 0 for no limit
        #[arg(long, default_value_t = 0)]
        depth: usize,

        #[arg(long)]
        case_sensitive: bool,

        #[arg(long)]
        include: Vec<String>,

        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Search files for lines containing a word
    Grep {
        word: String,

        /// Directory, file or glob to search; the whole tree when omitted
        #[arg(default_value = "")]
        pattern: String,

        /// Only search the top level of directories
        #[arg(long)]
        no_recursive: bool,

        #[arg(long)]
        case_sensitive: bool,
    },

    /// Print a window of a file with line numbers
    Read {
        file: String,

        /// 0-based line the window starts at
        #[arg(long)]
        line: Option<i64>,
    },

    /// Replace a 1-based inclusive line range of a file
    Edit {
        file: String,
        start: i64,
        end: i64,

        /// Replacement text; read from stdin when omitted
        #[arg(long)]
        text: Option<String>,

        /// Skip the post-edit check
        #[arg(long)]
        no_lint: bool,
    },

    /// Replace every occurrence of a string in a file
    Replace {
        file: String,
        search: String,
        replacement: String,
    },

    /// Run a shell command in the working directory
    Exec {
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Serve actions as JSON lines over stdin/stdout
    Serve,
}

fn main() -> Result<()> {
    setup_tracing()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();
    info!(command = ?args.command, workdir = ?args.workdir, "CLI startup");

    let settings_manager = match args.settings {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };
    let settings = settings_manager.settings();

    let mut builder = FileManager::builder().settings(&settings);
    if let Some(workdir) = args.workdir {
        builder = builder.working_dir(workdir);
    }
    let manager = builder.build().context("Failed to open working directory")?;

    match args.command {
        Command::Ls => commands::ls(&manager),
        Command::Tree { depth, exclude } => commands::tree(&manager, depth, &exclude),
        Command::Find {
            pattern,
            depth,
            case_sensitive,
            include,
            exclude,
        } => commands::find(&manager, &pattern, depth, case_sensitive, include, exclude),
        Command::Grep {
            word,
            pattern,
            no_recursive,
            case_sensitive,
        } => commands::grep(&manager, &word, &pattern, !no_recursive, !case_sensitive),
        Command::Read { file, line } => commands::read(manager, &file, line),
        Command::Edit {
            file,
            start,
            end,
            text,
            no_lint,
        } => commands::edit(manager, &settings, &file, start, end, text, no_lint).await,
        Command::Replace {
            file,
            search,
            replacement,
        } => commands::replace(manager, &file, &search, &replacement),
        Command::Exec { command } => commands::exec(&manager, &command.join(" ")).await,
        Command::Serve => serve::run_serve(manager, &settings).await,
    }
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    let trace_dir = home.join(".fileshell").join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("fileshell.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
