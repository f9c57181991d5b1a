//! # skilltrack CLI (`trk`)
//!
//! Tracks progress through a learning checklist (by default the DevOps &
//! SRE journey) and keeps it in a local JSON file, optionally mirrored from
//! an HTTP(S) URL or stored in S3.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trk status` | Overall, per-section and task-count summary |
//! | `trk show [key]` | The checklist, optionally for one section or subsection |
//! | `trk check <key>…` | Mark tasks done |
//! | `trk uncheck <key>…` | Mark tasks not done |
//! | `trk notes` | Print notes |
//! | `trk notes set <field> <text>` | Replace one note field |
//! | `trk reset [--confirm]` | Delete all progress |
//! | `trk export [--output path]` | Write the progress document as JSON |
//! | `trk location` | Show where progress is loaded from and saved to |
//! | `trk serve` | Start the HTTP API |
//! | `trk completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! trk check linux_permissions linux_cron_jobs
//! trk show docker
//! SKILLTRACK_LOCATION=s3://my-bucket/progress.json trk status
//! trk --notices json check k8s_pods 2> notices.jsonl
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use skilltrack::catalogue::load_catalogue;
use skilltrack::config::{load_or_default, Config};
use skilltrack::export::run_export;
use skilltrack::notice::{NoticeMode, NoticeReporter};
use skilltrack::report::{render_checklist, render_notes, render_status};
use skilltrack::server::run_server;
use skilltrack::session::Session;
use skilltrack::store::ProgressStore;

/// skilltrack: a personal learning-progress tracker.
///
/// Configuration is read from `--config`, or `./config/trk.toml` when it
/// exists. See `config/trk.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "trk",
    about = "Track progress through a learning checklist",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How to print store notices on stderr. Defaults to `human` on a
    /// terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    notices: Option<NoticeMode>,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show overall and per-section progress.
    Status,

    /// Print the checklist with completion marks.
    Show {
        /// Limit output to one section or subsection key (e.g. `cloud`, `k8s`).
        key: Option<String>,
    },

    /// Mark one or more tasks as done.
    ///
    /// Task keys have the form `<subsection>_<task>`; `trk show` lists them.
    ///
    /// Under an http(s):// location the change is saved to the local file
    /// only. The next run loads from the read-only remote again, so it will
    /// not show the change; use an s3:// location to keep edits.
    Check {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Mark one or more tasks as not done.
    Uncheck {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print or edit notes.
    Notes {
        #[command(subcommand)]
        action: Option<NotesAction>,
    },

    /// Delete all saved progress.
    ///
    /// Without `--confirm` this only explains what would happen.
    Reset {
        #[arg(long)]
        confirm: bool,
    },

    /// Write the progress document as JSON.
    Export {
        /// Output file (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the resolved storage location.
    Location,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// Replace one note field (`to_learn`, `in_progress`, or `completed`).
    Set { field: String, text: String },
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "skilltrack=debug" } else { "skilltrack=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_session(config: &Config, notices: &dyn NoticeReporter) -> Result<Session> {
    let catalogue = Arc::new(load_catalogue(config)?);
    let store = ProgressStore::from_config(config)?;
    let (session, loaded) = Session::open(catalogue, store).await;
    notices.report_all(&loaded);
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "trk", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_or_default(cli.config.as_deref())?;
    let notices = cli.notices.unwrap_or_else(NoticeMode::default_for_tty).reporter();

    match cli.command {
        Commands::Status => {
            let session = open_session(&config, notices.as_ref()).await?;
            print!("{}", render_status(&session.ratios(), session.location()));
        }
        Commands::Show { key } => {
            let session = open_session(&config, notices.as_ref()).await?;
            print!("{}", render_checklist(&session.ratios(), key.as_deref())?);
        }
        Commands::Check { keys } => {
            set_tasks(&config, notices.as_ref(), &keys, true).await?;
        }
        Commands::Uncheck { keys } => {
            set_tasks(&config, notices.as_ref(), &keys, false).await?;
        }
        Commands::Notes { action: None } => {
            let session = open_session(&config, notices.as_ref()).await?;
            print!("{}", render_notes(session.notes()));
        }
        Commands::Notes {
            action: Some(NotesAction::Set { field, text }),
        } => {
            let mut session = open_session(&config, notices.as_ref()).await?;
            let saved = session.set_note_named(&field, text).await?;
            notices.report_all(&saved);
            println!("Updated {}", field);
        }
        Commands::Reset { confirm } => {
            let mut session = open_session(&config, notices.as_ref()).await?;
            if !confirm {
                println!(
                    "This deletes all progress and notes ({} saved task flags, local file {}).",
                    session.document().tasks.len(),
                    session.store().local_path().display()
                );
                println!("Run `trk reset --confirm` to proceed.");
                return Ok(());
            }
            let token = session.request_reset();
            let done = session.confirm_reset(&token).await?;
            notices.report_all(&done);
            println!("Progress reset.");
        }
        Commands::Export { output } => {
            let session = open_session(&config, notices.as_ref()).await?;
            run_export(session.document(), output.as_deref())?;
        }
        Commands::Location => {
            let store = ProgressStore::from_config(&config)?;
            let local_state = if store.local_exists().await { "present" } else { "missing" };
            println!("Location:    {} ({})", store.location(), store.location().kind());
            println!("Local file:  {} ({})", store.local_path().display(), local_state);
            println!("Timeout:     {}s", config.storage.timeout_secs);
        }
        Commands::Serve => {
            run_server(&config, notices.as_ref()).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn set_tasks(
    config: &Config,
    notices: &dyn NoticeReporter,
    keys: &[String],
    done: bool,
) -> Result<()> {
    let mut session = open_session(config, notices).await?;
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    let saved = session.set_task_states(&keys, done).await?;
    notices.report_all(&saved);
    println!(
        "{} {} task(s). Overall progress: {}",
        if done { "Checked" } else { "Unchecked" },
        keys.len(),
        skilltrack::report::percent(session.ratios().overall)
    );
    Ok(())
}
