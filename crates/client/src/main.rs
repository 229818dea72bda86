//! visitlog - admin and student client for visit check-ins.
//!
//! Admin subcommands manage organization tokens and student accounts against
//! the backend. `scan` reads camera frames from stdin (one line per frame)
//! and reports each presented code once.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use visitlog_client::admin::AdminConsole;
use visitlog_client::api::BackendApi;
use visitlog_client::config::ClientConfig;
use visitlog_client::decoder::ThreadedLineSource;
use visitlog_client::dispatcher::SubmissionDispatcher;
use visitlog_client::scanner::{spawn_frame_poller, Scanner};
use visitlog_client::session::{Credential, SessionContext};
use visitlog_core::student::NewStudent;

/// visitlog - visit check-in client
#[derive(Parser, Debug)]
#[command(name = "visitlog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend base URL (overrides BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Admin ===
    /// Generate an organization token not used by any registered organization
    GenerateToken,

    /// List registered organizations
    #[command(alias = "ls")]
    Companies,

    /// Register an organization under a fresh (or given) token
    AddCompany {
        /// Organization display name
        name: String,

        /// Use this token instead of generating one
        #[arg(long)]
        token: Option<String>,
    },

    /// Create a student account (needs the admin credential)
    AddStudent {
        name: String,
        username: String,
        password: String,
    },

    /// Persist the admin bearer credential to the credential file
    SaveCredential {
        /// Bearer token issued at admin login
        token: String,
    },

    // === Student ===
    /// Scan codes from stdin frames and report visits
    Scan {
        /// Identity reported with each visit (overrides STUDENT_ID)
        #[arg(long)]
        student_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visitlog_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let mut config = ClientConfig::from_env().context("Invalid client configuration")?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    tracing::debug!(backend_url = %config.backend_url, "Loaded client configuration");

    let api = BackendApi::with_timeout(&config.backend_url, config.request_timeout())
        .context("Failed to build HTTP client")?;

    match cli.command {
        Commands::GenerateToken => {
            let mut console = AdminConsole::new(api, load_session(&config).await?);
            // A stale registry only weakens the uniqueness check.
            let _ = console.refresh().await;
            let result = console.generate_token().map(|t| t.to_string());
            println!("{}", console.status());
            Ok(match result {
                Ok(token) => {
                    println!("{token}");
                    ExitCode::SUCCESS
                }
                Err(_) => ExitCode::FAILURE,
            })
        }
        Commands::Companies => {
            let mut console = AdminConsole::new(api, load_session(&config).await?);
            if console.refresh().await.is_err() {
                println!("{}", console.status());
                return Ok(ExitCode::FAILURE);
            }
            for org in console.organizations() {
                println!("{}\t{}\t{}", org.company_id, org.company_qr, org.company_name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::AddCompany { name, token } => {
            let mut console = AdminConsole::new(api, load_session(&config).await?);
            let _ = console.refresh().await;

            let issued = match token {
                Some(raw) => console.adopt_token(&raw).map(|t| t.to_string()),
                None => console.generate_token().map(|t| t.to_string()),
            };
            let Ok(issued) = issued else {
                println!("{}", console.status());
                return Ok(ExitCode::FAILURE);
            };
            println!("Token: {issued}");

            let result = console.add_company(&name).await;
            println!("{}", console.status());
            Ok(exit_code(result.is_ok()))
        }
        Commands::AddStudent {
            name,
            username,
            password,
        } => {
            let mut console = AdminConsole::new(api, load_session(&config).await?);
            let result = console
                .add_student(NewStudent {
                    name,
                    username,
                    password,
                })
                .await;
            println!("{}", console.status());
            Ok(exit_code(result.is_ok()))
        }
        Commands::SaveCredential { token } => {
            let credential = Credential::new(token).context("Invalid credential")?;
            credential
                .save(&config.credential_file)
                .await
                .with_context(|| {
                    format!("Failed to write {}", config.credential_file.display())
                })?;
            tracing::info!(path = %config.credential_file.display(), "Credential saved");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan { student_id } => {
            let student_id = student_id
                .or_else(|| config.student_id.clone())
                .context("No student id: pass --student-id or set STUDENT_ID")?;
            run_scanner(api, &config, student_id).await
        }
    }
}

/// Feed stdin frames to the scanner until EOF or Ctrl-C.
async fn run_scanner(api: BackendApi, config: &ClientConfig, student_id: String) -> Result<ExitCode> {
    let cancel = CancellationToken::new();

    let source = ThreadedLineSource::spawn(std::io::BufReader::new(std::io::stdin()))
        .context("Failed to start the stdin frame reader")?;
    let (frames, poller) = spawn_frame_poller(source, &config.scanner, cancel.clone());

    let dispatcher = Arc::new(SubmissionDispatcher::new(api));
    let scanner = Scanner::new(dispatcher, student_id, config.scanner.settle_delay);

    let mut status = scanner.subscribe();
    println!("{}", status.borrow_and_update().as_str());
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            println!("{}", status.borrow_and_update().as_str());
        }
    });

    let scan_cancel = cancel.clone();
    let scan = tokio::spawn(scanner.run(frames, scan_cancel));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, stopping scanner");
                cancel.cancel();
            }
        }
    });

    let report = scan.await.context("Scanner task failed")?;
    cancel.cancel();
    let _ = poller.await;
    let _ = printer.await;

    println!(
        "Frames: {}, visits reported: {} ({} ok, {} failed), unreadable frames: {}",
        report.frames, report.dispatched, report.succeeded, report.failed, report.decode_errors,
    );
    Ok(exit_code(report.failed == 0))
}

/// Admin credential from `BEARER_TOKEN`, else the credential file.
async fn load_session(config: &ClientConfig) -> Result<SessionContext> {
    let mut session = SessionContext::new();
    if let Some(student_id) = &config.student_id {
        session = session.with_student_id(student_id.as_str());
    }

    let credential = match &config.bearer_token {
        Some(raw) => Some(Credential::new(raw.as_str()).context("Invalid BEARER_TOKEN")?),
        None => Credential::load(&config.credential_file)
            .await
            .with_context(|| format!("Failed to read {}", config.credential_file.display()))?,
    };

    Ok(match credential {
        Some(credential) => session.with_credential(credential),
        None => session,
    })
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
