//! TutorHub CLI
//!
//! Command-line front end for booking tutoring sessions and reviewing
//! dashboards against a TutorHub service.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tutorhub_client::{HttpTutoringClient, SessionFilter};
use tutorhub_core::{
    compute_student_stats, compute_tutor_stats, normalize_availability, weekday_name,
    BookingRequest, BookingSession, Config, Credential, FileCredentialStore, GateOutcome, Role,
    SessionContext, SessionStatus, SessionType, UserIdentity,
};
use tutorhub_dashboard::{json::JsonGenerator, Dashboard, MarkdownGenerator};
use tracing_subscriber::EnvFilter;

/// TutorHub - tutoring session booking
///
/// Browse tutor availability, book sessions, move them through their
/// lifecycle and review tutor or student dashboards.
#[derive(Parser, Debug)]
#[command(name = "tutorhub")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: tutorhub.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Base URL of the tutoring service, overriding the config file
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Display offset from UTC in minutes, overriding the config file
    #[arg(long, value_name = "MINUTES", global = true, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Credential file, overriding the config file
    #[arg(long, value_name = "FILE", global = true)]
    credential_file: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a credential and the identity it belongs to
    Login {
        /// Bearer token issued by the service
        #[arg(long)]
        token: String,
        /// Token expiry (RFC 3339); read from the JWT `exp` claim when omitted
        #[arg(long, value_name = "TIMESTAMP")]
        expires_at: Option<DateTime<Utc>>,
        /// User identifier
        #[arg(long)]
        user_id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Contact email
        #[arg(long)]
        email: String,
        /// Whether you tutor or book sessions
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// Remove the stored credential and identity
    Logout,

    /// Show the signed-in user, optionally updating the cached profile
    Whoami {
        /// New display name to cache
        #[arg(long)]
        name: Option<String>,
        /// New contact email to cache
        #[arg(long)]
        email: Option<String>,
    },

    /// Show a tutor's weekly availability
    Availability {
        /// Tutor whose slots to show
        tutor_id: String,
        /// Print the normalized availability as JSON
        #[arg(long)]
        json: bool,
    },

    /// List sessions
    Sessions {
        /// Only sessions taught by this tutor
        #[arg(long)]
        tutor: Option<String>,
        /// Only sessions booked by this student
        #[arg(long)]
        student: Option<String>,
        /// Only sessions in this status
        #[arg(long)]
        status: Option<SessionStatus>,
    },

    /// Book an available slot
    Book {
        /// Tutor offering the slot
        #[arg(long)]
        tutor: String,
        /// Slot to book
        #[arg(long)]
        slot: String,
        /// Topic of the session
        #[arg(long)]
        subject: String,
        /// ONLINE or IN_PERSON
        #[arg(long = "type", value_name = "TYPE", default_value = "ONLINE")]
        session_type: SessionType,
        /// Meeting link or physical location
        #[arg(long)]
        location: String,
        /// Notes for the tutor
        #[arg(long)]
        notes: Option<String>,
    },

    /// Move a session to a new status
    Status {
        /// Session to update
        session_id: String,
        /// Requested status
        status: SessionStatus,
    },

    /// Show dashboard statistics
    Stats {
        /// User to compute statistics for (default: signed-in user)
        #[arg(long)]
        user: Option<String>,
        /// Perspective to compute (default: signed-in user's role)
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },

    /// Render a full dashboard
    Dashboard {
        /// User whose dashboard to render (default: signed-in user)
        #[arg(long)]
        user: Option<String>,
        /// Perspective to render (default: signed-in user's role)
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Tutor,
    Student,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Tutor => Self::Tutor,
            RoleArg::Student => Self::Student,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let offset = config.display_offset()?;
    let store = FileCredentialStore::new(config.credential_path());

    match args.command {
        Command::Login {
            token,
            expires_at,
            user_id,
            name,
            email,
            role,
        } => {
            let credential = match expires_at {
                Some(expiry) => Credential::new(token, expiry),
                None => Credential::from_jwt(token)?,
            };
            if !credential.is_valid_at(Utc::now()) {
                anyhow::bail!(
                    "Token expired at {}\n\nSuggestion: Request a new token from the service",
                    credential.expiry
                );
            }
            let identity = UserIdentity {
                id: user_id,
                name,
                email,
                role: role.into(),
            };
            let mut session = SessionContext::start(store)?;
            let expiry = credential.expiry;
            session.login(credential, Some(identity.clone()))?;
            println!(
                "Logged in as {} ({}) until {}",
                identity.name,
                identity.role,
                format_local(&expiry, offset)
            );
        }

        Command::Logout => {
            SessionContext::start(store)?.logout()?;
            println!("Logged out");
        }

        Command::Whoami { name, email } => {
            let mut session = SessionContext::start(store)?;
            let mut identity = session.identity().cloned();
            let (_, outcome) = session.authorize(Utc::now());
            if outcome == GateOutcome::Attached && (name.is_some() || email.is_some()) {
                let current = identity
                    .take()
                    .ok_or_else(|| anyhow::anyhow!("No cached identity to update"))?;
                let updated = UserIdentity {
                    name: name.unwrap_or(current.name),
                    email: email.unwrap_or(current.email),
                    ..current
                };
                session.remember_identity(updated.clone())?;
                identity = Some(updated);
            }
            match (outcome, identity) {
                (GateOutcome::Attached, Some(identity)) => {
                    println!("{} <{}>", identity.name, identity.email);
                    println!("  id:   {}", identity.id);
                    println!("  role: {}", identity.role);
                }
                (GateOutcome::Attached, None) => println!("Signed in (identity unknown)"),
                (GateOutcome::Evicted, _) => {
                    println!("Session expired; the stored credential was removed");
                }
                (GateOutcome::Anonymous, _) => println!("Not logged in"),
            }
        }

        Command::Availability { tutor_id, json } => {
            let client = connect(&config, store)?;
            let slots = client.get_availability(&tutor_id).await?;
            let normalized = normalize_availability(&slots, offset)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&normalized)?);
            } else if normalized.weekly_grid.is_empty() {
                println!("No open slots for {tutor_id}");
            } else {
                println!("Availability for {tutor_id} (UTC{offset}):");
                for (day, buckets) in normalized.weekly_grid.iter() {
                    if !buckets.is_empty() {
                        println!("  {:<10} {}", weekday_name(day), buckets.join(", "));
                    }
                }
                println!();
                for range in &normalized.readable_ranges {
                    println!("  - {range}");
                }
            }
        }

        Command::Sessions {
            tutor,
            student,
            status,
        } => {
            let client = connect(&config, store)?;
            let filter = SessionFilter {
                tutor_id: tutor,
                student_id: student,
                status,
            };
            let sessions = client.get_sessions(&filter).await?;
            if sessions.is_empty() {
                println!("No sessions found");
            }
            for session in &sessions {
                print_session(session, offset);
            }
        }

        Command::Book {
            tutor,
            slot,
            subject,
            session_type,
            location,
            notes,
        } => {
            let client = connect(&config, store)?;
            let student_id = client
                .identity()
                .await
                .map(|identity| identity.id)
                .ok_or_else(|| {
                    anyhow::anyhow!("Not logged in\n\nSuggestion: Run `tutorhub login` first")
                })?;

            let request = BookingRequest::new(slot, subject, session_type, location, notes)?;
            let slots = client.get_availability(&tutor).await?;
            let mut session = BookingSession::create(&request, &slots, &student_id)?;
            tracing::info!(session_id = %session.id, "Created provisional session");

            let confirmed = client.create_booking_session(&request).await?;
            session.reconcile(confirmed)?;
            println!("Booked:");
            print_session(&session, offset);
        }

        Command::Status { session_id, status } => {
            let client = connect(&config, store)?;
            let sessions = client.get_sessions(&SessionFilter::all()).await?;
            let session = sessions
                .iter()
                .find(|s| s.id == session_id)
                .ok_or_else(|| anyhow::anyhow!("Session '{session_id}' not found"))?;

            let updated = client.update_session_status(session, status).await?;
            println!("{} -> {}", session.status, updated.status);
            print_session(&updated, offset);
        }

        Command::Stats { user, role } => {
            let client = connect(&config, store)?;
            let (user_id, role) = resolve_subject(&client, user, role).await?;
            let sessions = client.get_sessions(&subject_filter(role, &user_id)).await?;

            let json = match role {
                Role::Tutor => {
                    serde_json::to_string_pretty(&compute_tutor_stats(&user_id, &sessions))?
                }
                Role::Student => {
                    serde_json::to_string_pretty(&compute_student_stats(&user_id, &sessions))?
                }
            };
            println!("{json}");
        }

        Command::Dashboard {
            user,
            role,
            format,
            output,
        } => {
            let client = connect(&config, store)?;
            let name = client.identity().await.map(|identity| identity.name);
            let (user_id, role) = resolve_subject(&client, user, role).await?;
            let name = name.unwrap_or_else(|| user_id.clone());
            let sessions = client.get_sessions(&subject_filter(role, &user_id)).await?;
            let now = Utc::now();

            let dashboard = match role {
                Role::Tutor => {
                    let slots = client.get_availability(&user_id).await?;
                    let availability = normalize_availability(&slots, offset)?;
                    Dashboard::for_tutor(&user_id, &name, &sessions, Some(availability), now)
                }
                Role::Student => Dashboard::for_student(&user_id, &name, &sessions, now),
            };

            write_dashboard(&dashboard, format, offset, output.as_deref())?;
        }
    }

    Ok(())
}

/// Loads the config file and applies command-line overrides.
fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref url) = args.api_url {
        config.api_base_url.clone_from(url);
    }
    if let Some(offset) = args.utc_offset {
        config.utc_offset_minutes = offset;
    }
    if let Some(ref path) = args.credential_file {
        config.credential_file.clone_from(path);
    }

    // Re-validate after overrides
    config.validate()?;
    tracing::debug!(
        api = %config.api_base_url,
        offset = config.utc_offset_minutes,
        "Configuration resolved"
    );
    Ok(config)
}

fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(Config::load_from_file(path)?)
        }
        None => Ok(Config::load()?),
    }
}

fn connect(config: &Config, store: FileCredentialStore) -> anyhow::Result<HttpTutoringClient> {
    let session = SessionContext::start(store)?;
    let client = HttpTutoringClient::from_config(config, session)?;
    tracing::debug!(base = %client.base_url(), "Client ready");
    Ok(client)
}

/// Picks the user and perspective, falling back to the cached identity.
async fn resolve_subject(
    client: &HttpTutoringClient,
    user: Option<String>,
    role: Option<RoleArg>,
) -> anyhow::Result<(String, Role)> {
    let identity = client.identity().await;
    let role = role
        .map(Role::from)
        .or_else(|| identity.as_ref().map(|identity| identity.role));
    let user = user.or_else(|| identity.map(|identity| identity.id));

    match (user, role) {
        (Some(user), Some(role)) => Ok((user, role)),
        _ => anyhow::bail!(
            "No user selected\n\nSuggestion: Run `tutorhub login` or pass --user and --role"
        ),
    }
}

fn subject_filter(role: Role, user_id: &str) -> SessionFilter {
    match role {
        Role::Tutor => SessionFilter::for_tutor(user_id),
        Role::Student => SessionFilter::for_student(user_id),
    }
}

fn write_dashboard(
    dashboard: &Dashboard,
    format: Format,
    offset: FixedOffset,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match (format, output) {
        (Format::Json, Some(path)) => {
            JsonGenerator::new(dashboard).write_to_file(path, true)?;
            println!("Dashboard written to {}", path.display());
        }
        (Format::Json, None) => println!("{}", JsonGenerator::new(dashboard).generate_pretty()?),
        (Format::Markdown, output) => {
            let markdown = MarkdownGenerator::new(dashboard).with_offset(offset).generate();
            match output {
                Some(path) => {
                    std::fs::write(path, markdown).map_err(|e| {
                        anyhow::anyhow!("Failed to write dashboard: {e}\n\nPath: {}", path.display())
                    })?;
                    println!("Dashboard written to {}", path.display());
                }
                None => print!("{markdown}"),
            }
        }
    }
    Ok(())
}

fn print_session(session: &BookingSession, offset: FixedOffset) {
    println!(
        "  {} [{}] {} with tutor {} / student {}",
        session.id, session.status, session.subject, session.tutor_id, session.student_id
    );
    println!(
        "    {} - {} ({}, {})",
        format_local(&session.start_time, offset),
        format_local(&session.end_time, offset),
        session.session_type,
        session.location_or_link
    );
}

fn format_local(dt: &DateTime<Utc>, offset: FixedOffset) -> String {
    dt.with_timezone(&offset).format("%a %Y-%m-%d %H:%M %:z").to_string()
}
