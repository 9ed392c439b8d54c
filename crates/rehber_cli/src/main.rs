//! Operator commands for a Rehber database.
//!
//! # Commands
//!
//! - `bootstrap-admin` - create the first admin account
//! - `audit` - list one-sided cross references, optionally repairing them
//! - `version` - print the core version and a linkage probe

use std::io::BufRead;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rehber_core::repo::consistency_repo::SqliteConsistencyRepository;
use rehber_core::repo::expert_repo::SqliteExpertRepository;
use rehber_core::repo::family_repo::SqliteFamilyRepository;
use rehber_core::repo::identity_repo::SqliteIdentityRepository;
use rehber_core::service::account_service::AccountService;
use rehber_core::service::consistency_service::ConsistencyService;

/// Administration tool for the Rehber case service.
#[derive(Parser)]
#[command(name = "rehber")]
#[command(about = "Administration tool for the Rehber case service", long_about = None)]
struct Cli {
    /// Log level for stderr output
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an admin account.
    ///
    /// Needed once per installation; admins create every other account.
    /// The password is read from `REHBER_ADMIN_PASSWORD`, or from the first
    /// line of stdin with `--password-stdin`.
    #[command(name = "bootstrap-admin")]
    BootstrapAdmin {
        /// SQLite database file
        #[arg(long)]
        db: String,
        #[arg(long)]
        email: String,
        /// Read the password from stdin instead of the environment
        #[arg(long)]
        password_stdin: bool,
    },

    /// Scan for one-sided references between records.
    Audit {
        /// SQLite database file
        #[arg(long)]
        db: String,
        /// Apply fixes and report what remains
        #[arg(long)]
        repair: bool,
    },

    /// Print the core version.
    Version,
}

const ADMIN_PASSWORD_ENV: &str = "REHBER_ADMIN_PASSWORD";

/// Strips the line ending from a password read from stdin.
fn password_line(line: &str) -> Result<String> {
    let password = line.trim_end_matches(['\n', '\r']);
    if password.is_empty() {
        bail!("no password on stdin");
    }
    Ok(password.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = rehber_core::init_logging(&cli.log_level, None) {
        eprintln!("rehber: logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("rehber: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::BootstrapAdmin {
            db,
            email,
            password_stdin,
        } => {
            let password = if password_stdin {
                let mut line = String::new();
                std::io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .context("reading password from stdin")?;
                password_line(&line)?
            } else {
                std::env::var(ADMIN_PASSWORD_ENV)
                    .with_context(|| format!("{ADMIN_PASSWORD_ENV} is not set"))?
            };
            let conn = rehber_core::open_db(&db).with_context(|| format!("opening {db}"))?;
            let accounts = AccountService::new(
                SqliteIdentityRepository::new(&conn),
                SqliteExpertRepository::new(&conn),
                SqliteFamilyRepository::new(&conn),
            );
            let admin = accounts
                .bootstrap_admin(&email, &password)
                .context("creating admin account")?;
            info!("event=bootstrap_admin module=cli status=ok uid={}", admin.uid);
            println!("admin uid={} email={}", admin.uid, admin.email);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Audit { db, repair } => {
            let conn = rehber_core::open_db(&db).with_context(|| format!("opening {db}"))?;
            let service = ConsistencyService::new(SqliteConsistencyRepository::new(&conn));
            let remaining = if repair {
                let report = service.repair().context("repairing references")?;
                println!("fixed={}", report.fixed.len());
                for fixed in &report.fixed {
                    println!("fixed: {fixed}");
                }
                report.remaining
            } else {
                service.audit().context("scanning references")?
            };
            for issue in &remaining {
                println!("{issue}");
            }
            println!("remaining={}", remaining.len());
            Ok(if remaining.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Version => {
            println!("rehber_core ping={}", rehber_core::ping());
            println!("rehber_core version={}", rehber_core::core_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}
