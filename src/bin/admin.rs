//! CLI administration tool for url-shortener-pipeline.
//!
//! Inspects short URLs and analytics rows, issues bearer tokens, and performs
//! database checks without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Show one short URL record
//! cargo run --bin admin -- url show abc123
//!
//! # Show the latest analytics rows for a code
//! cargo run --bin admin -- analytics show abc123 --limit 20
//!
//! # Issue a bearer token for a user id
//! cargo run --bin admin -- token issue u1
//!
//! # Totals
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required for everything except `token issue`)
//! - `TOKEN_SIGNING_SECRET` (required for `token issue`)

use url_shortener_pipeline::config::mask_connection_string;
use url_shortener_pipeline::domain::repositories::{AnalyticsRepository, UrlRepository};
use url_shortener_pipeline::infrastructure::identity::HmacIdentityProvider;
use url_shortener_pipeline::infrastructure::persistence::{PgAnalyticsRepository, PgUrlRepository};
use url_shortener_pipeline::utils::time::format_rfc3339;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing url-shortener-pipeline.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect short URLs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Inspect analytics rows
    Analytics {
        #[command(subcommand)]
        action: AnalyticsAction,
    },

    /// Issue bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum UrlAction {
    /// Show a short URL record
    Show { code: String },
}

#[derive(Subcommand)]
enum AnalyticsAction {
    /// Show the most recent analytics rows for a code
    Show {
        code: String,

        /// Maximum number of rows
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token whose subject is the given user id
    Issue { subject: String },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url { action } => handle_url_action(action, &connect().await?).await?,
        Commands::Analytics { action } => {
            handle_analytics_action(action, &connect().await?).await?
        }
        Commands::Token { action } => handle_token_action(action)?,
        Commands::Stats => handle_stats(&connect().await?).await?,
        Commands::Db { action } => handle_db_action(action, &connect().await?).await?,
    }

    Ok(())
}

async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    PgPool::connect(&database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", mask_connection_string(&database_url)))
}

/// Displays one record with its click counter and ownership.
async fn handle_url_action(action: UrlAction, pool: &PgPool) -> Result<()> {
    let repo = PgUrlRepository::new(Arc::new(pool.clone()));

    match action {
        UrlAction::Show { code } => {
            println!("{}", "🔗 Short URL".bright_blue().bold());
            println!();

            let Some(record) = repo
                .find_by_code(&code)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
            else {
                println!("{}", format!("  No short URL with code '{}'", code).yellow());
                return Ok(());
            };

            let status = if record.is_expired() {
                "EXPIRED".red()
            } else {
                "ACTIVE".green()
            };

            println!("  Code:          {}", record.short_code.cyan());
            println!("  Destination:   {}", record.long_url.bright_white());
            println!(
                "  Owner:         {}",
                record.owner.as_deref().unwrap_or("(anonymous)").bright_black()
            );
            println!("  Status:        {}", status);
            println!(
                "  Expires:       {}",
                record
                    .expires_at
                    .map(format_rfc3339)
                    .unwrap_or_else(|| "never".to_string())
                    .bright_black()
            );
            println!("  Created:       {}", format_rfc3339(record.created_at).bright_black());
            println!(
                "  Clicks:        {}",
                record.click_count.to_string().bright_green().bold()
            );
            if let Some(last) = record.last_accessed {
                println!("  Last accessed: {}", format_rfc3339(last).bright_black());
            }
            println!();
        }
    }

    Ok(())
}

/// Lists analytics rows, newest first.
///
/// # Output Format
///
/// ```text
/// 📈 Analytics for abc123
///
///   ID    Event         Timestamp              Details
///   ─────────────────────────────────────────────────────────────
///   42    url_clicked   2025-03-01T12:00:00Z   curl/8.0
///   41    url_created   2025-03-01T11:59:58Z   https://example.com
/// ```
async fn handle_analytics_action(action: AnalyticsAction, pool: &PgPool) -> Result<()> {
    let repo = PgAnalyticsRepository::new(Arc::new(pool.clone()));

    match action {
        AnalyticsAction::Show { code, limit } => {
            println!("{}", format!("📈 Analytics for {}", code).bright_blue().bold());
            println!();

            let rows = repo
                .list_for_code(&code, limit)
                .await
                .map_err(|e| anyhow::anyhow!("Database error: {}", e))?;

            if rows.is_empty() {
                println!("{}", "  No analytics rows found".yellow());
                return Ok(());
            }

            println!(
                "  {:<6} {:<13} {:<22} {}",
                "ID".bright_white().bold(),
                "Event".bright_white().bold(),
                "Timestamp".bright_white().bold(),
                "Details".bright_white().bold()
            );
            println!("  {}", "─".repeat(75).bright_black());

            for row in &rows {
                let details = row
                    .long_url
                    .as_deref()
                    .or(row.user_agent.as_deref())
                    .unwrap_or("");

                println!(
                    "  {:<6} {:<13} {:<22} {}",
                    row.id.to_string().bright_black(),
                    row.event_type.as_str().cyan(),
                    format_rfc3339(row.timestamp).bright_black(),
                    details
                );
            }

            println!();
            println!("  Shown: {}", rows.len().to_string().bright_white().bold());
            println!();
        }
    }

    Ok(())
}

fn handle_token_action(action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Issue { subject } => {
            let secret = std::env::var("TOKEN_SIGNING_SECRET")
                .context("TOKEN_SIGNING_SECRET must be set")?;
            let provider = HmacIdentityProvider::new(&secret)
                .map_err(|e| anyhow::anyhow!("Invalid TOKEN_SIGNING_SECRET: {}", e))?;
            let token = provider.issue_token(&subject);

            println!("{}", "🔑 Bearer token".bright_blue().bold());
            println!();
            println!("  Subject: {}", subject.cyan());
            println!("  Token:   {}", token.bright_yellow().bold());
            println!();
            println!("{}", "Example:".bright_white());
            println!(
                "  curl -X PATCH -H \"Authorization: Bearer {}\" \\",
                token.bright_yellow()
            );
            println!("       -d '{{\"new_long_url\":\"https://example.com\"}}' \\");
            println!("       http://localhost:3000/api/urls/<code>");
            println!();
        }
    }

    Ok(())
}

/// Displays system statistics.
///
/// Shows:
/// - Total number of short URLs
/// - Sum of click counters
/// - Analytics rows per event type
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let urls_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
        .fetch_one(pool)
        .await?;

    let clicks_count: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(click_count), 0)::BIGINT FROM urls")
            .fetch_one(pool)
            .await?;

    let per_event: Vec<(String, i64)> = sqlx::query_as(
        "SELECT event_type, COUNT(*) FROM analytics GROUP BY event_type ORDER BY event_type",
    )
    .fetch_all(pool)
    .await?;

    println!(
        "  Short URLs:    {}",
        urls_count.to_string().bright_green().bold()
    );
    println!(
        "  Clicks:        {}",
        clicks_count.to_string().bright_green().bold()
    );
    for (event_type, count) in per_event {
        println!(
            "  {:<14} {}",
            format!("{}:", event_type),
            count.to_string().bright_green().bold()
        );
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let applied: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
                    .fetch_one(pool)
                    .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Migrations: {}", applied.to_string().bright_white());
            println!();
        }
    }

    Ok(())
}
