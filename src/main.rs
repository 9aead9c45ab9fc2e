// Entry point for the A-share data sync tool.
mod tushare {
    // Client for the Tushare data API.
    pub mod api_caller;
    // Response envelope for the Tushare data API.
    pub mod response;
}
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data models.
mod model;
// Code-list providers.
mod codes;
// The batched fetch-and-upsert engine.
mod pipeline {
    /// Batch accumulation and flush conditions.
    pub mod batch;
    /// The orchestrating unit loop.
    pub mod engine;
    /// Bounded retry around a single fetch.
    pub mod retry;
    /// Run statistics.
    pub mod stats;
    /// Pacing between provider calls.
    pub mod throttle;
}
// Data storage module.
mod store {
    /// Shared storage for the four bar tables.
    pub mod bars;
    /// Financial-indicator storage.
    pub mod fin_indicator;
    /// SQLite database interaction.
    pub mod sqlite;
    /// Stock master storage.
    pub mod stock_basic;
    /// Concept/industry index storage.
    pub mod ths_index;
    /// Concept-member storage.
    pub mod ths_member;
}
// Per-kind sync drivers.
mod sync {
    /// Stock master refresh.
    pub mod basic;
    /// Concept indexes and their members.
    pub mod concept;
    /// Whole-market daily bars.
    pub mod daily;
    /// ETF daily bars.
    pub mod etf;
    /// Financial indicators.
    pub mod financial;
    /// Index daily/weekly bars.
    pub mod index;
}
// module storing defaults
mod constants;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenv::dotenv;

use model::Result;
use pipeline::engine::SyncOptions;
use pipeline::stats::RunStats;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Contributing units accumulated before a storage flush
    #[arg(long, default_value_t = constants::DEFAULT_BATCH_THRESHOLD)]
    batch_threshold: usize,

    /// Seconds to sleep between provider calls (defaults per data kind)
    #[arg(long)]
    delay: Option<f64>,

    /// Calls between extended pauses (0 disables them)
    #[arg(long, default_value_t = constants::DEFAULT_PACING_BATCH_SIZE)]
    pacing_batch_size: usize,

    /// Fetch attempts per unit before it is recorded as failed
    #[arg(long, default_value_t = constants::DEFAULT_MAX_RETRIES)]
    max_retries: u32,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create every target table
    InitDb,
    /// Whole-market daily bars over a date range (YYYYMMDD)
    SyncDaily {
        start_date: String,
        end_date: String,
    },
    /// The latest completed trading day, whole market or per-code
    SyncToday {
        #[arg(long)]
        codes_file: Option<String>,
    },
    /// Major-index daily or weekly bars over a date range
    SyncIndex {
        start_date: String,
        end_date: String,
        #[arg(long)]
        weekly: bool,
        #[arg(long)]
        codes_file: Option<String>,
    },
    /// ETF daily bars over a date range
    SyncEtf {
        start_date: String,
        end_date: String,
    },
    /// Concept index definitions, then their member stocks
    SyncConcept,
    /// Per-period financial indicators over an announcement date range
    SyncFinancial {
        start_date: String,
        end_date: String,
        #[arg(long)]
        codes_file: Option<String>,
    },
    /// Refresh stock master data
    SyncBasic,
    /// Row counts per table
    Stats,
}

#[tokio::main]
// Main function entry point.
async fn main() -> ExitCode {
    dotenv().ok();

    env_logger::init();

    let args = Args::parse();

    let needs_token = !matches!(args.command, Commands::InitDb | Commands::Stats);
    if needs_token && std::env::var("tushare_token").is_err() {
        log::error!("environment variable 'tushare_token' not set");
        return ExitCode::FAILURE;
    }

    let conn = match store::sqlite::init_connection() {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("Error initializing database connection: {}", err);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        code = dispatch(args, conn) => code,
        _ = tokio::signal::ctrl_c() => {
            // Flushed batches are already committed; the idempotent upserts
            // make a re-run over the same range safe.
            log::error!("interrupted, exiting; re-run the same range to resume");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(args: Args, mut conn: rusqlite::Connection) -> ExitCode {
    let Args {
        command,
        batch_threshold,
        delay,
        pacing_batch_size,
        max_retries,
    } = args;
    let opts = |default_delay: Duration| SyncOptions {
        batch_threshold,
        delay: delay.map(Duration::from_secs_f64).unwrap_or(default_delay),
        pacing_batch_size,
        max_retries,
        retry_base_delay: constants::RETRY_BASE_DELAY,
    };

    match command {
        Commands::InitDb => match init_db(&conn) {
            Ok(()) => {
                log::info!("all tables created");
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("failed to create tables: {}", err);
                ExitCode::FAILURE
            }
        },

        Commands::SyncDaily {
            start_date,
            end_date,
        } => finish(
            sync::daily::sync_range(
                &mut conn,
                &start_date,
                &end_date,
                &opts(constants::DEFAULT_FETCH_DELAY),
            )
            .await,
        ),

        Commands::SyncToday { codes_file } => finish(
            sync::daily::sync_latest(
                &mut conn,
                codes_file.as_deref(),
                &opts(constants::DEFAULT_FETCH_DELAY),
            )
            .await,
        ),

        Commands::SyncIndex {
            start_date,
            end_date,
            weekly,
            codes_file,
        } => {
            let index_codes = match codes_file {
                Some(path) => match codes::read_codes_from_file(&path) {
                    Ok(codes) => codes,
                    Err(err) => {
                        log::error!("failed to read index codes: {}", err);
                        return ExitCode::FAILURE;
                    }
                },
                None => constants::MAJOR_INDEX_CODES
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            };
            finish(
                sync::index::sync_codes(
                    &mut conn,
                    &index_codes,
                    &start_date,
                    &end_date,
                    weekly,
                    &opts(constants::DEFAULT_FETCH_DELAY),
                )
                .await,
            )
        }

        Commands::SyncEtf {
            start_date,
            end_date,
        } => finish(
            sync::etf::sync_range(
                &mut conn,
                &start_date,
                &end_date,
                &opts(constants::DEFAULT_FETCH_DELAY),
            )
            .await,
        ),

        Commands::SyncConcept => {
            if let Err(err) = sync::concept::refresh_indexes(&mut conn).await {
                log::error!("failed to refresh index definitions: {}", err);
                return ExitCode::FAILURE;
            }
            finish(sync::concept::sync_members(&mut conn, &opts(constants::CONCEPT_FETCH_DELAY)).await)
        }

        Commands::SyncFinancial {
            start_date,
            end_date,
            codes_file,
        } => finish(
            sync::financial::sync_codes(
                &mut conn,
                codes_file.as_deref(),
                &start_date,
                &end_date,
                &opts(constants::FINANCIAL_FETCH_DELAY),
            )
            .await,
        ),

        Commands::SyncBasic => match sync::basic::refresh_stock_basic(&mut conn).await {
            Ok(written) => {
                log::info!("stock master refresh complete ({} rows)", written);
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("stock master refresh failed: {}", err);
                ExitCode::FAILURE
            }
        },

        Commands::Stats => match store::sqlite::table_counts(&conn) {
            Ok(counts) if counts.is_empty() => {
                log::warn!("no tables yet; run init-db first");
                ExitCode::SUCCESS
            }
            Ok(counts) => {
                for (table, rows) in counts {
                    log::info!("{}: {} rows", table, rows);
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                log::error!("failed to read table stats: {}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_db(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    use store::bars::BarTable;
    store::bars::create_table(conn, BarTable::Daily)?;
    store::bars::create_table(conn, BarTable::IndexDaily)?;
    store::bars::create_table(conn, BarTable::IndexWeekly)?;
    store::bars::create_table(conn, BarTable::EtfDaily)?;
    store::ths_index::create_table(conn)?;
    store::ths_member::create_table(conn)?;
    store::stock_basic::create_table(conn)?;
    store::fin_indicator::create_table(conn)?;
    Ok(())
}

// A run is considered successful when at least 80% of its batches landed;
// the engine itself never fails a run on fetch or flush errors.
fn finish(result: Result<RunStats>) -> ExitCode {
    match result {
        Ok(stats) => {
            if stats.batch_success_rate() >= constants::BATCH_SUCCESS_THRESHOLD {
                ExitCode::SUCCESS
            } else {
                log::error!(
                    "batch success rate {:.1}% is below the {:.0}% threshold",
                    stats.batch_success_rate() * 100.0,
                    constants::BATCH_SUCCESS_THRESHOLD * 100.0,
                );
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            log::error!("sync failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
