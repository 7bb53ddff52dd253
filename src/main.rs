//! Operational entry point.
//!
//! The conversation engine runs embedded in a transport adapter; this
//! binary covers the operational chores around the store:
//!
//!   askanon            validate configuration and open the store
//!   askanon backup     copy the store file into the backup directory
//!   askanon migrate <json|sqlite> <path>
//!                      copy the store into the other backend
//!   askanon stats      print the detailed statistics report

use askanon::config::Config;
use askanon::rules::DetailedStats;
use askanon::store::{BackendKind, QuestionStore};
use askanon::text;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askanon=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;
    let store = QuestionStore::open(config.backend, &config.db_path)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("check") => {
            tracing::info!(
                backend = config.backend.as_str(),
                path = %config.db_path.display(),
                questions = store.len(),
                admins = config.admin_ids.len(),
                "configuration and store are healthy"
            );
        }
        Some("backup") => {
            let path = store.backup(&config.backup_dir)?;
            println!("backup written to {}", path.display());
        }
        Some("migrate") => {
            let (kind, path) = match (args.get(1), args.get(2)) {
                (Some(kind), Some(path)) => (kind.parse::<BackendKind>()?, path),
                _ => return Err("usage: askanon migrate <json|sqlite> <path>".into()),
            };
            let dest = store.migrate_to(kind, path)?;
            println!(
                "migrated {} questions to {} store at {path}",
                dest.len(),
                kind.as_str()
            );
        }
        Some("stats") => {
            let all = store.list_all();
            println!("{}", text::detailed_stats(&DetailedStats::compute(&all)));
        }
        Some(other) => {
            return Err(format!("unknown command: {other}").into());
        }
    }

    Ok(())
}
