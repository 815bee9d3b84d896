#![warn(clippy::pedantic, rust_2018_idioms)]

mod cache;
mod database;
mod grade;
mod history;
mod lookup;
mod rankings;
mod read_dir;
mod record;
mod report;
mod rows;
mod stats;
mod time;
mod util;

use crate::cache::GradeCache;
use crate::database::Database;
use crate::rankings::{Direction, SortKey};
use crate::read_dir::DataKind;
use crate::report::{HistoryQuery, ResultFilter};
use crate::stats::DEFAULT_EDGE_CUTOFF;
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ats-ledger")]
#[command(about = "Grades daily spread predictions against final scores", long_about = None)]
struct Cli {
    /// Directory holding predictions_*, results_*, final_scores_* and rankings.json
    #[arg(long, env = "ATS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Reuse graded dates whose files have not changed
    #[arg(long, global = true)]
    cache: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-date summaries, newest first
    Daily {
        /// Only this date
        #[arg(long)]
        date: Option<String>,
    },
    /// Lifetime summary over every graded date
    Lifetime {
        /// Probability edge a pick must exceed for the edge record
        #[arg(long, default_value_t = DEFAULT_EDGE_CUTOFF)]
        edge: f64,
    },
    /// Summaries grouped by month
    Monthly,
    /// Graded games for one final-score date
    History {
        #[arg(long)]
        date: Option<String>,
        /// Minimum probability edge, in percent, for the stats strip
        #[arg(long, default_value_t = 0.0)]
        edge_min: f64,
        /// all, wins or losses
        #[arg(long, default_value = "all")]
        filter: ResultFilter,
        /// Case-insensitive team search
        #[arg(long)]
        search: Option<String>,
    },
    /// Running unit total by ISO week
    Cumulative,
    /// Picks for the latest prediction date
    Slate,
    /// Power rankings snapshot
    Rankings {
        /// rank, team, conference, record, adj_oe, adj_de, adj_margin, adj_tempo, edge_index
        #[arg(long)]
        sort: Option<SortKey>,
        #[arg(long, conflicts_with = "desc")]
        asc: bool,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        conference: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let dir = cli.data_dir.clone().unwrap_or_else(read_dir::default_data_dir);
    let database = Database::load(&dir)?;
    let today = time::today();
    info!(dir = %dir.display(), %today, "opened data directory");

    let mut cache = if cli.cache {
        match GradeCache::open(database.dir()) {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!(%err, "grade cache unavailable");
                None
            }
        }
    } else {
        None
    };

    match cli.command {
        Commands::Daily { date } => {
            let dates: Vec<&str> = match &date {
                Some(date) => vec![date.as_str()],
                None => database.metric_dates(&today),
            };
            let graded = database.grade_dates(&dates, cache.as_mut())?;
            let summaries = stats::daily(&graded, DEFAULT_EDGE_CUTOFF);
            if cli.json {
                print_json(&summaries)?;
            } else if summaries.is_empty() {
                println!("No prediction data available.");
            } else {
                for summary in &summaries {
                    println!("{}", report::render_summary(summary));
                }
            }
        }
        Commands::Lifetime { edge } => {
            let dates = database.metric_dates(&today);
            let graded = database.grade_dates(&dates, cache.as_mut())?;
            let summary = stats::lifetime(&graded, edge);
            if cli.json {
                print_json(&summary)?;
            } else {
                print!("{}", report::render_lifetime(&summary));
            }
        }
        Commands::Monthly => {
            let dates = database.metric_dates(&today);
            let graded = database.grade_dates(&dates, cache.as_mut())?;
            let summaries = stats::monthly(&graded, DEFAULT_EDGE_CUTOFF);
            if cli.json {
                print_json(&summaries)?;
            } else {
                for summary in &summaries {
                    println!("{}", report::render_summary(summary));
                }
            }
        }
        Commands::History {
            date,
            edge_min,
            filter,
            search,
        } => {
            let query = HistoryQuery {
                date,
                edge_min,
                filter,
                search,
            };
            match report::history_view(&database, &today, &query)? {
                Some(view) if cli.json => print_json(&view)?,
                Some(view) => print!("{}", report::render_history(&view)),
                None => println!("No historical data available."),
            }
        }
        Commands::Cumulative => {
            let dates = database.final_dates_before(&today);
            let graded = database.grade_dates(&dates, cache.as_mut())?;
            let points = stats::cumulative_units(&graded);
            if cli.json {
                print_json(&points)?;
            } else {
                print!("{}", report::render_cumulative(&points));
            }
        }
        Commands::Slate => match database.latest(DataKind::Predictions) {
            Some(date) => {
                let view = report::slate(date, &database.predictions(date)?);
                if cli.json {
                    print_json(&view)?;
                } else {
                    print!("{}", report::render_slate(&view));
                }
            }
            None => println!("No games found."),
        },
        Commands::Rankings {
            sort,
            asc,
            desc,
            search,
            conference,
        } => {
            let snapshot = match database.rankings()? {
                Some(snapshot) => snapshot,
                None => {
                    println!("No rankings available.");
                    return Ok(());
                }
            };
            let mut teams =
                rankings::filter(&snapshot, search.as_deref(), conference.as_deref());
            if let Some(key) = sort {
                let direction = if asc {
                    Direction::Asc
                } else if desc {
                    Direction::Desc
                } else {
                    key.default_direction()
                };
                rankings::sort(&mut teams, key, direction);
            }
            if cli.json {
                print_json(&teams)?;
            } else {
                println!(
                    "{} (season {}) as of {}; conferences: {}",
                    snapshot.generated_at,
                    snapshot
                        .season
                        .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    time::display_date(&snapshot.as_of_date),
                    rankings::conferences(&snapshot).join(", "),
                );
                print!("{}", report::render_rankings(&teams));
            }
        }
    }

    Ok(())
}
