//! Pgprobe CLI Entry Point
//!
//! One binary, four probes:
//! - `alive` - log in and report the server version
//! - `locks` - per-mode lock count metrics
//! - `bgwriter` - background-writer statistic metrics
//! - `query` - metrics from an arbitrary query
//!
//! The report goes to stdout; the severity becomes the process exit code
//! (ok=0, warning=1, critical=2, unknown=3). Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pgprobe::engine::{ConnectionSpec, DEFAULT_TIMEOUT_SECS};
use pgprobe::pgpass::{self, LookupKey};
use pgprobe::probe::{Probe, QueryOptions};

/// Pgprobe - PostgreSQL monitoring probes
#[derive(Parser)]
#[command(name = "pgprobe")]
#[command(about = "PostgreSQL monitoring probes with pgpass credential resolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection parameters shared by every probe
#[derive(Args, Debug, Clone)]
struct ConnectionArgs {
    /// Hostname to login to
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Database port
    #[arg(short = 'P', long, default_value_t = 5432)]
    port: u16,

    /// Database name
    #[arg(short = 'd', long, default_value = "postgres")]
    database: String,

    /// Postgres user
    #[arg(short = 'u', long, default_value = "postgres")]
    user: String,

    /// Postgres password; resolved from the pgpass file when omitted
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Pgpass file (overrides PGPASSFILE and ~/.pgpass)
    #[arg(short = 'f', long)]
    pgpass: Option<PathBuf>,

    /// Connection timeout (seconds)
    #[arg(short = 'T', long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl ConnectionArgs {
    /// Merge explicit inputs with pgpass resolution into a connection spec
    fn into_spec(self) -> ConnectionSpec {
        let password = self
            .password
            .clone()
            .or_else(|| {
                let key = LookupKey::new(&*self.host, self.port, &*self.database, &*self.user);
                pgpass::pgpass_path(self.pgpass.clone())
                    .and_then(|path| pgpass::resolve(&path, &key))
            })
            .unwrap_or_default();

        ConnectionSpec {
            host: self.host,
            port: self.port,
            database: self.database,
            user: self.user,
            password,
            connect_timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Attempt to log in and report the server version
    Alive {
        #[command(flatten)]
        conn: ConnectionArgs,
    },

    /// Collect per-mode database lock metrics
    Locks {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Metric naming scheme, text to prepend to $database.$mode
        #[arg(long, default_value = "postgresql")]
        scheme: String,
    },

    /// Collect background-writer statistic metrics
    Bgwriter {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Metric naming scheme, text to prepend to the counter name
        #[arg(long, default_value = "postgresql")]
        scheme: String,
    },

    /// Collect metrics from the results of an arbitrary query
    Query {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Database query to execute
        #[arg(short, long)]
        query: String,

        /// Count the number of tuples (rows) returned by the query
        #[arg(short = 't', long = "tuples")]
        count_tuples: bool,

        /// Emit every row as a data point instead of the first value only
        #[arg(short, long)]
        multirow: bool,

        /// Metric naming scheme, text to prepend to the metric
        #[arg(short, long, default_value = "postgres")]
        scheme: String,
    },
}

impl Commands {
    fn into_parts(self) -> (ConnectionArgs, Probe) {
        match self {
            Self::Alive { conn } => (conn, Probe::Alive),
            Self::Locks { conn, scheme } => (conn, Probe::Locks { scheme }),
            Self::Bgwriter { conn, scheme } => (conn, Probe::Bgwriter { scheme }),
            Self::Query { conn, query, count_tuples, multirow, scheme } => {
                (conn, Probe::Query(QueryOptions { sql: query, count_tuples, multirow, scheme }))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (conn, probe) = cli.command.into_parts();
    let spec = conn.into_spec();

    let report = probe.report(&spec).await;
    let rendered = report.render();
    if !rendered.is_empty() {
        println!("{rendered}");
    }

    std::process::exit(report.status.exit_code());
}
