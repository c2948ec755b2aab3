//! Prints the time reported by an NTP server.
//!
//! ```
//! cargo run --example ntpdate -- -s us.pool.ntp.org
//! ```
//!
//! Options:
//! - `-s`/`--server` - server host name or address (default: `us.pool.ntp.org`)
//! - `-p`/`--port` - server port (default: `123`)
//! - `-t`/`--timeout` - seconds to wait for the reply (default: `3`)
//! - `--strict` - reject Kiss-o'-Death and malformed replies
//! - `--utc` - print UTC instead of local time
//! - `-v`/`--verbose` - dump the reply packet
use ntp_query::{Config, NtpClient};

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

const DEFAULT_SERVER: &str = "us.pool.ntp.org";

#[derive(Parser)]
#[command(name = "ntpdate")]
#[command(version)]
struct Cli {
    /// NTP server hostname
    #[arg(short, long, default_value = DEFAULT_SERVER)]
    server: String,

    /// NTP server port
    #[arg(short, long, default_value_t = ntp_query::NTP_PORT)]
    port: u16,

    /// Reply timeout in seconds
    #[arg(short, long, default_value_t = 3)]
    timeout: u64,

    /// Reject Kiss-o'-Death and malformed replies
    #[arg(long)]
    strict: bool,

    /// Print UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// Log the exchange
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("Unable to set up logging: {}", e);
    }

    let config = Config::default()
        .timeout(Duration::from_secs(cli.timeout))
        .strict(cli.strict);
    let client = NtpClient::with_config(config);

    let result = match client.query((cli.server.as_str(), cli.port)) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("ERROR querying {}: {}", cli.server, err);
            return ExitCode::FAILURE;
        }
    };

    let time = if cli.utc {
        result.utc_time()
    } else {
        result.local_time()
    };

    match result.as_chrono_datetime_utc() {
        Ok(datetime) => println!("Time: {}", datetime.to_rfc2822()),
        Err(err) => eprintln!("ERROR: {}", err),
    }
    println!("{}", time);

    ExitCode::SUCCESS
}
