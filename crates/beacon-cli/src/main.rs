// Beacon CLI - submit performance audits and wait for their reports

mod client;
mod watch;

use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use client::ApiClient;
use watch::{HttpProbe, WatchOutcome, Watcher};

/// Beacon - queued Lighthouse audit client
#[derive(Parser)]
#[command(name = "beacon")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the beacon server
    #[arg(long, global = true, default_value = "http://localhost:5001")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue an audit and print its job id and report URL
    Submit {
        /// URL to audit
        url: String,

        /// Device profile (mobile or desktop)
        #[arg(long, default_value = "mobile")]
        profile: String,
    },
    /// Check the lifecycle state of a queued audit
    Status {
        /// Job id returned at submission
        job_id: String,
    },
    /// Queue an audit and poll until its report is ready
    Watch {
        /// URL to audit
        url: String,

        /// Device profile (mobile or desktop)
        #[arg(long, default_value = "mobile")]
        profile: String,

        /// Seconds between existence probes
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

fn main() {
    let cli = Cli::parse();
    let client = ApiClient::new(cli.server);

    let result = match cli.command {
        Commands::Submit { url, profile } => handle_submit(&client, &url, &profile),
        Commands::Status { job_id } => handle_status(&client, &job_id),
        Commands::Watch {
            url,
            profile,
            interval,
        } => handle_watch(&client, &url, &profile, interval),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn handle_submit(client: &ApiClient, url: &str, profile: &str) -> anyhow::Result<()> {
    let queued = client.submit(url, profile)?;
    println!("{}", "Audit queued".green());
    println!("Job id:     {}", queued.job_id);
    println!("Report URL: {}", client.absolute_url(&queued.report_url));
    println!();
    println!("The report does not exist yet; check back with `beacon status`");
    println!("or use `beacon watch` to wait for it.");
    Ok(())
}

fn handle_status(client: &ApiClient, job_id: &str) -> anyhow::Result<()> {
    let status = client.status(job_id)?;
    match status.state.as_str() {
        "completed" => {
            println!("{}", "completed".green());
            if let Some(result) = status.result {
                println!("Report: {}", client.absolute_url(&result));
            }
        }
        "failed" => println!("{}", "failed".red()),
        state => println!("{}", state),
    }
    Ok(())
}

fn handle_watch(client: &ApiClient, url: &str, profile: &str, interval: u64) -> anyhow::Result<()> {
    let queued = client.submit(url, profile)?;
    println!("Audit queued as job {}", queued.job_id);
    println!("Generating report, this can take a while...");

    let watcher = Watcher::new(Duration::from_secs(interval));
    let probe = HttpProbe::new(client.base().to_string());

    match watcher.wait_until_ready(&queued.report_url, &probe) {
        WatchOutcome::Ready => {
            println!("{}", "Report ready!".green());
            println!("{}", client.absolute_url(&queued.report_url));
        }
        WatchOutcome::AlreadyWatching => {
            println!(
                "{}",
                "A watch for this report is already running".yellow()
            );
        }
    }
    Ok(())
}
