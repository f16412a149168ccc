use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Snapshots tagged volumes and prunes old snapshots per volume.
#[derive(Parser, Debug)]
#[command(name = "backup-monkey", version, about = "Tag-driven volume snapshots with retention")]
pub struct Cli {
    /// Region to operate in (default: BACKUP_MONKEY_REGION / AWS_DEFAULT_REGION / us-east-1)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Number of managed snapshots kept per volume
    #[arg(long, global = true)]
    pub max_snapshots_per_volume: Option<usize>,

    /// Tag filter, repeatable: --tags name:value --tags env:[prod,staging]
    #[arg(long, num_args = 1, action = ArgAction::Append, global = true)]
    pub tags: Vec<String>,

    /// Treat --tags as a blacklist: snapshot every volume that matches none of them
    #[arg(long, global = true)]
    pub reverse_tags: bool,

    /// Account to operate in through role assumption (requires --cross-account-role)
    #[arg(long, global = true)]
    pub cross_account_number: Option<String>,

    /// Role to assume in --cross-account-number
    #[arg(long, global = true)]
    pub cross_account_role: Option<String>,

    /// Audit log file (default /var/log/backup_monkey.log)
    #[arg(long, global = true)]
    pub log_path: Option<PathBuf>,

    /// JSON account state used as the provider backend
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Retries for throttling/unavailable provider errors (0 = off)
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Keep going after a failed volume/snapshot and report all failures at the end
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    /// -v detailed format, -vv debug, -vvv/-vvvv backend info/debug
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Snapshot selected volumes, then remove old snapshots (default)
    Run {
        /// Only create snapshots
        #[arg(long, conflicts_with = "remove_only")]
        snapshot_only: bool,
        /// Only remove old snapshots
        #[arg(long)]
        remove_only: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the volumes the current tag filter selects
    Volumes {
        #[arg(long)]
        json: bool,
    },
    /// Retention dry run: show what would be kept and deleted
    Plan {
        #[arg(long)]
        json: bool,
    },
}
