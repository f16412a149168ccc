use anyhow::Result;
use clap::Parser;
use log::error;

mod cli;
mod cmd_plan;
mod cmd_run;
mod cmd_volumes;
mod util;

fn main() {
    let cli = cli::Cli::parse();

    if let Err(e) = backup_monkey::logging::init(cli.verbose) {
        eprintln!("error: {:#}", e);
    }

    if let Err(e) = run(cli) {
        // critical: логируем и выходим с кодом 1
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: cli::Cli) -> Result<()> {
    let cfg = util::config_from(&cli);
    let audit = util::open_audit(&cfg)?;
    util::validate(&cfg, audit.as_ref())?;

    match cli.cmd {
        None => cmd_run::exec(&cfg, audit, false, false, false),

        Some(cli::Cmd::Run { snapshot_only, remove_only, json }) =>
            cmd_run::exec(&cfg, audit, snapshot_only, remove_only, json),

        Some(cli::Cmd::Volumes { json }) =>
            cmd_volumes::exec(&cfg, audit, json),

        Some(cli::Cmd::Plan { json }) =>
            cmd_plan::exec(&cfg, audit, json),
    }
}
