use clap::Parser;
use rotating_backup::backup::backup_config::BackupConfig;
use rotating_backup::backup::result_error::error::Error;
use rotating_backup::backup::result_error::WithMsg;
use std::fs::File;
use std::path::PathBuf;
use std::process::exit;
use tracing::error;
use validator::Validate;

/// Archive files and folders, keep the last few copies
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long)]
    config: PathBuf,

    /// Run a single backup even if the config has a cron schedule
    #[arg(long)]
    once: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let res = File::open(&args.config)
        .map_err(Error::from)
        .and_then(|f| {
            serde_yml::from_reader::<_, BackupConfig>(f)
                .map_err(Error::from)
                .with_msg(format!("Parse YAML config failed: {:?}", &args.config))
        })
        .and_then(|bc| {
            bc.validate()
                .map_err(Error::from)
                .map(|_| bc)
                .with_msg(format!("Config validation failed: {:?}", &args.config))
        })
        .and_then(|bc| if args.once { bc.run_once() } else { bc.run() });

    if let Err(e) = res {
        error!("{e}");
        exit(1);
    }
}
