mod audit;
mod cli;
mod config;
mod dispatch;
mod drift;
mod geodesy;
mod geofence;
mod locate;
mod model;
mod provider;
mod scheduler;
mod storage;
mod tick;
mod tzlookup;

use std::process;

use config::Config;
use storage::Storage;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let data_dir = match config.data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let storage = match Storage::new(data_dir) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
