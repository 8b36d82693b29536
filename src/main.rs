//! AppVol entry point
//!
//! Parses the CLI, sets up file logging, then supervises the shell:
//! `app::run` returning `EXIT_CODE_RESTART` means the settings dialog saved
//! new bindings and the shell should come back up with them.

#[cfg(windows)]
mod windows_main {
    use anyhow::Result;
    use appvol::config::ConfigStore;
    use appvol::constants::EXIT_CODE_RESTART;
    use clap::Parser;
    use log::info;
    use std::fs;
    use std::path::PathBuf;

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    #[derive(Parser)]
    #[command(
        name = "appvol",
        version,
        about = "Control the focused application's volume with global hotkeys"
    )]
    struct Cli {
        /// Config file path (default: <config_dir>/appvol/config.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log file path (default: <local_data_dir>/appvol/appvol.log)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    }

    fn default_log_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("appvol")
            .join("appvol.log")
    }

    /// Append to the log file, falling back to stderr when it cannot be
    /// opened (e.g. a read-only profile directory).
    fn init_logging(cli: &Cli) {
        let level = if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        let path = cli.log_file.clone().unwrap_or_else(default_log_path);

        let mut builder = env_logger::Builder::from_default_env();
        builder.filter_level(level);

        let file = path
            .parent()
            .map(|parent| fs::create_dir_all(parent))
            .transpose()
            .and_then(|_| fs::OpenOptions::new().create(true).append(true).open(&path));
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!(
                    "appvol: cannot open log file {}: {}; logging to stderr",
                    path.display(),
                    e
                );
            }
        }
        builder.init();
    }

    pub fn main() -> Result<()> {
        let cli = Cli::parse();
        init_logging(&cli);

        let config_path = cli.config.clone().unwrap_or_else(ConfigStore::default_path);
        info!("Starting AppVol v{}", VERSION);
        info!("Config file: {}", config_path.display());

        loop {
            let code = appvol::app::run(config_path.clone())?;
            if code == EXIT_CODE_RESTART {
                info!("Restart requested, reloading with new settings");
                continue;
            }
            info!("AppVol exiting with code {}", code);
            std::process::exit(code);
        }
    }
}

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    windows_main::main()
}

#[cfg(not(windows))]
fn main() {
    eprintln!("appvol is a Windows application; this platform only runs its tests.");
    std::process::exit(1);
}
