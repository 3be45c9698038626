use anyhow::Result;
use appicon_raster::Capability;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use validator::Validate;

use crate::config::{ConfigPath, IconConfig};
use crate::generator::{Outcome, generate};

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// The project root that asset paths are relative to (defaults to the
    /// current directory)
    #[clap(long)]
    pub root: Option<PathBuf>,

    /// An explicit configuration file, relative to the root (defaults to
    /// appicon.toml in the root when present)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Shrink foreground outputs into the adaptive icon safe zone
    #[clap(long, num_args = 0)]
    pub pad_foreground: bool,
}

impl GenerateArgs {
    /// Build the effective configuration for this invocation.
    pub fn load_config(&self) -> Result<IconConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };

        let config_path = match &self.config {
            Some(path) => Some(ConfigPath::new(root.join(path))),
            None => ConfigPath::from_dir(&root),
        };

        let mut config = match config_path {
            Some(path) => {
                debug!("Loading config from {}", path);
                path.load()?
            }
            None => {
                debug!("No config file found, using defaults");
                IconConfig::default()
            }
        };

        if self.pad_foreground {
            config = config.pad_foreground();
        }

        Ok(config.resolve(root))
    }
}

pub fn run(args: GenerateArgs) -> ExitCode {
    run_with_output(args, &mut std::io::stdout().lock())
}

/// Like [`run`], but console messages go to the given writer.
pub fn run_with_output(args: GenerateArgs, out: &mut dyn Write) -> ExitCode {
    let config = match args.load_config() {
        Ok(config) => config,
        Err(error) => {
            error!("Failed to load config: {:?}", error);
            return ExitCode::FAILURE;
        }
    };

    match config.validate() {
        Err(err) => {
            error!(error = ?err, "Failed to validate config");
            return ExitCode::FAILURE;
        }
        _ => debug!("Validated config: {:#?}", &config),
    };

    let capability = Capability::detect();
    debug!(?capability, "Resolved rendering capability");

    match generate(&config, &capability, out) {
        Ok(Outcome::Generated(_)) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = ?err, "Failed to generate icons");
            ExitCode::FAILURE
        }
    }
}
