//! Command-line interface

use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

/// Stroke risk prediction API server
#[derive(Debug, Parser)]
#[command(name = "stroke-risk-api", version, about)]
pub struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(short, long, env = "STROKE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory containing the model artifacts
    #[arg(long)]
    pub models_dir: Option<String>,

    /// Load the model artifacts, print the load report and exit
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// Command-line flags override every other configuration layer
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(models_dir) = &self.models_dir {
            config.models.models_dir = models_dir.clone();
        }
    }
}
