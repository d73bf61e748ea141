//! Command-line arguments for the standalone gateway host.

use std::path::PathBuf;

use clap::Parser;
use oaibridge_core::ConfigSources;

/// Run the OpenAI-compatible gateway outside of a bot host.
#[derive(Debug, Parser)]
#[command(name = "oaibridge")]
#[command(about = "OpenAI-compatible chat completion gateway")]
#[command(version)]
pub struct Cli {
    /// Plugin configuration file (`[OpenAIAPI]` table)
    #[arg(short = 'c', long = "config", default_value = "config.toml")]
    pub config: PathBuf,

    /// Bot-wide configuration file (`[XYBot]` table with the admin list)
    #[arg(long = "main-config", default_value = "main_config.toml")]
    pub main_config: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn sources(&self) -> ConfigSources {
        ConfigSources {
            main_config: self.main_config.clone(),
            plugin_config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_host_layout() {
        let cli = Cli::parse_from(["oaibridge"]);
        assert_eq!(cli.sources(), ConfigSources::default());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_explicit_paths() {
        let cli = Cli::parse_from([
            "oaibridge",
            "--config",
            "/etc/oaibridge/config.toml",
            "--main-config",
            "/etc/bot/main_config.toml",
            "-v",
        ]);
        let sources = cli.sources();
        assert_eq!(sources.plugin_config, PathBuf::from("/etc/oaibridge/config.toml"));
        assert_eq!(sources.main_config, PathBuf::from("/etc/bot/main_config.toml"));
        assert!(cli.verbose);
    }
}
