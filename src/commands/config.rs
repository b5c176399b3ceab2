/// `artifact-transform config` command implementation
use anyhow::{Context, Result};

use crate::cli::ConfigCommand;
use crate::config::TransformConfig;

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Example => {
            print!("{}", TransformConfig::example()?);
            Ok(())
        }
        ConfigCommand::Validate { common } => {
            let (_, path) = super::load_settings(&common)?;
            match path {
                Some(path) => println!("Configuration is valid: {}", path.display()),
                None => println!("No configuration file found, defaults are valid"),
            }
            Ok(())
        }
        ConfigCommand::Show { common } => {
            let (config, _) = super::load_settings(&common)?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", rendered);
            Ok(())
        }
    }
}
