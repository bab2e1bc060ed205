//! `otactl config`: create and check configuration files

use anyhow::Result;
use zonal_ota_update::OtaConfig;

use super::{ConfigCommands, load_config};
use crate::error::CliError;
use crate::output;

pub async fn execute(cmd: &ConfigCommands, json: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                return Err(CliError::Validation(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ))
                .into());
            }
            let config = OtaConfig::default();
            config.save_to_path(path).await?;
            output::print_config(&config, Some(path), json);
        }
        ConfigCommands::Show { path } => {
            if !path.exists() {
                return Err(CliError::NotFound(path.display().to_string()).into());
            }
            let config = load_config(Some(path)).await?;
            output::print_config(&config, None, json);
        }
    }
    Ok(())
}
