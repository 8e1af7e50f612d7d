//! Config commands

use crate::config::Config;
use crate::ConfigCommands;
use anyhow::{bail, Context, Result};

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> Result<bool> {
    match action {
        ConfigCommands::Init => {
            let path = Config::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile).unwrap_or_default();
            set(&mut config, &key, &value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Show => {
            let config = Config::load(profile)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(true)
}

fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "default_format" => config.default_format = Some(value.to_string()),
        "cache_capacity" => {
            config.compiler.cache_capacity = value.parse().context("cache_capacity must be an integer")?
        }
        "benchmark_iterations" => {
            config.compiler.benchmark_iterations =
                value.parse().context("benchmark_iterations must be an integer")?
        }
        "slow_compile_ms" => {
            config.compiler.slow_compile_ms = value.parse().context("slow_compile_ms must be an integer")?
        }
        _ => bail!("Unknown config key: {}", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_keys() {
        let mut config = Config::default();
        set(&mut config, "cache_capacity", "8").unwrap();
        set(&mut config, "default_format", "json").unwrap();
        assert_eq!(config.compiler.cache_capacity, 8);
        assert_eq!(config.default_format.as_deref(), Some("json"));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();
        assert!(set(&mut config, "api_url", "x").is_err());
        assert!(set(&mut config, "cache_capacity", "lots").is_err());
    }
}
