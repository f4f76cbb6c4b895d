use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use signwatch_alert::{DiscordNotifier, Notifier, TelegramNotifier};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub networks: Vec<Network>,
    #[serde(default)]
    pub notifiers: NotifiersConfig,
    #[serde(default)]
    pub health: HealthConfig,
    pub logs_path: Option<PathBuf>,
    pub logs_enabled: Option<bool>,
    pub log_level: Option<String>,
}

/// A monitored chain. Immutable once loaded.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Network {
    pub chain_id: String,
    pub name: String,
    pub rpcs: Vec<String>,
    pub interval_mins: u64,
    /// Minutes without a new block before the chain counts as stalled, 0 disables
    #[serde(default)]
    pub stall_time_mins: u64,
    /// Deliver rpc-health alerts for this network
    #[serde(default = "default_true")]
    pub rpc_alerts: bool,
    /// Number of recent blocks inspected per poll
    pub back_check: usize,
    /// Misses tolerated inside the back-check window
    pub alert_threshold: usize,
    pub validators: Vec<Validator>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Validator {
    pub moniker: String,
    /// Consensus address as it appears in commit signatures
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NotifiersConfig {
    pub telegram: Option<TelegramConfig>,
    pub discord: Option<DiscordConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramConfig {
    pub key: String,
    pub chat: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DiscordConfig {
    pub webhook: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HealthConfig {
    /// Port of the local health endpoint, 0 disables it
    #[serde(default)]
    pub port: u16,
    /// Minutes between checks of `nodes`, 0 disables them
    #[serde(default)]
    pub interval_mins: u64,
    /// Health urls of other signwatch instances
    #[serde(default)]
    pub nodes: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Network {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_mins * 60)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_time_mins * 60)
    }

    fn validate(&self) -> Result<()> {
        if self.chain_id.trim().is_empty() {
            bail!("chain_id is empty");
        }
        if self.rpcs.is_empty() {
            bail!("no rpc endpoints configured");
        }
        if self.interval_mins == 0 {
            bail!("interval_mins must be greater than 0");
        }
        if self.back_check == 0 {
            bail!("back_check must be greater than 0");
        }
        if self.alert_threshold >= self.back_check {
            bail!(
                "alert_threshold ({}) must be lower than back_check ({})",
                self.alert_threshold,
                self.back_check
            );
        }
        if self.validators.is_empty() {
            bail!("no validators configured");
        }
        for validator in &self.validators {
            if validator.address.trim().is_empty() {
                bail!("validator {:?} has an empty address", validator.moniker);
            }
        }
        Ok(())
    }

    /// Things worth a warning at startup but not worth refusing to run.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.stall_time_mins {
            0 => warnings.push(format!("stall check for {} is disabled", self.chain_id)),
            1 => warnings.push(format!(
                "stall time for {} is set to 1 minute, this may cause more frequent false alerts",
                self.chain_id
            )),
            _ => {}
        }
        if !self.rpc_alerts {
            warnings.push(format!("rpc alerts for {} are disabled", self.chain_id));
        }
        warnings
    }
}

impl Config {
    pub fn from_filepath(path: &Path) -> Result<Config> {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let mut config: Config = serde_json::from_reader(file)
            .context("Failed to parse config file")?;

        if let Some(logs_path_buf) = config.logs_path {
            let config_dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            config.logs_path = Some(to_absolute_path(config_dir, logs_path_buf.as_path())?);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            bail!("no networks configured");
        }
        for network in &self.networks {
            network
                .validate()
                .with_context(|| format!("invalid network {:?}", network.name))?;
        }
        if self.health.interval_mins > 0 && self.health.nodes.is_empty() {
            bail!("health checks are enabled but no health nodes are configured");
        }
        Ok(())
    }

    /// Write a sample config to `path`. Never overwrites.
    pub fn write_template(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create config file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &Config::template())
            .context("Failed to write config template")?;
        Ok(())
    }

    pub fn template() -> Config {
        Config {
            networks: vec![Network {
                chain_id: "cosmoshub-4".to_string(),
                name: "Cosmos Hub".to_string(),
                rpcs: vec!["https://rpc.cosmos.directory/cosmoshub".to_string()],
                interval_mins: 15,
                stall_time_mins: 30,
                rpc_alerts: true,
                back_check: 10,
                alert_threshold: 5,
                validators: vec![Validator {
                    moniker: "my-validator".to_string(),
                    address: "0000000000000000000000000000000000000000".to_string(),
                }],
            }],
            notifiers: NotifiersConfig {
                telegram: Some(TelegramConfig::default()),
                discord: Some(DiscordConfig::default()),
            },
            health: HealthConfig {
                port: 8080,
                interval_mins: 0,
                nodes: vec![],
            },
            logs_path: None,
            logs_enabled: Some(false),
            log_level: Some("info".to_string()),
        }
    }

    pub fn validator_count(&self) -> usize {
        self.networks.iter().map(|n| n.validators.len()).sum()
    }

    /// Notifiers with credentials filled in. Blank entries are skipped.
    pub fn build_notifiers(&self, client: &reqwest::Client) -> Vec<Arc<dyn Notifier>> {
        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
        if let Some(telegram) = &self.notifiers.telegram {
            if !telegram.key.is_empty() && !telegram.chat.is_empty() {
                notifiers.push(Arc::new(TelegramNotifier::new(
                    client.clone(),
                    telegram.key.clone(),
                    telegram.chat.clone(),
                )));
            }
        }
        if let Some(discord) = &self.notifiers.discord {
            if !discord.webhook.is_empty() {
                notifiers.push(Arc::new(DiscordNotifier::new(
                    client.clone(),
                    discord.webhook.clone(),
                )));
            }
        }
        notifiers
    }
}

pub fn to_absolute_path<P: AsRef<Path>>(base_dir: P, relative_path: P) -> Result<PathBuf> {
    let path = relative_path.as_ref();
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let base_dir = base_dir.as_ref().canonicalize()?;
    Ok(base_dir.join(path))
}
