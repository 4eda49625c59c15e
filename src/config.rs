//! Runtime settings, read from flags with environment fallbacks.

use crate::application::gateway::GatewayConfig;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "CAMPAIGN_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// JSON file of users and campaigns loaded before the command runs.
    #[arg(long, env = "CAMPAIGN_SEED", global = true)]
    pub seed: Option<PathBuf>,

    /// Development enables synthetic charge references and the simulated processor.
    #[arg(long, env = "APP_ENV", value_enum, default_value_t = Environment::Development, global = true)]
    pub environment: Environment,

    /// ISO currency code for processor charges.
    #[arg(long, env = "PAYMENT_CURRENCY", default_value = "usd", global = true)]
    pub currency: String,

    /// Id of the user performing the command.
    #[arg(long, env = "CAMPAIGN_ACTOR", global = true)]
    pub actor: Option<uuid::Uuid>,

    /// Base URL of the payment processor API.
    #[cfg(feature = "gateway-http")]
    #[arg(long, env = "PROCESSOR_URL", global = true)]
    pub processor_url: Option<String>,

    #[cfg(feature = "gateway-http")]
    #[arg(long, env = "PROCESSOR_API_KEY", hide_env_values = true, global = true)]
    pub processor_api_key: Option<String>,
}

impl Settings {
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            currency: self.currency.to_lowercase(),
            synthetic_references: self.environment == Environment::Development,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn test_production_disables_synthetic_references() {
        let cli = Wrapper::parse_from(["test", "--environment", "production", "--currency", "EUR"]);
        let gateway = cli.settings.gateway();
        assert_eq!(gateway.currency, "eur");
        assert!(!gateway.synthetic_references);
    }

    #[test]
    fn test_development_is_default() {
        let cli = Wrapper::parse_from(["test"]);
        assert_eq!(cli.settings.environment, Environment::Development);
        assert!(cli.settings.gateway().synthetic_references);
    }
}
