use anyhow::{Context, Result, bail};
use paycontrol_core::MissingContractPolicy;
use paycontrol_service::{BudgetSerialization, ServiceOptions};

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Absent means the process keeps everything in memory.
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub http_addr: String,
    pub auth_secret: String,
    pub options: ServiceOptions,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(default_http_addr: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        let redis_url = non_empty("REDIS_URL");
        let http_addr = non_empty("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());
        let auth_secret = non_empty("AUTH_SECRET").context("AUTH_SECRET is required")?;

        let budget_serialization = match non_empty("BUDGET_SERIALIZATION") {
            Some(value) => parse_budget_serialization(&value)?,
            None => BudgetSerialization::default(),
        };
        let missing_contract_policy = match non_empty("MISSING_CONTRACT_POLICY") {
            Some(value) => parse_missing_contract_policy(&value)?,
            None => MissingContractPolicy::default(),
        };

        Ok(Self {
            database_url,
            redis_url,
            http_addr,
            auth_secret,
            options: ServiceOptions {
                budget_serialization,
                missing_contract_policy,
            },
        })
    }
}

fn parse_budget_serialization(value: &str) -> Result<BudgetSerialization> {
    match value.trim().to_ascii_lowercase().as_str() {
        "per_contract" => Ok(BudgetSerialization::PerContract),
        "disabled" => Ok(BudgetSerialization::Disabled),
        other => bail!("BUDGET_SERIALIZATION must be per_contract or disabled, got '{other}'"),
    }
}

fn parse_missing_contract_policy(value: &str) -> Result<MissingContractPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reject" => Ok(MissingContractPolicy::Reject),
        "skip" => Ok(MissingContractPolicy::SkipEnforcement),
        other => bail!("MISSING_CONTRACT_POLICY must be reject or skip, got '{other}'"),
    }
}
