use anyhow::Context;
use serde::Deserialize;

use crate::users::password::{DEFAULT_COST, MAX_COST, MIN_COST};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown APP_ENV {other:?}"),
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: Environment,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't have to touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(raw) => Environment::parse(&raw)?,
            None => Environment::Development,
        };

        let url_key = if env.is_development() {
            "DATABASE_URL_DEV"
        } else {
            "DATABASE_URL_PROD"
        };
        let database_url = lookup(url_key)
            .or_else(|| lookup("DATABASE_URL"))
            .with_context(|| format!("{url_key} (or DATABASE_URL) must be set"))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT {raw:?}"))?,
            None => 5000,
        };

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid BCRYPT_COST {raw:?}"))?,
            None => DEFAULT_COST,
        };
        if !(MIN_COST..=MAX_COST).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between {MIN_COST} and {MAX_COST}, got {bcrypt_cost}");
        }

        Ok(Self {
            env,
            database_url,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            bcrypt_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn development_uses_dev_url_and_default_port() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL_DEV", "postgres://dev"),
            ("DATABASE_URL_PROD", "postgres://prod"),
        ]))
        .unwrap();
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.database_url, "postgres://dev");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.bcrypt_cost, 12);
    }

    #[test]
    fn production_uses_prod_url() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL_DEV", "postgres://dev"),
            ("DATABASE_URL_PROD", "postgres://prod"),
            ("PORT", "8081"),
        ]))
        .unwrap();
        assert_eq!(cfg.env, Environment::Production);
        assert_eq!(cfg.database_url, "postgres://prod");
        assert_eq!(cfg.port, 8081);
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL_PROD"));
    }

    #[test]
    fn bad_port_is_an_error() {
        let res = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("PORT", "http"),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn bcrypt_cost_is_range_checked() {
        for bad in ["3", "32", "40", "twelve"] {
            let res = AppConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://x"),
                ("BCRYPT_COST", bad),
            ]));
            let err = res.expect_err(bad);
            assert!(err.to_string().contains("BCRYPT_COST"), "{bad}: {err}");
        }

        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("BCRYPT_COST", "4"),
        ]))
        .unwrap();
        assert_eq!(cfg.bcrypt_cost, 4);
    }
}
