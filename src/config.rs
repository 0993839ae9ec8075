use anyhow::Context;

use crate::financials::DEFAULT_PAGE_SIZE;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub page_size: i64,
}

impl Config {
    /// `page_size` is the command-line value; when given, the environment
    /// variable is not consulted.
    pub fn from_env(page_size: Option<i64>) -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), page_size)
    }

    pub fn from_lookup<F>(lookup: F, page_size: Option<i64>) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("DASHBOARD_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .context("DASHBOARD_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let page_size = match page_size {
            Some(value) => {
                anyhow::ensure!(value > 0, "--page-size must be greater than zero");
                value
            }
            None => {
                let value = match lookup("DASHBOARD_PAGE_SIZE") {
                    Some(raw) => raw
                        .trim()
                        .parse::<i64>()
                        .context("DASHBOARD_PAGE_SIZE must be an integer")?,
                    None => DEFAULT_PAGE_SIZE,
                };
                anyhow::ensure!(value > 0, "DASHBOARD_PAGE_SIZE must be greater than zero");
                value
            }
        };
        anyhow::ensure!(
            max_connections > 0,
            "DASHBOARD_MAX_CONNECTIONS must be greater than zero"
        );

        Ok(Self {
            database_url,
            max_connections,
            page_size,
        })
    }
}
