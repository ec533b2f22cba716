//! Server configuration from environment variables (`.env` supported).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::generator::generate_teams;
use crate::team_store::TeamStore;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Largest synthetic org chart that may be seeded.
pub const MAX_GENERATED_TEAMS: usize = 1_000_000;

/// Shape of a synthetic org chart, written `<levels>x<sub_teams>` (e.g. `9x3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateSpec {
    pub levels: usize,
    pub sub_teams: usize,
}

impl GenerateSpec {
    pub fn parse(s: &str) -> Result<Self> {
        let (levels, sub_teams) = s
            .trim()
            .split_once('x')
            .with_context(|| format!("Expected <levels>x<sub_teams>, got {:?}", s))?;
        let spec = Self {
            levels: levels
                .parse()
                .with_context(|| format!("Invalid level count: {:?}", levels))?,
            sub_teams: sub_teams
                .parse()
                .with_context(|| format!("Invalid sub-team count: {:?}", sub_teams))?,
        };

        match spec.team_count() {
            Some(count) if count <= MAX_GENERATED_TEAMS => Ok(spec),
            _ => bail!(
                "Synthetic org chart {}x{} exceeds {} teams",
                spec.levels,
                spec.sub_teams,
                MAX_GENERATED_TEAMS
            ),
        }
    }

    /// Total teams including the root, or `None` on overflow.
    pub fn team_count(&self) -> Option<usize> {
        let mut total = 1usize;
        let mut level_size = 1usize;
        for _ in 0..self.levels {
            level_size = level_size.checked_mul(self.sub_teams)?;
            if level_size == 0 {
                break;
            }
            total = total.checked_add(level_size)?;
        }
        Some(total)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to (`ORG_CHART_BIND`).
    pub bind_addr: String,
    /// Flat team list JSON file (`ORG_CHART_DATA`).
    pub data_file: Option<PathBuf>,
    /// Seed a synthetic chart when there is no stored team list (`ORG_CHART_GENERATE`).
    pub generate: Option<GenerateSpec>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let generate = lookup("ORG_CHART_GENERATE")
            .map(|s| GenerateSpec::parse(&s))
            .transpose()
            .context("Invalid ORG_CHART_GENERATE")?;

        Ok(Self {
            bind_addr: lookup("ORG_CHART_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            data_file: lookup("ORG_CHART_DATA").map(PathBuf::from),
            generate,
        })
    }

    /// Open the team store: the data file if it exists, otherwise the
    /// synthetic seed if configured, otherwise an empty chart.
    pub fn open_store(&self) -> Result<TeamStore> {
        if let Some(path) = self.data_file.as_deref().filter(|p| p.exists()) {
            return TeamStore::load(path);
        }

        let store = match self.generate {
            Some(spec) => {
                info!("Seeding synthetic org chart {}x{}", spec.levels, spec.sub_teams);
                TeamStore::new(generate_teams(spec.levels, spec.sub_teams))
            }
            None => TeamStore::default(),
        };

        match &self.data_file {
            Some(path) => {
                let store = store.with_data_file(path);
                store.save()?;
                Ok(store)
            }
            None => Ok(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.data_file.is_none());
        assert!(config.generate.is_none());
        assert_eq!(config.open_store().unwrap().len(), 0);
    }

    #[test]
    fn test_generate_spec() {
        assert_eq!(
            GenerateSpec::parse("9x3").unwrap(),
            GenerateSpec {
                levels: 9,
                sub_teams: 3
            }
        );
        assert!(GenerateSpec::parse("9").is_err());
        assert!(GenerateSpec::parse("ax3").is_err());
        assert!(config(&[("ORG_CHART_GENERATE", "3-3")]).is_err());
    }

    #[test]
    fn test_generate_spec_is_bounded() {
        assert_eq!(GenerateSpec::parse("9x3").unwrap().team_count(), Some(29_524));
        assert_eq!(GenerateSpec::parse("1000000x0").unwrap().team_count(), Some(1));
        assert_eq!(GenerateSpec::parse("0x999999999").unwrap().team_count(), Some(1));

        assert!(GenerateSpec::parse("12x3").is_ok());
        assert!(GenerateSpec::parse("13x3").is_err());
        assert!(GenerateSpec::parse("2x1000000").is_err());
        let err = GenerateSpec::parse("64x18446744073709551615").unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_generated_seed_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");

        let path_str = path.to_string_lossy().to_string();
        let config = config(&[
            ("ORG_CHART_DATA", path_str.as_str()),
            ("ORG_CHART_GENERATE", "2x2"),
            ("ORG_CHART_BIND", "127.0.0.1:8080"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");

        let store = config.open_store().unwrap();
        assert_eq!(store.len(), 7);

        // Second start reads the file instead of generating again.
        let reopened = config.open_store().unwrap();
        assert_eq!(reopened.teams(), store.teams());
    }
}
