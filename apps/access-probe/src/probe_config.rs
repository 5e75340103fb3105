use std::env;

use dubox_application::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PagingConfig};
use dubox_core::AppError;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub paging: PagingConfig,
}

impl ProbeConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let default_page_size =
            optional_number(&lookup, "DUBOX_DEFAULT_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE);
        let max_page_size =
            optional_number(&lookup, "DUBOX_MAX_PAGE_SIZE")?.unwrap_or(MAX_PAGE_SIZE);
        let db_max_connections = optional_number(&lookup, "DUBOX_DB_MAX_CONNECTIONS")?
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

        if db_max_connections == 0 {
            return Err(AppError::Validation(
                "DUBOX_DB_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections,
            paging: PagingConfig::new(default_page_size, max_page_size)?,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn optional_number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<u32>, AppError> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dubox_core::AppError;

    use super::ProbeConfig;

    fn load(pairs: &[(&str, &str)]) -> Result<ProbeConfig, AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ProbeConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() -> Result<(), AppError> {
        let config = load(&[("DATABASE_URL", "postgres://localhost/dubox")])?;

        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.paging.default_page_size(), 50);
        assert_eq!(config.paging.max_page_size(), 1000);
        Ok(())
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            load(&[("DATABASE_URL", "  ")]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn page_sizes_are_validated() {
        let inverted = load(&[
            ("DATABASE_URL", "postgres://localhost/dubox"),
            ("DUBOX_DEFAULT_PAGE_SIZE", "200"),
            ("DUBOX_MAX_PAGE_SIZE", "100"),
        ]);
        let garbage = load(&[
            ("DATABASE_URL", "postgres://localhost/dubox"),
            ("DUBOX_MAX_PAGE_SIZE", "lots"),
        ]);

        assert!(matches!(inverted, Err(AppError::Validation(_))));
        assert!(matches!(garbage, Err(AppError::Validation(_))));
    }

    #[test]
    fn zero_connections_are_rejected() {
        let result = load(&[
            ("DATABASE_URL", "postgres://localhost/dubox"),
            ("DUBOX_DB_MAX_CONNECTIONS", "0"),
        ]);

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
