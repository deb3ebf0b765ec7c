use crate::config::Config;
use crate::error::LedgerError;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(default_filter: &str) -> Result<bool, LedgerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|err| LedgerError::invalid_data(format!("invalid log filter: {err}")))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok())
}

pub fn init_logging_from_config(config: &Config) -> Result<bool, LedgerError> {
    init_logging(config.log_filter_or_default())
}

#[cfg(test)]
mod tests {
    use super::init_logging_from_config;
    use crate::config::Config;

    #[test]
    fn second_install_is_a_no_op() {
        let config = Config {
            log_filter: Some("ledger_core=debug".into()),
            ..Config::default()
        };

        init_logging_from_config(&config).unwrap();
        assert!(!init_logging_from_config(&config).unwrap());
    }
}
