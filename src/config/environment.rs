//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. Las variables opcionales
//! tienen valores por defecto de desarrollo; las que no se pueden interpretar
//! producen un error en lugar de un panic.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::services::ledger_service::DEFAULT_MAX_COMMIT_ATTEMPTS;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub log_level: tracing::Level,
    pub database_url: Option<String>,
    pub max_commit_attempts: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "dev_secret".to_string(),
            jwt_expiration: 86_400,
            cors_origins: Vec::new(),
            log_level: tracing::Level::DEBUG,
            database_url: None,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde el entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            log_level: match env::var("LOG_LEVEL") {
                Ok(raw) => tracing::Level::from_str(raw.trim())
                    .map_err(|e| anyhow::anyhow!("LOG_LEVEL must be a tracing level: {}", e))?,
                Err(_) => defaults.log_level,
            },
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            max_commit_attempts: parse_var("LEDGER_MAX_COMMIT_ATTEMPTS", defaults.max_commit_attempts)?,
        };

        if config.is_production() && config.jwt_secret == "dev_secret" {
            anyhow::bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección de escucha del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_development() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.max_commit_attempts, DEFAULT_MAX_COMMIT_ATTEMPTS);
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u16 = parse_var("FUEL_LEDGER_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }
}
