use anyhow::{Context, Result};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;

use crate::db::connection::mask_credentials;

const DEV_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const MIN_PRODUCTION_SECRET_LEN: usize = 32;
const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 365 * 24 * 60;
const MAX_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 10 * 365;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    /// Détecte automatiquement l'environnement
    fn detect(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Méthode 1: Vérifier si on est dans AWS Lambda
        if lookup("AWS_LAMBDA_FUNCTION_NAME").is_some() {
            return Ok(Self::Production);
        }

        // Méthode 2: Vérifier la variable APP_ENV
        match lookup("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => Ok(Self::Development),
            Some("testing") | Some("test") => Ok(Self::Testing),
            Some("production") | Some("prod") => Ok(Self::Production),
            Some(other) => anyhow::bail!("Unknown APP_ENV value: {other}"),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Postgres { database_url: String, pool_size: u32 },
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub storage: StorageBackend,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub bcrypt_cost: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = match &self.storage {
            StorageBackend::Postgres { database_url, pool_size } => {
                format!("postgres({}, pool={pool_size})", mask_credentials(database_url))
            }
            StorageBackend::Memory => "memory".to_string(),
        };
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("storage", &storage)
            .field("jwt_secret", &"***")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    /// avec détection automatique de l'environnement
    pub fn from_env() -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();

        // En production (Lambda), les variables sont déjà injectées
        if !Environment::detect(&lookup)?.is_production() {
            match dotenvy::dotenv() {
                Ok(path) => tracing::debug!("Loaded {}", path.display()),
                Err(e) if e.not_found() => tracing::debug!(".env file not found, using environment variables"),
                Err(e) => return Err(e).context("Failed to read .env file"),
            }
        }

        let config = Self::from_lookup(lookup)?;

        tracing::info!(
            environment = config.environment.as_str(),
            "Configuration loaded"
        );
        tracing::debug!(?config);
        Ok(config)
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = Environment::detect(&lookup)?;

        let storage = Self::get_storage(&lookup, environment)?;
        let jwt_secret = Self::get_jwt_secret(&lookup, environment)?;
        let jwt_algorithm = match lookup("JWT_ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim())
                .map_err(|_| anyhow::anyhow!("Invalid JWT_ALGORITHM: {raw}"))?,
            None => Algorithm::HS256,
        };
        if !matches!(jwt_algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            anyhow::bail!("JWT_ALGORITHM must be HS256, HS384 or HS512 (got {jwt_algorithm:?})");
        }

        let access_token_expire_minutes: i64 =
            parse_or(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;
        let refresh_token_expire_days: i64 = parse_or(&lookup, "REFRESH_TOKEN_EXPIRE_DAYS", 7)?;
        if !(1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(&access_token_expire_minutes) {
            anyhow::bail!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_ACCESS_TOKEN_EXPIRE_MINUTES} (got {access_token_expire_minutes})"
            );
        }
        if !(1..=MAX_REFRESH_TOKEN_EXPIRE_DAYS).contains(&refresh_token_expire_days) {
            anyhow::bail!(
                "REFRESH_TOKEN_EXPIRE_DAYS must be between 1 and {MAX_REFRESH_TOKEN_EXPIRE_DAYS} (got {refresh_token_expire_days})"
            );
        }

        let bcrypt_cost: u32 = parse_or(&lookup, "BCRYPT_COST", 12)?;
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31 (got {bcrypt_cost})");
        }

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(&lookup, "SERVER_PORT", 3000)?;

        Ok(Self {
            environment,
            storage,
            jwt_secret,
            jwt_algorithm,
            access_token_expire_minutes,
            refresh_token_expire_days,
            bcrypt_cost,
            server_host,
            server_port,
        })
    }

    fn get_storage(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<StorageBackend> {
        match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => Ok(StorageBackend::Postgres {
                database_url: Self::get_database_url(lookup, environment)?,
                pool_size: parse_or(lookup, "DB_POOL_SIZE", 5)?,
            }),
            Some("memory") if environment.is_production() => {
                anyhow::bail!("STORAGE_BACKEND=memory is not allowed in production")
            }
            Some("memory") => Ok(StorageBackend::Memory),
            Some(other) => anyhow::bail!("Unknown STORAGE_BACKEND value: {other}"),
        }
    }

    /// Récupère DATABASE_URL avec logique intelligente
    fn get_database_url(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<String> {
        if let Some(url) = lookup("DATABASE_URL") {
            return Ok(url);
        }

        // Si en prod et DATABASE_URL manque, erreur critique
        if environment.is_production() {
            anyhow::bail!(
                "DATABASE_URL must be set in production! \
                 Configure it in Lambda environment variables."
            );
        }

        // En dev, construire l'URL depuis les composants
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Ok(format!(
            "postgres://{}:{}@{}:{}/{}",
            get("POSTGRES_USER", "postgres"),
            get("POSTGRES_PASSWORD", "postgres"),
            get("DB_HOST", "localhost"),
            get("DB_PORT", "5432"),
            get("POSTGRES_DB", "auth_db"),
        ))
    }

    /// Récupère JWT_SECRET avec validation
    fn get_jwt_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<String> {
        let secret = match lookup("JWT_SECRET") {
            Some(s) => s,
            None if environment.is_production() => {
                anyhow::bail!("JWT_SECRET is required in production");
            }
            None => {
                tracing::warn!("JWT_SECRET not set, using default (DEVELOPMENT ONLY!)");
                DEV_JWT_SECRET.to_string()
            }
        };

        // Valider la longueur du secret en production
        if environment.is_production() && secret.len() < MIN_PRODUCTION_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {MIN_PRODUCTION_SECRET_LEN} characters in production (current: {})",
                secret.len()
            );
        }

        Ok(secret)
    }

    /// Retourne true si on est en mode production
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn access_token_ttl(&self) -> Result<Duration> {
        Duration::try_minutes(self.access_token_expire_minutes)
            .context("ACCESS_TOKEN_EXPIRE_MINUTES is out of range")
    }

    pub fn refresh_token_ttl(&self) -> Result<Duration> {
        Duration::try_days(self.refresh_token_expire_days)
            .context("REFRESH_TOKEN_EXPIRE_DAYS is out of range")
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}
