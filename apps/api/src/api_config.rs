use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use gatehouse_core::AppError;
use gatehouse_domain::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MINUTES, RateLimitPolicy};
use tracing_subscriber::EnvFilter;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    /// Run the HTTP server.
    Serve,
    /// Apply migrations and exit.
    Migrate,
    /// Create or update one password user and exit.
    CreateUser { email: String, password: String },
}

/// Backend that keeps login attempt counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStoreBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for AttemptStoreBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "ATTEMPT_STORE must be one of 'postgres', 'redis' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub command: ApiCommand,
    pub database_url: String,
    pub frontend_url: String,
    pub _session_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub attempt_store: AttemptStoreBackend,
    pub redis_url: Option<String>,
    pub login_policy: RateLimitPolicy,
    pub trust_forwarded_for: bool,
    pub sweep_interval_seconds: u64,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let command = parse_command(env::args().skip(1).collect())?;

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let session_secret = required_env("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LENGTH {
            return Err(AppError::Validation(format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LENGTH} characters"
            )));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let cookie_secure = flag_env("SESSION_COOKIE_SECURE");
        let trust_forwarded_for = flag_env("TRUST_FORWARDED_FOR");

        let attempt_store = env::var("ATTEMPT_STORE")
            .unwrap_or_else(|_| "postgres".to_owned())
            .parse::<AttemptStoreBackend>()?;

        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        if attempt_store == AttemptStoreBackend::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when ATTEMPT_STORE=redis".to_owned(),
            ));
        }

        let login_policy = RateLimitPolicy::new(
            number_env("LOGIN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            number_env("LOGIN_WINDOW_MINUTES", DEFAULT_WINDOW_MINUTES)?,
        )?;

        let sweep_interval_seconds = number_env("SWEEP_INTERVAL_SECONDS", 300_u64)?;
        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            command,
            database_url,
            frontend_url,
            _session_secret: session_secret,
            api_host,
            api_port,
            cookie_secure,
            attempt_store,
            redis_url,
            login_policy,
            trust_forwarded_for,
            sweep_interval_seconds,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn redis_required(&self) -> bool {
        self.attempt_store == AttemptStoreBackend::Redis
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_command(args: Vec<String>) -> Result<ApiCommand, AppError> {
    match args.first().map(String::as_str) {
        None | Some("serve") => Ok(ApiCommand::Serve),
        Some("migrate") => Ok(ApiCommand::Migrate),
        Some("create-user") => {
            let email = args.get(1).cloned().ok_or_else(|| {
                AppError::Validation("usage: gatehouse-api create-user <email>".to_owned())
            })?;
            let password = required_non_empty_env("GATEHOUSE_USER_PASSWORD")?;
            Ok(ApiCommand::CreateUser { email, password })
        }
        Some(other) => Err(AppError::Validation(format!("unknown command '{other}'"))),
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn flag_env(name: &str) -> bool {
    env::var(name)
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true")
}

fn number_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiCommand, AttemptStoreBackend, parse_command};

    #[test]
    fn no_arguments_means_serve() {
        assert_eq!(parse_command(Vec::new()).ok(), Some(ApiCommand::Serve));
        assert_eq!(
            parse_command(vec!["migrate".to_owned()]).ok(),
            Some(ApiCommand::Migrate)
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(parse_command(vec!["seed".to_owned()]).is_err());
    }

    #[test]
    fn create_user_requires_an_email() {
        assert!(parse_command(vec!["create-user".to_owned()]).is_err());
    }

    #[test]
    fn attempt_store_backend_parses_case_insensitively() {
        assert_eq!(
            " Redis ".parse::<AttemptStoreBackend>().ok(),
            Some(AttemptStoreBackend::Redis)
        );
        assert_eq!(
            "memory".parse::<AttemptStoreBackend>().ok(),
            Some(AttemptStoreBackend::Memory)
        );
        assert!("sqlite".parse::<AttemptStoreBackend>().is_err());
    }
}
