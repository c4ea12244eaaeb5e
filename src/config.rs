use anyhow::{Context, Result, anyhow};

/// Which prompt/fallback preset the issue generator runs with.
///
/// | Profile    | Target task count | Fallback issues |
/// |------------|-------------------|-----------------|
/// | `Standard` | 15-25             | 3               |
/// | `Extended` | up to ~60         | 5               |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKind {
    #[default]
    Standard,
    Extended,
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileKind::Standard => write!(f, "standard"),
            ProfileKind::Extended => write!(f, "extended"),
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(ProfileKind::Standard),
            "extended" => Ok(ProfileKind::Extended),
            _ => anyhow::bail!(
                "Invalid issue profile '{}'. Valid values: standard, extended",
                s
            ),
        }
    }
}

/// Settings for the LLM completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout_ms: u64,
    pub profile: ProfileKind,
}

/// Runtime configuration for the server, read from the environment.
///
/// A `.env` file in the working directory is honoured but never required.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret_key: String,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_api_base: String,
    pub github_oauth_base: String,
    pub llm: LlmSettings,
    pub host: String,
    pub port: u16,
    pub session_ttl_minutes: i64,
    /// Set the `Secure` flag on the session cookie.
    pub production: bool,
}

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_OAUTH_BASE: &str = "https://github.com";
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 1440;
/// One year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 525_600;

const REQUIRED_SERVER_VARS: &[&str] = &[
    "SECRET_KEY",
    "GITHUB_CLIENT_ID",
    "GITHUB_CLIENT_SECRET",
    "OPENAI_API_KEY",
];

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Every missing required secret is reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_empty(lookup(name));

        let missing: Vec<&str> = REQUIRED_SERVER_VARS
            .iter()
            .copied()
            .filter(|&name| get(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "Required environment variables are not set: {}",
                missing.join(", ")
            ));
        }

        let required = |name: &str| get(name).ok_or_else(|| anyhow!("{} is not set", name));

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT '{}'", raw))?,
            None => DEFAULT_PORT,
        };
        let session_ttl_minutes = match get("SESSION_TTL_MINUTES") {
            Some(raw) => {
                let minutes = raw
                    .parse::<i64>()
                    .with_context(|| format!("Invalid SESSION_TTL_MINUTES '{}'", raw))?;
                if minutes <= 0 {
                    anyhow::bail!("SESSION_TTL_MINUTES must be positive, got {}", minutes);
                }
                if minutes > MAX_SESSION_TTL_MINUTES {
                    anyhow::bail!(
                        "SESSION_TTL_MINUTES must be at most {}, got {}",
                        MAX_SESSION_TTL_MINUTES,
                        minutes
                    );
                }
                minutes
            }
            None => DEFAULT_SESSION_TTL_MINUTES,
        };

        Ok(Self {
            secret_key: required("SECRET_KEY")?,
            github_client_id: required("GITHUB_CLIENT_ID")?,
            github_client_secret: required("GITHUB_CLIENT_SECRET")?,
            github_api_base: get("GITHUB_API_BASE")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            github_oauth_base: get("GITHUB_OAUTH_BASE")
                .unwrap_or_else(|| DEFAULT_GITHUB_OAUTH_BASE.to_string()),
            llm: LlmSettings::from_lookup(&lookup)?,
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            session_ttl_minutes,
            production: get("RAILWAY_ENVIRONMENT").as_deref() == Some("production"),
        })
    }
}

impl LlmSettings {
    /// LLM settings alone, for the `generate` command.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| non_empty(lookup(name));

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| anyhow!("Required environment variables are not set: OPENAI_API_KEY"))?;
        let request_timeout_ms = match get("OPENAI_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid OPENAI_TIMEOUT_MS '{}'", raw))?,
            None => DEFAULT_OPENAI_TIMEOUT_MS,
        };
        let profile = match get("ISSUE_PROFILE") {
            Some(raw) => raw.parse::<ProfileKind>()?,
            None => ProfileKind::default(),
        };

        Ok(Self {
            api_key,
            api_base: get("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            request_timeout_ms,
            profile,
        })
    }
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!(error = %e, "Failed to read .env file");
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
