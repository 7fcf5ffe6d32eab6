// src/config.rs

use anyhow::{bail, Context, Result};
use std::{
    env, fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.e-stat.go.jp/rest/3.0/app/json/";

pub const ENV_APP_ID: &str = "JPESTAT_APP_ID";
pub const ENV_LANG: &str = "JPESTAT_LANG";
pub const ENV_BASE_URL: &str = "JPESTAT_BASE_URL";
/// Points at an env file to load instead of `./.env`.
pub const ENV_DOTENV_PATH: &str = "DOTENV_PATH";

/// Load the env file named by `DOTENV_PATH`, or `.env` from the working
/// directory (or a parent) when that is unset.
///
/// Variables already in the process environment win. Returns the file that
/// was loaded; a missing default `.env` is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>> {
    let explicit = env::var_os(ENV_DOTENV_PATH).map(PathBuf::from);
    load_env_file(explicit.as_deref())
}

/// Load `path` if given (it must exist), otherwise look for a default `.env`.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("loading env file {:?}", path))?;
            debug!(path = %path.display(), "loaded env file");
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(found) => {
                debug!(path = %found.display(), "loaded env file");
                Ok(Some(found))
            }
            Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("loading .env"),
        },
    }
}

/// Response language (`lang` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    Japanese,
    English,
}

impl Lang {
    pub fn as_param(&self) -> &'static str {
        match self {
            Lang::Japanese => "J",
            Lang::English => "E",
        }
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "J" | "JA" | "JP" => Ok(Lang::Japanese),
            "E" | "EN" => Ok(Lang::English),
            other => bail!("unknown language `{}` (expected J or E)", other),
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Everything the client needs; passed in explicitly, never read from globals.
#[derive(Clone)]
pub struct ClientConfig {
    pub app_id: String,
    pub lang: Lang,
    /// Endpoint names are joined onto this, so it must end in `/`.
    pub base_url: Url,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>) -> Result<Self> {
        let app_id = app_id.into();
        if app_id.trim().is_empty() {
            bail!("application id must not be empty");
        }
        Ok(Self {
            app_id,
            lang: Lang::default(),
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            timeout: Duration::from_secs(60),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        })
    }

    pub fn with_lang(mut self, lang: Lang) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    /// Read `JPESTAT_APP_ID` (required), `JPESTAT_LANG` and `JPESTAT_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let app_id = env::var(ENV_APP_ID)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("{} is not set", ENV_APP_ID))?;
        let mut config = Self::new(app_id)?;

        if let Ok(lang) = env::var(ENV_LANG) {
            config.lang = lang
                .parse()
                .with_context(|| format!("parsing {}", ENV_LANG))?;
        }
        if let Ok(base) = env::var(ENV_BASE_URL) {
            config = config
                .with_base_url(&base)
                .with_context(|| format!("parsing {}", ENV_BASE_URL))?;
        }
        Ok(config)
    }

    /// [`load_dotenv`] followed by [`ClientConfig::from_env`].
    pub fn from_env_file() -> Result<Self> {
        load_dotenv()?;
        Self::from_env()
    }
}

// keep the application id out of logs
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("app_id", &"<redacted>")
            .field("lang", &self.lang)
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    Url::parse(&s).with_context(|| format!("parsing base URL {}", raw))
}
