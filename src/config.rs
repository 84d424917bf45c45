//! Support for library configuration options

use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::clock::SystemClock;
use crate::client::Client;
use crate::error::ConfigError;

/// Credentials of a CalDAV server
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ServerSettings {
    /// Base URL that relative item identifiers are resolved against
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Settings of the completion engine
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// IANA name of the time zone days start in (e.g. `Europe/Berlin`). The system local time zone is used when this is `None`.
    pub timezone: Option<String>,

    /// Whether completing an occurrence of a recurring task leaves a completed copy of it behind.
    /// When `false`, the task is only moved to its next occurrence.
    pub keep_completed_copies: bool,

    #[serde(rename = "webDavAuth")]
    pub server: Option<ServerSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: None,
            keep_completed_copies: true,
            server: None,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let settings: Self = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        Ok(())
    }

    /// The configured time zone, if any
    pub fn tz(&self) -> Result<Option<Tz>, ConfigError> {
        match &self.timezone {
            None => Ok(None),
            Some(name) => name.parse::<Tz>()
                .map(Some)
                .map_err(|_| ConfigError::UnknownTimezone(name.clone())),
        }
    }

    /// A clock that tells the actual time, in the configured time zone
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        Ok(match self.tz()? {
            Some(tz) => SystemClock::in_timezone(tz),
            None => SystemClock::new(),
        })
    }

    /// A client to the configured server
    pub fn client(&self) -> Result<Client, ConfigError> {
        let server = self.server.as_ref().ok_or(ConfigError::NoServer)?;
        Ok(Client::new(&server.url, &server.username, &server.password)?)
    }
}
