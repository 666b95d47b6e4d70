// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration, merged from an INI file and command line overrides.
//!
//! ```ini
//! [settings]
//! download_directory = ~/Podcasts
//! guid_file = ~/.config/podstash/guids
//! quiet = false
//!
//! [feeds]
//! linux = https://example.com/linux.rss
//! news = https://example.com/news.rss
//! ```

use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use tracing::warn;

use crate::error::ConfigError;

/// Name of the GUID file used when only a download directory is configured
pub const DEFAULT_GUID_FILENAME: &str = ".podstash-guids";

const SETTINGS_SECTION: &str = "settings";
const FEEDS_SECTION: &str = "feeds";

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub download_directory: PathBuf,
    pub guid_file: PathBuf,
    pub feed_urls: Vec<String>,
    pub dry_run: bool,
    pub download_skip: bool,
    pub guid_skip: bool,
    pub quiet: bool,
}

/// Settings read from the INI file, all optional
#[derive(Debug, Default)]
pub struct ConfigFile {
    pub download_directory: Option<PathBuf>,
    pub guid_file: Option<PathBuf>,
    pub feed_urls: Vec<String>,
    pub dry_run: Option<bool>,
    pub download_skip: Option<bool>,
    pub guid_skip: Option<bool>,
    pub quiet: Option<bool>,
    /// Non-fatal problems such as unknown keys
    pub warnings: Vec<ConfigError>,
}

/// Settings given on the command line; they win over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub download_directory: Option<PathBuf>,
    pub guid_file: Option<PathBuf>,
    pub feed_urls: Vec<String>,
    pub dry_run: bool,
    pub download_skip: bool,
    pub guid_skip: bool,
    pub quiet: bool,
}

fn parse_option() -> ParseOption {
    // Backslashes in Windows paths must stay literal
    ParseOption {
        enabled_escape: false,
        ..Default::default()
    }
}

impl ConfigFile {
    /// Read and parse an INI file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file_opt(path, parse_option()).map_err(|e| {
            ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
        Ok(Self::from_ini(&ini))
    }

    /// Parse INI text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str_opt(text, parse_option()).map_err(|e| {
            ConfigError::ReadFailed {
                path: PathBuf::from("<inline>"),
                source: ini::Error::Parse(e),
            }
        })?;
        Ok(Self::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut file = Self::default();

        for (section, properties) in ini.iter() {
            let section_name = section.unwrap_or(SETTINGS_SECTION).to_lowercase();

            for (key, value) in properties.iter() {
                let value = value.trim();
                match section_name.as_str() {
                    FEEDS_SECTION => {
                        if !value.is_empty() {
                            file.feed_urls.push(value.to_string());
                        }
                    }
                    SETTINGS_SECTION => file.apply_setting(key, value),
                    _ => file.warnings.push(ConfigError::UnknownKey {
                        section: section_name.clone(),
                        key: key.to_string(),
                    }),
                }
            }
        }

        for warning in &file.warnings {
            warn!("{warning}");
        }

        file
    }

    fn apply_setting(&mut self, key: &str, value: &str) {
        let key = key.trim().to_lowercase();

        let flag = match key.as_str() {
            "download_directory" => {
                self.download_directory = Some(expand_home(value));
                return;
            }
            "guid_file" => {
                self.guid_file = Some(expand_home(value));
                return;
            }
            "dry_run" => &mut self.dry_run,
            "download_skip" => &mut self.download_skip,
            "guid_skip" => &mut self.guid_skip,
            "quiet" => &mut self.quiet,
            _ => {
                self.warnings.push(ConfigError::UnknownKey {
                    section: SETTINGS_SECTION.to_string(),
                    key: key.clone(),
                });
                return;
            }
        };

        match parse_bool(value) {
            Some(b) => *flag = Some(b),
            None => self.warnings.push(ConfigError::InvalidBool {
                key,
                value: value.to_string(),
            }),
        }
    }
}

impl Config {
    /// Merge file settings with command line overrides
    ///
    /// A dry run implies both skip flags.
    pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Self, ConfigError> {
        let download_directory = overrides
            .download_directory
            .or(file.download_directory)
            .ok_or(ConfigError::Missing("download_directory"))?;

        let guid_file = overrides
            .guid_file
            .or(file.guid_file)
            .unwrap_or_else(|| download_directory.join(DEFAULT_GUID_FILENAME));

        let feed_urls = if overrides.feed_urls.is_empty() {
            file.feed_urls
        } else {
            overrides.feed_urls
        };
        if feed_urls.is_empty() {
            return Err(ConfigError::NoFeeds);
        }

        let dry_run = overrides.dry_run || file.dry_run.unwrap_or(false);

        Ok(Self {
            download_directory,
            guid_file,
            feed_urls,
            dry_run,
            download_skip: dry_run || overrides.download_skip || file.download_skip.unwrap_or(false),
            guid_skip: dry_run || overrides.guid_skip || file.guid_skip.unwrap_or(false),
            quiet: overrides.quiet || file.quiet.unwrap_or(false),
        })
    }
}

/// Location of the config file when none is given explicitly
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;

    Some(base.join("podstash").join("config.ini"))
}

/// Expand a leading `~/` against `$HOME`
pub fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ if value == "~" => std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(value)),
        _ => PathBuf::from(value),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
