// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for test-bisect.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
    reporter::ReporterFormat,
    runner::PassIds,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

/// Overall configuration for test-bisect.
///
/// Most configuration is managed through [profiles](BisectProfile), obtained through the
/// [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct BisectConfig {
    config_file: Utf8PathBuf,
    inner: BisectConfigImpl,
}

impl BisectConfig {
    /// The default location of the config within a directory: `.config/bisect.toml`.
    pub const CONFIG_PATH: &'static str = ".config/bisect.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/bisect.toml` in
    /// `dir`.
    ///
    /// If no config file is specified and `dir` doesn't have `.config/bisect.toml`, uses the
    /// default config options.
    pub fn from_sources(
        dir: impl AsRef<Utf8Path>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.as_ref().join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        Ok(Self { config_file, inner })
    }

    /// Returns the path the repository-specific config was read from, or would have been.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<BisectProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(self.inner.profiles.other.get(other).ok_or_else(|| {
                ProfileNotFound::new(name, self.inner.profiles.all_profiles())
            })?),
        };

        Ok(BisectProfile {
            name: name.to_owned(),
            default_profile: &self.inner.profiles.default,
            custom_profile,
        })
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<BisectConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|error| ConfigParseErrorKind::DeserializeError(Box::new(error)))
    }
}

/// A configuration profile for test-bisect.
///
/// Returned by [`BisectConfig::profile`].
#[derive(Clone, Debug)]
pub struct BisectProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl BisectProfile<'_> {
    /// Returns the name of this profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the command that runs the suite-under-test. May be empty.
    pub fn command(&self) -> &[String] {
        self.custom_profile
            .and_then(|profile| profile.command.as_deref())
            .unwrap_or(&self.default_profile.command)
    }

    /// Returns how example IDs are passed to the command.
    pub fn pass_ids(&self) -> PassIds {
        self.custom_profile
            .and_then(|profile| profile.pass_ids)
            .unwrap_or(self.default_profile.pass_ids)
    }

    /// Returns the timeout for each probe, if any.
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.custom_profile
            .and_then(|profile| profile.probe_timeout)
            .or(self.default_profile.probe_timeout)
    }

    /// Returns the format used for progress output.
    pub fn format(&self) -> ReporterFormat {
        self.custom_profile
            .and_then(|profile| profile.format)
            .unwrap_or(self.default_profile.format)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BisectConfigImpl {
    #[serde(rename = "profile")]
    profiles: BisectProfilesImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct BisectProfilesImpl {
    default: DefaultProfileImpl,
    #[serde(flatten)]
    other: HashMap<String, CustomProfileImpl>,
}

impl BisectProfilesImpl {
    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(BisectConfig::DEFAULT_PROFILE))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultProfileImpl {
    command: Vec<String>,
    pass_ids: PassIds,
    #[serde(default, with = "humantime_serde")]
    probe_timeout: Option<Duration>,
    format: ReporterFormat,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    command: Option<Vec<String>>,
    #[serde(default)]
    pass_ids: Option<PassIds>,
    #[serde(default, with = "humantime_serde")]
    probe_timeout: Option<Duration>,
    #[serde(default)]
    format: Option<ReporterFormat>,
}
