// Copyright 2026 Savor Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_path: PathBuf,
    pub encodings_path: PathBuf,
    pub unknown_area: String,
    pub all_areas_label: String,
    pub default_top_n: usize,
    pub default_min_rating: f64,
    pub default_max_cost: f64,
    pub max_top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("cleaned_data.csv"),
            encodings_path: PathBuf::from("encoder_data.csv"),
            unknown_area: "unknown".to_string(),
            all_areas_label: "All Areas".to_string(),
            default_top_n: 10,
            default_min_rating: 3.5,
            default_max_cost: 800.0,
            max_top_n: 1000,
        }
    }
}

/// Data paths given on the command line. They win over the config file and
/// are taken relative to the working directory.
#[derive(Debug, Clone, Default)]
pub struct DataOverrides {
    pub catalog: Option<PathBuf>,
    pub encodings: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load_from_cwd(overrides: &DataOverrides) -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd, overrides)
    }

    pub fn load_from(start: &Path, overrides: &DataOverrides) -> Result<Self> {
        let mut config = load_global_config()?;
        if let Some(path) = &overrides.catalog {
            config.catalog_path = start.join(path);
        }
        if let Some(path) = &overrides.encodings {
            config.encodings_path = start.join(path);
        }
        let root = find_data_root(start, &config.catalog_path).ok_or_else(|| {
            anyhow::anyhow!(
                "catalog {} not found; pass --catalog or set catalog_path in {}",
                config.catalog_path.display(),
                describe_global_config_path()
            )
        })?;
        Ok(Self { root, config })
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.config.catalog_path)
    }

    pub fn encodings_path(&self) -> PathBuf {
        self.resolve(&self.config.encodings_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("savor").join("savor.toml"))
}

fn describe_global_config_path() -> String {
    global_config_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<config dir unavailable>".to_string())
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

/// Walks up from `start` until `catalog_path` exists below a directory.
pub fn find_data_root(start: &Path, catalog_path: &Path) -> Option<PathBuf> {
    if catalog_path.is_absolute() {
        return catalog_path
            .exists()
            .then(|| catalog_path.parent().unwrap_or(catalog_path).to_path_buf());
    }

    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = cur.join(catalog_path);
        if candidate.exists() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse savor.toml")?;
    config.unknown_area = config.unknown_area.trim().to_lowercase();
    if config.max_top_n == 0 {
        anyhow::bail!("max_top_n must be at least 1");
    }
    if config.default_top_n == 0 {
        anyhow::bail!("default_top_n must be at least 1");
    }
    if config.default_top_n > config.max_top_n {
        config.default_top_n = config.max_top_n;
    }
    if !config.default_min_rating.is_finite() || !config.default_max_cost.is_finite() {
        anyhow::bail!("default_min_rating and default_max_cost must be finite");
    }
    Ok(config)
}

pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create dir {parent:?}"))?;
    }
    let text = toml::to_string_pretty(config).context("serialize config")?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
