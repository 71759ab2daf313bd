//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use super::thread_count::ThreadCount;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["phasepool.toml", ".phasepool.toml"];
const ENV_PREFIX: &str = "PHASEPOOL_";

/// Values given on the command line; they take precedence over every file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub loading_phase_threads: Option<ThreadCount>,
    pub jobs: Option<ThreadCount>,
    pub globbing_threads: Option<ThreadCount>,
    pub cpu_heavy_pool_size: Option<ThreadCount>,
    pub use_prioritization: Option<bool>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Render as a TOML document containing only the overridden keys.
    ///
    /// Sections without an override are left out so that they stay absent.
    pub fn to_toml(&self) -> Result<String, Box<figment::Error>> {
        let mut root = toml::Table::new();
        let mut put = |section: &str, key: &str, value: toml::Value| {
            if let Some(table) = root
                .entry(section)
                .or_insert_with(|| toml::Value::Table(toml::Table::new()))
                .as_table_mut()
            {
                table.insert(key.to_string(), value);
            }
        };

        if let Some(threads) = self.loading_phase_threads {
            put("loading", "threads", thread_value("loading.threads", threads)?);
        }
        if let Some(jobs) = self.jobs {
            put("build", "jobs", thread_value("build.jobs", jobs)?);
        }
        if let Some(globbing) = self.globbing_threads {
            put(
                "package",
                "globbing_threads",
                thread_value("package.globbing_threads", globbing)?,
            );
        }
        if let Some(size) = self.cpu_heavy_pool_size {
            put(
                "analysis",
                "cpu_heavy_pool_size",
                thread_value("analysis.cpu_heavy_pool_size", size)?,
            );
        }
        if let Some(prioritize) = self.use_prioritization {
            put("analysis", "use_prioritization", toml::Value::Boolean(prioritize));
        }

        Ok(root.to_string())
    }
}

fn thread_value(key: &str, count: ThreadCount) -> Result<toml::Value, Box<figment::Error>> {
    match count {
        ThreadCount::Fixed(n) => i64::try_from(n).map(toml::Value::Integer).map_err(|_| {
            Box::new(figment::Error::from(format!(
                "override {} = {} is too large",
                key, n
            )))
        }),
        other => Ok(toml::Value::String(other.to_string())),
    }
}

/// Where a configuration file is looked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub path: PathBuf,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Command-line overrides
    /// 2. Environment: `PHASEPOOL_<SECTION>__<KEY>`
    /// 3. Explicit config path (if provided)
    /// 4. Project root: `./phasepool.toml` or `./.phasepool.toml`
    /// 5. Global config: `<config_dir>/phasepool/config.toml`
    /// 6. Default values (no option groups)
    pub fn load(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(project_path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment, overrides)
    }

    /// Load only defaults plus command-line overrides (for --no-config)
    pub fn load_overrides_only(
        overrides: &ConfigOverrides,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        Self::extract(figment, overrides)
    }

    /// Load a single file plus overrides, ignoring global, project and environment sources
    pub fn load_file(
        path: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let figment = Figment::new()
            .merge(Serialized::defaults(FileConfig::default()))
            .merge(Toml::file(path));
        Self::extract(figment, overrides)
    }

    fn extract(
        mut figment: Figment,
        overrides: &ConfigOverrides,
    ) -> Result<FileConfig, Box<figment::Error>> {
        if !overrides.is_empty() {
            figment = figment.merge(Toml::string(&overrides.to_toml()?));
        }
        figment.extract().map_err(Box::new)
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("phasepool").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Config file locations in priority order, for display
    pub fn config_sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                path: path.to_path_buf(),
                found: path.exists(),
            });
        }

        match Self::project_config_path() {
            Some(path) => sources.push(ConfigSource {
                label: "Project",
                path,
                found: true,
            }),
            None => sources.push(ConfigSource {
                label: "Project",
                path: PathBuf::from(PROJECT_FILES[0]),
                found: false,
            }),
        }

        if let Some(path) = Self::global_config_path() {
            let found = path.exists();
            sources.push(ConfigSource {
                label: "Global",
                path,
                found,
            });
        }

        sources
    }
}
