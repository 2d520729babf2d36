//! Store configuration and file path resolution

use crate::error::{Result, StoreError};
use crate::timestamp::TimestampFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name used when none is given
pub const DEFAULT_NAME: &str = "date-store";

/// Subdirectory of the configuration home holding store files
pub const DEFAULT_SUBDIR: &str = "date-store";

/// Default coalescing delay before a mutation reaches disk
pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(5);

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Store name, used as the file stem of the default path
    pub name: Option<String>,
    /// Full file location (wins over `directory` and `name`)
    pub path: Option<PathBuf>,
    /// Base directory for `{name}.json` (default: `{config_home}/date-store`)
    pub directory: Option<PathBuf>,
    /// Configuration home (default: `$XDG_CONFIG_HOME`, else `~/.config`)
    pub config_home: Option<PathBuf>,
    /// Delay before a scheduled save is flushed; zero writes synchronously
    pub write_delay: Duration,
    /// Indent width of the persisted JSON; zero writes it compact
    pub indent: usize,
    /// Rendering used for newly recorded timestamps
    pub format: TimestampFormat,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            name: None,
            path: None,
            directory: None,
            config_home: None,
            write_delay: DEFAULT_WRITE_DELAY,
            indent: 2,
            format: TimestampFormat::default(),
        }
    }
}

impl StoreOptions {
    /// Default options for a named store
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Default options for a store at an explicit path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_config_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.config_home = Some(home.into());
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_format(mut self, format: TimestampFormat) -> Self {
        self.format = format;
        self
    }

    /// Effective store name
    pub fn store_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Resolve the backing file location
    ///
    /// Order: explicit `path`, else `{directory}/{name}.json` where
    /// `directory` defaults to `{config_home}/date-store`. This is the only
    /// place the process environment is consulted.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let name = self.store_name();
        validate_name(name)?;

        let directory = match &self.directory {
            Some(dir) => dir.clone(),
            None => self.resolve_config_home()?.join(DEFAULT_SUBDIR),
        };

        Ok(directory.join(format!("{}.json", name)))
    }

    fn resolve_config_home(&self) -> Result<PathBuf> {
        if let Some(home) = &self.config_home {
            return Ok(home.clone());
        }

        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            let xdg = PathBuf::from(xdg);
            if xdg.is_absolute() {
                return Ok(xdg);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".config"))
            .ok_or(StoreError::NoConfigHome)
    }
}

/// A name must be usable as a single file stem
fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
        || Path::new(name).components().count() != 1;

    if invalid {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
