use anyhow::{Context, Result, bail};

use crate::storage::DEFAULT_VERSION_MARKER;

/// Tunables of the integrity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Page size used when a query does not name one.
    pub default_page_size: u32,
    /// Largest page size a caller may request.
    pub max_page_size: u32,
    /// Internal revision field stripped from every read.
    pub version_marker: String,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 500,
            version_marker: DEFAULT_VERSION_MARKER.to_string(),
        }
    }
}

impl IntegrityConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_page_size = env_string(
            "DOCINTEGRITY_DEFAULT_PAGE_SIZE",
            &defaults.default_page_size.to_string(),
        )
        .parse::<u32>()
        .context("DOCINTEGRITY_DEFAULT_PAGE_SIZE must be u32")?;

        let max_page_size = env_string(
            "DOCINTEGRITY_MAX_PAGE_SIZE",
            &defaults.max_page_size.to_string(),
        )
        .parse::<u32>()
        .context("DOCINTEGRITY_MAX_PAGE_SIZE must be u32")?;

        let version_marker = env_string("DOCINTEGRITY_VERSION_MARKER", &defaults.version_marker);

        Self {
            default_page_size,
            max_page_size,
            version_marker,
        }
        .validated()
    }

    pub fn default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn max_page_size(mut self, page_size: u32) -> Self {
        self.max_page_size = page_size;
        self
    }

    pub fn version_marker(mut self, marker: impl Into<String>) -> Self {
        self.version_marker = marker.into();
        self
    }

    pub fn validated(self) -> Result<Self> {
        if self.default_page_size == 0 {
            bail!("default page size must be at least 1");
        }
        if self.max_page_size < self.default_page_size {
            bail!(
                "max page size {} is below the default page size {}",
                self.max_page_size,
                self.default_page_size
            );
        }
        if self.version_marker.trim().is_empty() {
            bail!("version marker field name must not be empty");
        }
        Ok(self)
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
