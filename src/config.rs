//! Validated installation configuration value objects.
//!
//! Everything in this module is immutable once constructed: the validated
//! constructors are the only way in, fields are private, and accessors hand
//! out copies rather than references into internal state.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SetupError};
use crate::types::{Component, GpuVendor};

/// Disk space on a filesystem, captured or budgeted in bytes.
///
/// Invariant: `available_bytes <= total_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSpace {
    available_bytes: u64,
    total_bytes: u64,
    path: String,
}

impl DiskSpace {
    /// Create a validated disk space value.
    pub fn new(available_bytes: u64, total_bytes: u64, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SetupError::validation("disk space path must not be empty"));
        }
        if available_bytes > total_bytes {
            return Err(SetupError::validation(format!(
                "available bytes ({}) exceed total bytes ({}) for {}",
                available_bytes, total_bytes, path
            )));
        }
        Ok(Self {
            available_bytes,
            total_bytes,
            path,
        })
    }

    #[inline]
    pub fn available_bytes(&self) -> u64 {
        self.available_bytes
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fraction of the filesystem already in use, 0.0 to 1.0.
    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        1.0 - (self.available_bytes as f64 / self.total_bytes as f64)
    }
}

impl std::fmt::Display for DiskSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} free of {})",
            self.path,
            humanize_size(self.available_bytes),
            humanize_size(self.total_bytes)
        )
    }
}

/// Convert bytes to a human-readable size string.
pub(crate) fn humanize_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Concrete package metadata behind a component selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub size_bytes: u64,
    pub dependencies: Vec<String>,
}

impl PackageInfo {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        size_bytes: u64,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            size_bytes,
            dependencies,
        }
    }
}

/// A requested piece of software with its target version.
///
/// Invariant: the target version is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSelection {
    component: Component,
    version: String,
    package: Option<PackageInfo>,
}

impl ComponentSelection {
    /// Create a validated component selection.
    pub fn new(
        component: Component,
        version: impl Into<String>,
        package: Option<PackageInfo>,
    ) -> Result<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(SetupError::validation(format!(
                "component {} has an empty target version",
                component
            )));
        }
        Ok(Self {
            component,
            version,
            package,
        })
    }

    #[inline]
    pub fn component(&self) -> Component {
        self.component
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn package(&self) -> Option<&PackageInfo> {
        self.package.as_ref()
    }

    /// The pacman package name to install for this selection.
    ///
    /// Explicit package metadata wins; otherwise the component's default
    /// package name from the resolver tables is used.
    pub fn package_name(&self) -> String {
        match &self.package {
            Some(info) => info.name.clone(),
            None => crate::resolver::package_name(self.component).to_string(),
        }
    }
}

/// Validated, immutable description of one installation attempt's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationConfiguration {
    components: Vec<ComponentSelection>,
    gpu: Option<GpuVendor>,
    disk: DiskSpace,
    dry_run: bool,
}

impl InstallationConfiguration {
    /// Create a validated configuration.
    ///
    /// Requires at least one component selection. Disk space consistency is
    /// enforced by the `DiskSpace` constructor.
    pub fn new(
        components: Vec<ComponentSelection>,
        gpu: Option<GpuVendor>,
        disk: DiskSpace,
        dry_run: bool,
    ) -> Result<Self> {
        if components.is_empty() {
            return Err(SetupError::validation(
                "configuration must select at least one component",
            ));
        }
        Ok(Self {
            components,
            gpu,
            disk,
            dry_run,
        })
    }

    /// The ordered component selections. Returns a copy; the internal
    /// sequence is never handed out.
    pub fn components(&self) -> Vec<ComponentSelection> {
        self.components.clone()
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn gpu(&self) -> Option<GpuVendor> {
        self.gpu
    }

    pub fn disk(&self) -> &DiskSpace {
        &self.disk
    }

    #[inline]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
