//! Setup file handling for saving and loading installation configs.
//!
//! The on-disk format is a JSON document describing which components to
//! install at which versions, plus GPU support and dry-run flags. It is the
//! mutable editing surface; `into_configuration` converts it into the
//! validated, immutable `InstallationConfiguration` the orchestrator runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{ComponentSelection, DiskSpace, InstallationConfiguration, PackageInfo};
use crate::resolver;
use crate::types::{Component, GpuVendor};

/// One requested component in the setup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub component: Component,
    pub version: String,
    /// Optional explicit package metadata; resolver defaults apply when
    /// absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageInfo>,
}

/// Installation setup that can be saved/loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    pub components: Vec<ComponentEntry>,
    /// GPU vendor for driver support packages; None disables GPU support
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_support: Option<GpuVendor>,
    /// Filesystem path whose disk space bounds the installation
    pub disk_path: String,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SetupConfig {
    /// The standard Hyprland stack: compositor, bar, terminal, launcher,
    /// notifications, wallpaper.
    fn default() -> Self {
        let stack = [
            (Component::Hyprland, "0.45.0"),
            (Component::Waybar, "0.11.0"),
            (Component::Kitty, "0.38.0"),
            (Component::Wofi, "1.4.1"),
            (Component::Mako, "1.9.0"),
            (Component::Hyprpaper, "0.7.0"),
        ];
        Self {
            components: stack
                .iter()
                .map(|(component, version)| ComponentEntry {
                    component: *component,
                    version: (*version).to_string(),
                    package: None,
                })
                .collect(),
            gpu_support: None,
            disk_path: "/".to_string(),
            dry_run: false,
        }
    }
}

impl SetupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the setup to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize setup to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write setup to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load a setup from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read setup from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse setup JSON")?;

        Ok(config)
    }

    /// Validate the setup file's fields
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            anyhow::bail!("Setup must select at least one component");
        }

        for entry in &self.components {
            if entry.version.trim().is_empty() {
                anyhow::bail!("Component {} has an empty target version", entry.component);
            }
        }

        if self.disk_path.trim().is_empty() {
            anyhow::bail!("Disk path must be specified");
        }
        if !self.disk_path.starts_with('/') {
            anyhow::bail!(
                "Invalid disk path '{}': must be an absolute path",
                self.disk_path
            );
        }

        Ok(())
    }

    /// Convert into the validated immutable configuration, given the disk
    /// space captured for `disk_path`.
    ///
    /// GPU support folds the vendor's driver packages into the
    /// window-manager selection's dependency list, so the install loop
    /// stays one package per selection.
    pub fn into_configuration(self, disk: DiskSpace) -> crate::error::Result<InstallationConfiguration> {
        let gpu = self.gpu_support;
        let selections: crate::error::Result<Vec<ComponentSelection>> = self
            .components
            .into_iter()
            .map(|entry| {
                let package = apply_gpu_support(&entry, gpu);
                ComponentSelection::new(entry.component, entry.version, package)
            })
            .collect();

        InstallationConfiguration::new(selections?, gpu, disk, self.dry_run)
    }
}

/// Attach GPU driver packages as dependencies of the window-manager entry.
fn apply_gpu_support(entry: &ComponentEntry, gpu: Option<GpuVendor>) -> Option<PackageInfo> {
    let vendor = match gpu {
        Some(vendor) if entry.component == Component::Hyprland => vendor,
        _ => return entry.package.clone(),
    };

    let drivers: Vec<String> = resolver::gpu_driver_packages(vendor)
        .iter()
        .map(|p| p.to_string())
        .collect();

    match &entry.package {
        Some(package) => {
            let mut package = package.clone();
            for driver in drivers {
                if !package.dependencies.contains(&driver) {
                    package.dependencies.push(driver);
                }
            }
            Some(package)
        }
        None => Some(PackageInfo::new(
            resolver::package_name(entry.component),
            entry.version.clone(),
            0,
            drivers,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget_disk() -> DiskSpace {
        DiskSpace::new(20 * 1024 * 1024 * 1024, 40 * 1024 * 1024 * 1024, "/").unwrap()
    }

    #[test]
    fn test_default_stack_is_valid() {
        let config = SetupConfig::default();
        assert!(config.validate().is_ok());
        assert!(config
            .components
            .iter()
            .any(|e| e.component == Component::Hyprland));
    }

    #[test]
    fn test_validate_rejects_empty_components() {
        let config = SetupConfig {
            components: vec![],
            ..SetupConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_version() {
        let mut config = SetupConfig::default();
        config.components[0].version = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("empty target version"));
    }

    #[test]
    fn test_validate_rejects_relative_disk_path() {
        let config = SetupConfig {
            disk_path: "home/user".to_string(),
            ..SetupConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("setup.json");

        let config = SetupConfig::default();
        config.save_to_file(&path).unwrap();

        let loaded = SetupConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.components.len(), config.components.len());
        assert_eq!(loaded.disk_path, config.disk_path);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = SetupConfig::load_from_file("/nonexistent/setup.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read setup"));
    }

    #[test]
    fn test_into_configuration() {
        let config = SetupConfig::default();
        let configuration = config.into_configuration(budget_disk()).unwrap();
        assert_eq!(configuration.component_count(), 6);
        assert!(!configuration.is_dry_run());
    }

    #[test]
    fn test_gpu_support_folds_into_window_manager() {
        let config = SetupConfig {
            gpu_support: Some(GpuVendor::Nvidia),
            ..SetupConfig::default()
        };
        let configuration = config.into_configuration(budget_disk()).unwrap();

        let hyprland = configuration
            .components()
            .into_iter()
            .find(|s| s.component() == Component::Hyprland)
            .unwrap();
        let package = hyprland.package().unwrap().clone();
        assert!(package.dependencies.contains(&"nvidia".to_string()));
        assert!(package.dependencies.contains(&"egl-wayland".to_string()));

        // Other components are untouched
        let waybar = configuration
            .components()
            .into_iter()
            .find(|s| s.component() == Component::Waybar)
            .unwrap();
        assert!(waybar.package().is_none());
    }

    #[test]
    fn test_gpu_support_preserves_existing_metadata() {
        let mut config = SetupConfig::default();
        config.gpu_support = Some(GpuVendor::Amd);
        config.components[0].package = Some(PackageInfo::new(
            "hyprland-git",
            "0.45.0",
            15 * 1024 * 1024,
            vec!["mesa".to_string()],
        ));

        let configuration = config.into_configuration(budget_disk()).unwrap();
        let hyprland = configuration
            .components()
            .into_iter()
            .find(|s| s.component() == Component::Hyprland)
            .unwrap();
        let package = hyprland.package().unwrap().clone();

        assert_eq!(package.name, "hyprland-git");
        // mesa was already listed; it is not duplicated
        assert_eq!(
            package.dependencies.iter().filter(|d| *d == "mesa").count(),
            1
        );
        assert!(package.dependencies.contains(&"vulkan-radeon".to_string()));
    }
}
