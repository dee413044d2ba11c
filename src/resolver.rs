//! Package & config-path resolver
//!
//! Translates high-level component selections into concrete pacman package
//! names, GPU driver package lists, and the user configuration paths each
//! component owns.
//!
//! # Design
//!
//! - **No hardcoded strings elsewhere**: every package name and config path
//!   lives in this module's tables
//! - **Deduplication**: list output is deduplicated and sorted for
//!   deterministic results
//! - **Pure logic**: no I/O and no side effects, only name resolution
//!
//! # What This Explicitly Refuses To Do
//!
//! - Validate package existence: that's the package manager's job at
//!   install time
//! - Resolve transitive dependencies: pacman handles those

use crate::config::InstallationConfiguration;
use crate::types::{Component, GpuVendor};

/// GPU driver package sets, by vendor.
pub mod gpu_packages {
    pub const NVIDIA: &[&str] = &["nvidia", "nvidia-utils", "egl-wayland"];
    pub const AMD: &[&str] = &["mesa", "vulkan-radeon", "libva-mesa-driver"];
    pub const INTEL: &[&str] = &["mesa", "vulkan-intel", "intel-media-driver"];
    /// Auto selects the common Mesa baseline; vendor-specific extras are
    /// left to the host's existing driver setup.
    pub const AUTO: &[&str] = &["mesa"];
}

/// The pacman package installed for a component when the selection carries
/// no explicit package metadata.
pub const fn package_name(component: Component) -> &'static str {
    match component {
        Component::Hyprland => "hyprland",
        Component::Waybar => "waybar",
        Component::Kitty => "kitty",
        Component::Alacritty => "alacritty",
        Component::Wofi => "wofi",
        Component::Rofi => "rofi-wayland",
        Component::Mako => "mako",
        Component::Dunst => "dunst",
        Component::Hyprpaper => "hyprpaper",
        Component::Swww => "swww",
        Component::Swaylock => "swaylock",
        Component::Hyprlock => "hyprlock",
    }
}

/// The user config directory a component owns, relative to `~/.config`.
///
/// These are the paths the system snapshot scans for pre-existing files and
/// the configuring phase backs up or merges.
pub const fn config_dir(component: Component) -> &'static str {
    match component {
        Component::Hyprland => "hypr",
        Component::Waybar => "waybar",
        Component::Kitty => "kitty",
        Component::Alacritty => "alacritty",
        Component::Wofi => "wofi",
        Component::Rofi => "rofi",
        Component::Mako => "mako",
        Component::Dunst => "dunst",
        Component::Hyprpaper => "hypr",
        Component::Swww => "swww",
        Component::Swaylock => "swaylock",
        Component::Hyprlock => "hypr",
    }
}

/// The primary configuration file a component reads, relative to its
/// config directory.
pub const fn config_file_name(component: Component) -> &'static str {
    match component {
        Component::Hyprland => "hyprland.conf",
        Component::Waybar => "config.jsonc",
        Component::Kitty => "kitty.conf",
        Component::Alacritty => "alacritty.toml",
        Component::Wofi => "config",
        Component::Rofi => "config.rasi",
        Component::Mako => "config",
        Component::Dunst => "dunstrc",
        Component::Hyprpaper => "hyprpaper.conf",
        Component::Swww => "config",
        Component::Swaylock => "config",
        Component::Hyprlock => "hyprlock.conf",
    }
}

/// GPU driver packages for a vendor.
pub fn gpu_driver_packages(vendor: GpuVendor) -> &'static [&'static str] {
    match vendor {
        GpuVendor::Nvidia => gpu_packages::NVIDIA,
        GpuVendor::Amd => gpu_packages::AMD,
        GpuVendor::Intel => gpu_packages::INTEL,
        GpuVendor::Auto => gpu_packages::AUTO,
    }
}

/// Resolve every package name a configuration implies: one per component
/// selection plus GPU driver packages when GPU support is enabled.
///
/// Returns a deduplicated, sorted `Vec<String>` ready for verification
/// against the package database.
pub fn resolve_packages(config: &InstallationConfiguration) -> Vec<String> {
    let mut packages: Vec<String> = config
        .components()
        .iter()
        .map(|selection| selection.package_name())
        .collect();

    if let Some(vendor) = config.gpu() {
        packages.extend(gpu_driver_packages(vendor).iter().map(|p| p.to_string()));
    }

    packages.sort();
    packages.dedup();
    packages
}
