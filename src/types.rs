//! Type-safe domain types for hyprsetup
//!
//! This module replaces stringly-typed component and strategy values with
//! proper Rust enums that provide compile-time validation and exhaustive
//! matching.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A piece of the desktop stack that can be selected for installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Component {
    /// Wayland compositor / window manager
    #[strum(serialize = "hyprland")]
    Hyprland,
    /// Status bar
    #[strum(serialize = "waybar")]
    Waybar,
    /// Terminal emulator
    #[strum(serialize = "kitty")]
    Kitty,
    /// Terminal emulator (alternative)
    #[strum(serialize = "alacritty")]
    Alacritty,
    /// Application launcher
    #[strum(serialize = "wofi")]
    Wofi,
    /// Application launcher (alternative)
    #[strum(serialize = "rofi")]
    Rofi,
    /// Notification daemon
    #[strum(serialize = "mako")]
    Mako,
    /// Notification daemon (alternative)
    #[strum(serialize = "dunst")]
    Dunst,
    /// Wallpaper daemon
    #[strum(serialize = "hyprpaper")]
    Hyprpaper,
    /// Wallpaper daemon (alternative)
    #[strum(serialize = "swww")]
    Swww,
    /// Screen locker
    #[strum(serialize = "swaylock")]
    Swaylock,
    /// Screen locker (alternative)
    #[strum(serialize = "hyprlock")]
    Hyprlock,
}

impl Component {
    /// The role this component fills in the desktop stack.
    pub const fn category(self) -> ComponentCategory {
        match self {
            Self::Hyprland => ComponentCategory::WindowManager,
            Self::Waybar => ComponentCategory::StatusBar,
            Self::Kitty | Self::Alacritty => ComponentCategory::Terminal,
            Self::Wofi | Self::Rofi => ComponentCategory::Launcher,
            Self::Mako | Self::Dunst => ComponentCategory::NotificationDaemon,
            Self::Hyprpaper | Self::Swww => ComponentCategory::Wallpaper,
            Self::Swaylock | Self::Hyprlock => ComponentCategory::LockScreen,
        }
    }
}

/// Roles within the desktop stack.
///
/// Some roles are exclusive: two daemons cannot both own the session's
/// notification bus, wallpaper surface, or lock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum ComponentCategory {
    #[strum(serialize = "window-manager")]
    WindowManager,
    #[strum(serialize = "status-bar")]
    StatusBar,
    #[strum(serialize = "terminal")]
    Terminal,
    #[strum(serialize = "launcher")]
    Launcher,
    #[strum(serialize = "notification-daemon")]
    NotificationDaemon,
    #[strum(serialize = "wallpaper")]
    Wallpaper,
    #[strum(serialize = "lock-screen")]
    LockScreen,
}

impl ComponentCategory {
    /// Whether at most one component of this role may be installed.
    pub const fn is_exclusive(self) -> bool {
        matches!(
            self,
            Self::WindowManager | Self::NotificationDaemon | Self::Wallpaper | Self::LockScreen
        )
    }
}

/// GPU vendor for optional driver support packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum GpuVendor {
    #[default]
    #[strum(serialize = "Auto")]
    Auto,
    #[strum(serialize = "NVIDIA")]
    Nvidia,
    #[strum(serialize = "AMD")]
    Amd,
    #[strum(serialize = "Intel")]
    Intel,
}

/// Policy for resolving a single detected package conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum ResolutionStrategy {
    /// Keep the selection with the newer target version, drop the other
    #[default]
    #[strum(serialize = "prefer-newer")]
    PreferNewer,
    /// Drop the later-listed selection
    #[strum(serialize = "skip-component")]
    SkipComponent,
    /// Keep both and merge their generated configuration (file collisions only)
    #[strum(serialize = "merge-configs")]
    MergeConfigs,
}

/// The kind of collision between two or more component selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum ConflictKind {
    /// The same component was selected more than once
    #[strum(serialize = "duplicate-component")]
    DuplicateComponent,
    /// Two daemons claim the same exclusive session role
    #[strum(serialize = "service-collision")]
    ServiceCollision,
    /// Two components claim the same generated configuration binding
    #[strum(serialize = "file-collision")]
    FileCollision,
}

/// Final outcome of a terminated session, as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum InstallOutcome {
    #[strum(serialize = "success")]
    Success,
    #[strum(serialize = "failed")]
    Failed,
}
