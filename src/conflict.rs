//! Package conflict detection & resolution
//!
//! Inspects a configuration's component selections for incompatibilities
//! before any installation side effect happens, and applies resolution
//! strategies to individual conflicts.
//!
//! # Detection Rules
//!
//! | Collision | Kind |
//! |-----------|------|
//! | Same component selected twice | `DuplicateComponent` |
//! | Two daemons in an exclusive session role (notifications, wallpaper, lock screen) | `ServiceCollision` |
//! | Two terminals or two launchers claiming the same generated keybinding | `FileCollision` |
//!
//! # Design
//!
//! - **Pure detection**: `detect_conflicts` never mutates anything and runs
//!   before `start_installing`, so a bad configuration is rejected cheaply
//! - **Resolution is a decision, not an action**: `resolve` returns what the
//!   orchestrator should do (drop selections, merge configs); applying it is
//!   the orchestrator's job

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::config::ComponentSelection;
use crate::error::{Result, SetupError};
use crate::types::{Component, ComponentCategory, ConflictKind, ResolutionStrategy};

/// A detected incompatibility between two or more component selections.
///
/// Carries the selections involved so it can be resolved without going back
/// to the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConflict {
    selections: Vec<ComponentSelection>,
    kind: ConflictKind,
    detail: String,
}

impl PackageConflict {
    fn new(selections: Vec<ComponentSelection>, kind: ConflictKind, detail: String) -> Self {
        Self {
            selections,
            kind,
            detail,
        }
    }

    /// The components involved, in selection order.
    pub fn components(&self) -> Vec<Component> {
        self.selections.iter().map(|s| s.component()).collect()
    }

    pub fn selections(&self) -> &[ComponentSelection] {
        &self.selections
    }

    #[inline]
    pub fn kind(&self) -> ConflictKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for PackageConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.components().iter().map(|c| c.to_string()).collect();
        write!(f, "{} [{}]: {}", self.kind, names.join(", "), self.detail)
    }
}

/// What the orchestrator should do about one resolved conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Remove these components from the install list
    DropComponents(Vec<Component>),
    /// Keep all involved components; merge their generated configuration
    /// during the Configuring phase
    MergeConfigs,
}

/// Detects conflicts in component selections and applies resolution
/// strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn new() -> Self {
        Self
    }

    /// Inspect selections for incompatibilities. Pure; returns an empty
    /// vector when the configuration is clean.
    pub fn detect_conflicts(&self, selections: &[ComponentSelection]) -> Vec<PackageConflict> {
        let mut conflicts = Vec::new();

        // Duplicate selections of the same component
        for (i, first) in selections.iter().enumerate() {
            for second in selections.iter().skip(i + 1) {
                if first.component() == second.component() {
                    conflicts.push(PackageConflict::new(
                        vec![first.clone(), second.clone()],
                        ConflictKind::DuplicateComponent,
                        format!("{} is selected more than once", first.component()),
                    ));
                }
            }
        }

        // Role collisions between distinct components
        for (i, first) in selections.iter().enumerate() {
            for second in selections.iter().skip(i + 1) {
                if first.component() == second.component() {
                    continue; // already reported as a duplicate
                }
                let category = first.component().category();
                if category != second.component().category() {
                    continue;
                }
                if category.is_exclusive() {
                    conflicts.push(PackageConflict::new(
                        vec![first.clone(), second.clone()],
                        ConflictKind::ServiceCollision,
                        format!(
                            "{} and {} both provide the {} role",
                            first.component(),
                            second.component(),
                            category
                        ),
                    ));
                } else if claims_generated_keybinding(category) {
                    conflicts.push(PackageConflict::new(
                        vec![first.clone(), second.clone()],
                        ConflictKind::FileCollision,
                        format!(
                            "{} and {} both claim the default {} keybinding",
                            first.component(),
                            second.component(),
                            category
                        ),
                    ));
                }
            }
        }

        conflicts
    }

    /// Apply one resolution strategy to one conflict.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the strategy cannot resolve this kind
    /// of collision (e.g. `MergeConfigs` on a `ServiceCollision`, or
    /// `PreferNewer` when the target versions cannot be compared).
    pub fn resolve(
        &self,
        conflict: &PackageConflict,
        strategy: ResolutionStrategy,
    ) -> Result<ConflictResolution> {
        match strategy {
            ResolutionStrategy::SkipComponent => {
                // Drop everything after the first-listed selection
                let dropped = conflict
                    .selections()
                    .iter()
                    .skip(1)
                    .map(|s| s.component())
                    .collect();
                Ok(ConflictResolution::DropComponents(dropped))
            }
            ResolutionStrategy::PreferNewer => self.resolve_prefer_newer(conflict),
            ResolutionStrategy::MergeConfigs => {
                if conflict.kind() == ConflictKind::FileCollision {
                    Ok(ConflictResolution::MergeConfigs)
                } else {
                    Err(SetupError::conflict(format!(
                        "merge-configs cannot resolve a {} ({})",
                        conflict.kind(),
                        conflict.detail()
                    )))
                }
            }
        }
    }

    /// Keep the selection with the newest target version, drop the rest.
    fn resolve_prefer_newer(&self, conflict: &PackageConflict) -> Result<ConflictResolution> {
        let mut newest: Option<(usize, Version)> = None;
        for (i, selection) in conflict.selections().iter().enumerate() {
            let version = parse_version(selection.version()).ok_or_else(|| {
                SetupError::conflict(format!(
                    "prefer-newer cannot compare unparseable version '{}' for {}",
                    selection.version(),
                    selection.component()
                ))
            })?;
            match &newest {
                Some((_, best)) if version <= *best => {}
                _ => newest = Some((i, version)),
            }
        }

        let keep = match newest {
            Some((i, _)) => i,
            None => {
                return Err(SetupError::conflict(
                    "prefer-newer applied to a conflict with no selections",
                ))
            }
        };

        let dropped = conflict
            .selections()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != keep)
            .map(|(_, s)| s.component())
            .collect();
        Ok(ConflictResolution::DropComponents(dropped))
    }
}

/// Non-exclusive roles whose components still collide on the generated
/// default keybinding in hyprland.conf.
const fn claims_generated_keybinding(category: ComponentCategory) -> bool {
    matches!(
        category,
        ComponentCategory::Terminal | ComponentCategory::Launcher
    )
}

/// Parse a target version leniently: missing minor/patch segments are
/// padded with zeros ("0.11" compares as "0.11.0").
fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }
    let segments = raw.split('.').count();
    if segments == 0 || segments >= 3 {
        return None;
    }
    let padded = format!("{}{}", raw, ".0".repeat(3 - segments));
    Version::parse(&padded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(component: Component, version: &str) -> ComponentSelection {
        ComponentSelection::new(component, version, None).unwrap()
    }

    fn resolver() -> ConflictResolver {
        ConflictResolver::new()
    }

    // =========================================================================
    // Detection Tests
    // =========================================================================

    #[test]
    fn test_clean_stack_has_no_conflicts() {
        let selections = vec![
            selection(Component::Hyprland, "0.45.0"),
            selection(Component::Waybar, "0.11.0"),
            selection(Component::Kitty, "0.38.0"),
            selection(Component::Wofi, "1.4.1"),
            selection(Component::Mako, "1.9.0"),
        ];
        assert!(resolver().detect_conflicts(&selections).is_empty());
    }

    #[test]
    fn test_duplicate_component_detected() {
        let selections = vec![
            selection(Component::Hyprland, "0.45.0"),
            selection(Component::Hyprland, "0.44.0"),
        ];
        let conflicts = resolver().detect_conflicts(&selections);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::DuplicateComponent);
        assert!(conflicts[0].detail().contains("more than once"));
    }

    #[test]
    fn test_notification_daemons_collide() {
        let selections = vec![
            selection(Component::Mako, "1.9.0"),
            selection(Component::Dunst, "1.11.0"),
        ];
        let conflicts = resolver().detect_conflicts(&selections);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::ServiceCollision);
        assert_eq!(
            conflicts[0].components(),
            vec![Component::Mako, Component::Dunst]
        );
    }

    #[test]
    fn test_wallpaper_and_locker_collide() {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Hyprpaper, "0.7.0"),
            selection(Component::Swww, "0.9.5"),
            selection(Component::Swaylock, "1.8.0"),
            selection(Component::Hyprlock, "0.5.0"),
        ]);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts
            .iter()
            .all(|c| c.kind() == ConflictKind::ServiceCollision));
    }

    #[test]
    fn test_two_terminals_are_a_file_collision() {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Kitty, "0.38.0"),
            selection(Component::Alacritty, "0.14.0"),
        ]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::FileCollision);
        assert!(conflicts[0].detail().contains("keybinding"));
    }

    #[test]
    fn test_two_launchers_are_a_file_collision() {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Wofi, "1.4.1"),
            selection(Component::Rofi, "1.7.8"),
        ]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind(), ConflictKind::FileCollision);
    }

    #[test]
    fn test_status_bar_and_terminal_do_not_collide() {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Waybar, "0.11.0"),
            selection(Component::Kitty, "0.38.0"),
        ]);
        assert!(conflicts.is_empty());
    }

    // =========================================================================
    // Resolution Tests
    // =========================================================================

    fn service_conflict() -> PackageConflict {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Mako, "1.9.0"),
            selection(Component::Dunst, "1.11.0"),
        ]);
        conflicts.into_iter().next().unwrap()
    }

    fn file_conflict() -> PackageConflict {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Kitty, "0.38.0"),
            selection(Component::Alacritty, "0.14.0"),
        ]);
        conflicts.into_iter().next().unwrap()
    }

    #[test]
    fn test_skip_component_drops_later_listed() {
        let resolution = resolver()
            .resolve(&service_conflict(), ResolutionStrategy::SkipComponent)
            .unwrap();
        assert_eq!(
            resolution,
            ConflictResolution::DropComponents(vec![Component::Dunst])
        );
    }

    #[test]
    fn test_prefer_newer_keeps_newest_version() {
        // dunst 1.11.0 is newer than mako 1.9.0, so mako is dropped
        let resolution = resolver()
            .resolve(&service_conflict(), ResolutionStrategy::PreferNewer)
            .unwrap();
        assert_eq!(
            resolution,
            ConflictResolution::DropComponents(vec![Component::Mako])
        );
    }

    #[test]
    fn test_prefer_newer_unparseable_version_is_unresolvable() {
        let conflicts = resolver().detect_conflicts(&[
            selection(Component::Mako, "latest"),
            selection(Component::Dunst, "1.11.0"),
        ]);
        let err = resolver()
            .resolve(&conflicts[0], ResolutionStrategy::PreferNewer)
            .unwrap_err();
        assert!(err.to_string().contains("unparseable"));
    }

    #[test]
    fn test_merge_configs_valid_only_for_file_collisions() {
        let resolution = resolver()
            .resolve(&file_conflict(), ResolutionStrategy::MergeConfigs)
            .unwrap();
        assert_eq!(resolution, ConflictResolution::MergeConfigs);

        let err = resolver()
            .resolve(&service_conflict(), ResolutionStrategy::MergeConfigs)
            .unwrap_err();
        assert!(matches!(err, SetupError::Conflict(_)));
    }

    #[test]
    fn test_parse_version_lenient() {
        assert_eq!(parse_version("1.2.3"), Version::parse("1.2.3").ok());
        assert_eq!(parse_version("0.11"), Version::parse("0.11.0").ok());
        assert_eq!(parse_version("2"), Version::parse("2.0.0").ok());
        assert!(parse_version("latest").is_none());
        assert!(parse_version("").is_none());
    }

    #[test]
    fn test_conflict_display() {
        let conflict = service_conflict();
        let rendered = conflict.to_string();
        assert!(rendered.contains("service-collision"));
        assert!(rendered.contains("mako"));
        assert!(rendered.contains("dunst"));
    }
}
