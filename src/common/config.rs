use serde::{Deserialize, Serialize};

/// Tunables for the dock layout engine.
///
/// Hosts usually load these from a TOML fragment of their own config file;
/// every field has a default so an empty table is valid.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DockSettings {
    /// Fraction of a panel's width/height that counts as an edge drop band.
    #[serde(default = "default_zone_fraction")]
    pub drop_zone_fraction: f64,
    /// Reject `add_tab` calls whose title already exists in the group.
    #[serde(default = "yes")]
    pub unique_tab_titles: bool,
    /// Opacity hint for the interactive floating clone during a drag.
    /// The core never paints; this is forwarded to the host as-is.
    #[serde(default = "default_clone_opacity")]
    pub drag_clone_opacity: f64,
    /// Smallest proportional share a pane may be resized down to.
    #[serde(default = "default_min_pane_fraction")]
    pub min_pane_fraction: f64,
}

fn default_zone_fraction() -> f64 { 0.2 }
fn default_clone_opacity() -> f64 { 0.6 }
fn default_min_pane_fraction() -> f64 { 0.05 }
fn yes() -> bool { true }

impl Default for DockSettings {
    fn default() -> Self {
        Self {
            drop_zone_fraction: default_zone_fraction(),
            unique_tab_titles: yes(),
            drag_clone_opacity: default_clone_opacity(),
            min_pane_fraction: default_min_pane_fraction(),
        }
    }
}

impl DockSettings {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> { toml::from_str(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_all_defaults() {
        let settings = DockSettings::from_toml("").unwrap();
        assert_eq!(settings, DockSettings::default());
    }

    #[test]
    fn partial_table_overrides_only_named_fields() {
        let settings = DockSettings::from_toml("drop_zone_fraction = 0.25\n").unwrap();
        assert_eq!(settings.drop_zone_fraction, 0.25);
        assert!(settings.unique_tab_titles);
        assert_eq!(settings.min_pane_fraction, 0.05);
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(DockSettings::from_toml("zone_fraction = 0.2\n").is_err());
    }
}
