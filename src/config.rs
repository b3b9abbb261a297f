//! Engine configuration
//!
//! Deserialized from JSON at startup; every field has a default so a partial
//! config file (or none at all) still yields a runnable engine.

use serde::{Deserialize, Serialize};

use crate::effects::{PanelMode, SystemMode};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial frame width in pixels; later inputs may resize the engine.
    pub width: u32,
    pub height: u32,
    /// Number of chained display panels.
    pub num_panels: usize,
    pub panel_mode: PanelMode,
    pub system_mode: SystemMode,
    pub auto_cycle: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // three 64x64 panels chained side by side
        Self {
            width: 192,
            height: 64,
            num_panels: 3,
            panel_mode: PanelMode::Extend,
            system_mode: SystemMode::Ambient,
            auto_cycle: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("bad engine config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "frame size {}x{} must be nonzero",
                self.width, self.height
            ));
        }
        if self.num_panels == 0 {
            return Err("num_panels must be at least 1".into());
        }
        if (self.width as usize) < self.num_panels {
            return Err(format!(
                "width {} cannot be split across {} panels",
                self.width, self.num_panels
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg = EngineConfig::from_json(r#"{"num_panels": 2, "auto_cycle": false}"#).unwrap();
        assert_eq!(cfg.num_panels, 2);
        assert!(!cfg.auto_cycle);
        assert_eq!(cfg.width, 192);
        assert_eq!(cfg.panel_mode, PanelMode::Extend);
    }

    #[test]
    fn rejects_degenerate_sizes() {
        let mut cfg = EngineConfig::default();
        cfg.width = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.num_panels = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.width = 2;
        cfg.num_panels = 3;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(EngineConfig::from_json("{nope").is_err());
    }
}
