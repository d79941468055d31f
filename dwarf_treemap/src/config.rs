use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TreemapError;
use crate::layout::Rect;
use crate::model::AddressRange;

pub const MIN_DEPTH: u32 = 1;
pub const MAX_DEPTH: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TreemapConfig {
    pub width: f64,
    pub height: f64,
    pub border: f64,
    /// Levels shown, counting the top-level variables as the first.
    pub max_depth: u32,
    pub address_range: Option<AddressRange>,
}

impl Default for TreemapConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 800.0,
            border: 2.0,
            max_depth: MAX_DEPTH,
            address_range: None,
        }
    }
}

impl TreemapConfig {
    /// Reads a TOML config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, TreemapError> {
        let text = std::fs::read_to_string(path).map_err(|source| TreemapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TreemapConfig =
            toml::from_str(&text).map_err(|error| TreemapError::ConfigParse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TreemapError> {
        let invalid = |message: String| Err(TreemapError::InvalidConfig { message });
        if !has_positive_extent(self.width) || !has_positive_extent(self.height) {
            return invalid(format!(
                "canvas must have a positive area, got {}x{}",
                self.width, self.height
            ));
        }
        if self.border.is_nan() || self.border < 0.0 {
            return invalid(format!("border must not be negative, got {}", self.border));
        }
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.max_depth) {
            return invalid(format!(
                "max-depth must be between {MIN_DEPTH} and {MAX_DEPTH}, got {}",
                self.max_depth
            ));
        }
        if let Some(range) = self.address_range
            && range.low > range.high
        {
            return invalid(format!(
                "address range is inverted: 0x{:x} > 0x{:x}",
                range.low, range.high
            ));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Composite levels the partitioner may expand below the top-level variables.
    pub fn depth_budget(&self) -> u32 {
        self.max_depth.saturating_sub(1)
    }
}

fn has_positive_extent(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Parses `0x`-prefixed hexadecimal or plain decimal addresses.
pub fn parse_address(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|error| format!("invalid address {text:?}: {error}"))
}
