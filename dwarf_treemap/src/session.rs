//! One loaded image, its resolved variable forest, and the treemap derived from it.

use std::path::Path;

use tracing::{debug, info};

use crate::analysis::{self, DebugImage, UnitVariables};
use crate::config::TreemapConfig;
use crate::error::TreemapError;
use crate::model::{OverviewNode, TreemapRect, Variable};
use crate::overview;
use crate::partition::{self, PartitionOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded { units: usize, variables: usize },
    NoDebugInfo,
}

/// Owns the configuration, the loaded forest, and the current rectangle list.
///
/// Loading a new image or changing anything that affects the layout marks the rectangles
/// stale; they are rebuilt wholesale on the next [`Session::treemap`] call.
#[derive(Debug)]
pub struct Session {
    config: TreemapConfig,
    image: Option<DebugImage>,
    units: Vec<UnitVariables>,
    treemap: Option<Vec<TreemapRect>>,
}

impl Session {
    pub fn new(config: TreemapConfig) -> Result<Self, TreemapError> {
        config.validate()?;
        Ok(Self {
            config,
            image: None,
            units: Vec::new(),
            treemap: None,
        })
    }

    pub fn config(&self) -> &TreemapConfig {
        &self.config
    }

    pub fn load_path(&mut self, binary_path: &Path) -> Result<LoadStatus, TreemapError> {
        let data = analysis::read_image_bytes(binary_path)?;
        self.load_bytes(&data)
    }

    /// Replaces whatever was loaded before. On error the session is left empty.
    pub fn load_bytes(&mut self, data: &[u8]) -> Result<LoadStatus, TreemapError> {
        self.image = None;
        self.units.clear();
        self.treemap = None;

        let image = analysis::load_image(data)?;
        Ok(self.install_image(image))
    }

    pub fn load_image(&mut self, image: DebugImage) -> LoadStatus {
        self.treemap = None;
        self.install_image(image)
    }

    fn install_image(&mut self, image: DebugImage) -> LoadStatus {
        if !image.has_debug_info() {
            info!("image has no debug information");
            self.image = None;
            self.units.clear();
            return LoadStatus::NoDebugInfo;
        }

        self.units = analysis::collect_image(&image, self.config.address_range);
        self.image = Some(image);
        let status = LoadStatus::Loaded {
            units: self.units.len(),
            variables: self.variables().count(),
        };
        debug!(?status, "image loaded");
        status
    }

    pub fn units(&self) -> &[UnitVariables] {
        &self.units
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.units.iter().flat_map(|unit| unit.variables.iter())
    }

    pub fn is_stale(&self) -> bool {
        self.treemap.is_none()
    }

    pub fn set_max_depth(&mut self, max_depth: u32) -> Result<(), TreemapError> {
        let config = TreemapConfig {
            max_depth,
            ..self.config.clone()
        };
        self.set_config(config)
    }

    /// Applies a new configuration, re-collecting variables if the address filter changed.
    pub fn set_config(&mut self, config: TreemapConfig) -> Result<(), TreemapError> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        let range_changed = config.address_range != self.config.address_range;
        self.config = config;
        self.treemap = None;
        if range_changed && let Some(image) = &self.image {
            self.units = analysis::collect_image(image, self.config.address_range);
        }
        Ok(())
    }

    pub fn treemap(&mut self) -> &[TreemapRect] {
        if self.treemap.is_none() {
            let options = PartitionOptions {
                depth: self.config.depth_budget(),
                border: self.config.border,
            };
            let rects = partition::partition(self.variables(), self.config.bounds(), options);
            debug!(rects = rects.len(), ?options, "treemap rebuilt");
            self.treemap = Some(rects);
        }
        self.treemap.as_deref().unwrap_or_default()
    }

    pub fn overview(&self) -> Vec<OverviewNode> {
        overview::overview(self.variables(), self.config.depth_budget())
    }
}
