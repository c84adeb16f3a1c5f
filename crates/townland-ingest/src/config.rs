//! Pipeline configuration

use serde::{Deserialize, Serialize};

use townland_core::GeometryIdConvention;
use townland_spatial::Crs;

/// Admin Hierarchy Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeLoadConfig {
    /// Records per durable commit
    pub batch_size: usize,
}

impl Default for AttributeLoadConfig {
    fn default() -> Self {
        Self { batch_size: 1000 }
    }
}

impl AttributeLoadConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Geometry Ingestion Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryLoadConfig {
    /// Coordinate reference of every input feature
    pub source_crs: Crs,
    /// How feature ids map onto townland keys
    pub id_convention: GeometryIdConvention,
    /// Feature property copied onto the townland as its cross-reference id
    pub cross_reference_property: String,
    /// Features per durable commit
    pub batch_size: usize,
}

impl Default for GeometryLoadConfig {
    fn default() -> Self {
        Self {
            source_crs: Crs::Wgs84,
            id_convention: GeometryIdConvention::NegatedRelation,
            cross_reference_property: "wikidata".to_string(),
            batch_size: 200,
        }
    }
}

impl GeometryLoadConfig {
    pub fn with_source_crs(mut self, crs: Crs) -> Self {
        self.source_crs = crs;
        self
    }

    pub fn with_id_convention(mut self, convention: GeometryIdConvention) -> Self {
        self.id_convention = convention;
        self
    }

    pub fn with_cross_reference_property(mut self, property: impl Into<String>) -> Self {
        self.cross_reference_property = property.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Adjacency Ingestion Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencyLoadConfig {
    /// Also materialise the reverse of every loaded edge
    pub symmetrize: bool,
    /// Records per durable commit
    pub batch_size: usize,
}

impl Default for AdjacencyLoadConfig {
    fn default() -> Self {
        Self {
            symmetrize: false,
            batch_size: 500,
        }
    }
}

impl AdjacencyLoadConfig {
    pub fn with_symmetrize(mut self, symmetrize: bool) -> Self {
        self.symmetrize = symmetrize;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
