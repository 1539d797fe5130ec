//! Serde model of a hierarchy description document.
//!
//! ```json
//! {
//!   "properties": { "Height": { "minimum": 1, "maximum": 240 } },
//!   "geometricError": 500,
//!   "root": {
//!     "boundingVolume": { "sphere": [0, 0, 0, 100] },
//!     "geometricError": 100,
//!     "refine": "REPLACE",
//!     "content": { "url": "root.b3dm" },
//!     "children": [ ... ]
//!   }
//! }
//! ```

use canopy_cull::{Aabb, BoundingSphere, BoundingVolume};
use glam::DVec3;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DescriptionError;
use crate::tile::Refinement;

/// Content URLs with this suffix point at another hierarchy description.
pub const HIERARCHY_SUFFIX: &str = ".json";

/// Top-level hierarchy description.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetDescription {
    /// Root tile record.
    pub root: TileDescription,
    /// Opaque per-tileset metadata.
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Error of rendering nothing at all.
    pub geometric_error: f64,
}

impl TilesetDescription {
    /// Parse and validate the top-level fields of a description.
    ///
    /// Per-tile fields are validated when the hierarchy is built.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DescriptionError> {
        let description: Self = serde_json::from_slice(bytes).map_err(DescriptionError::Parse)?;
        validate_geometric_error(description.geometric_error)?;
        Ok(description)
    }
}

/// One tile record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDescription {
    pub bounding_volume: BoundingVolumeDescription,
    pub geometric_error: f64,
    /// Refinement policy; inherited from the parent when absent.
    #[serde(default)]
    pub refine: Option<RefineDescription>,
    #[serde(default)]
    pub content: Option<ContentDescription>,
    #[serde(default)]
    pub children: Vec<TileDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RefineDescription {
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "REPLACE")]
    Replace,
}

impl From<RefineDescription> for Refinement {
    fn from(refine: RefineDescription) -> Self {
        match refine {
            RefineDescription::Add => Refinement::Add,
            RefineDescription::Replace => Refinement::Replace,
        }
    }
}

/// A tile's content reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescription {
    /// Payload location, relative to the describing document or absolute.
    pub url: String,
    /// Optional volume tighter than the tile's own.
    #[serde(default)]
    pub bounding_volume: Option<BoundingVolumeDescription>,
}

impl ContentDescription {
    /// Whether the URL names another hierarchy description.
    pub fn is_hierarchy(&self) -> bool {
        self.url.ends_with(HIERARCHY_SUFFIX)
    }
}

/// Bounding volume as written in the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingVolumeDescription {
    /// Centre followed by three half-axis vectors.
    #[serde(rename = "box", default)]
    pub oriented_box: Option<Vec<f64>>,
    /// Centre followed by radius.
    #[serde(default)]
    pub sphere: Option<Vec<f64>>,
}

impl BoundingVolumeDescription {
    /// Convert into a culling volume. A box wins when both are given.
    pub fn to_volume(&self) -> Result<BoundingVolume, DescriptionError> {
        if let Some(values) = &self.oriented_box {
            let v = expect_len("box", values, 12)?;
            let center = DVec3::new(v[0], v[1], v[2]);
            let axes = [
                DVec3::new(v[3], v[4], v[5]),
                DVec3::new(v[6], v[7], v[8]),
                DVec3::new(v[9], v[10], v[11]),
            ];
            return Ok(Aabb::from_oriented(center, axes).into());
        }
        if let Some(values) = &self.sphere {
            let v = expect_len("sphere", values, 4)?;
            return Ok(BoundingSphere::new(DVec3::new(v[0], v[1], v[2]), v[3].abs()).into());
        }
        Err(DescriptionError::MissingBoundingVolume)
    }
}

fn expect_len<'a>(
    kind: &'static str,
    values: &'a [f64],
    expected: usize,
) -> Result<&'a [f64], DescriptionError> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(DescriptionError::MalformedBoundingVolume {
            kind,
            expected,
            actual: values.len(),
        })
    }
}

/// Reject negative and non-finite geometric errors.
pub fn validate_geometric_error(value: f64) -> Result<f64, DescriptionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DescriptionError::InvalidGeometricError { value })
    }
}

/// Directory part of a document URL, including the trailing separator.
pub fn base_of(document_url: &str) -> &str {
    match document_url.rfind('/') {
        Some(index) => &document_url[..=index],
        None => "",
    }
}

/// Resolve `url` against `base`. Absolute URLs are returned unchanged.
pub fn resolve_url(base: &str, url: &str) -> String {
    if url.contains("://") || url.starts_with('/') {
        url.to_owned()
    } else {
        format!("{base}{url}")
    }
}
