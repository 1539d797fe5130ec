//! Builds tiles from a parsed hierarchy description.

use canopy_cull::BoundingVolume;
use serde_json::{Map, Value};

use crate::description::{TileDescription, TilesetDescription, base_of, resolve_url, validate_geometric_error};
use crate::error::DescriptionError;
use crate::tile::{Refinement, Tile, TileId, TileKind, TileTree};

/// Result of attaching a hierarchy to the tree.
#[derive(Debug, Clone)]
pub struct LoadedHierarchy {
    /// Root of the newly built subtree.
    pub root: TileId,
    /// Tree-wide geometric error of the description.
    pub geometric_error: f64,
    /// Opaque metadata of the description.
    pub properties: Map<String, Value>,
}

/// A validated tile waiting to be inserted. `parent` indexes the staging list.
struct StagedTile {
    parent: Option<usize>,
    geometric_error: f64,
    bounding_volume: BoundingVolume,
    content_bounding_volume: Option<BoundingVolume>,
    refinement: Refinement,
    kind: TileKind,
}

/// Build every tile of `description` and insert them into `tree`.
///
/// `document_url` is the location the description was fetched from; relative
/// content URLs resolve against its directory. When `attach_to` is given, the
/// new root becomes an additional child of that tile.
///
/// The whole description is validated before anything is inserted, so a
/// malformed document leaves the tree untouched.
pub fn build_hierarchy(
    tree: &mut TileTree,
    description: TilesetDescription,
    document_url: &str,
    attach_to: Option<TileId>,
) -> Result<LoadedHierarchy, DescriptionError> {
    let staged = stage(&description.root, base_of(document_url))?;

    let mut ids: Vec<TileId> = Vec::with_capacity(staged.len());
    for tile in staged {
        let parent = match tile.parent {
            Some(index) => Some(ids[index]),
            None => attach_to,
        };
        let id = tree.insert(Tile::new(
            tile.geometric_error,
            tile.bounding_volume,
            tile.content_bounding_volume,
            tile.refinement,
            tile.kind,
            parent,
        ));
        ids.push(id);
    }

    Ok(LoadedHierarchy {
        root: ids[0],
        geometric_error: description.geometric_error,
        properties: description.properties,
    })
}

/// Flatten the description depth-first with an explicit work stack.
///
/// Parents are staged before their children and siblings keep document order.
fn stage(root: &TileDescription, base: &str) -> Result<Vec<StagedTile>, DescriptionError> {
    let mut staged = Vec::new();
    let mut stack: Vec<(&TileDescription, Option<usize>, Refinement)> =
        vec![(root, None, Refinement::Replace)];

    while let Some((header, parent, inherited)) = stack.pop() {
        let refinement = header.refine.map(Refinement::from).unwrap_or(inherited);
        let (kind, content_bounding_volume) = match &header.content {
            None => (TileKind::Empty, None),
            Some(content) => {
                let url = resolve_url(base, &content.url);
                let kind = if content.is_hierarchy() {
                    TileKind::Hierarchy { url }
                } else {
                    TileKind::Content { url }
                };
                let volume = content
                    .bounding_volume
                    .as_ref()
                    .map(|v| v.to_volume())
                    .transpose()?;
                (kind, volume)
            }
        };

        let index = staged.len();
        staged.push(StagedTile {
            parent,
            geometric_error: validate_geometric_error(header.geometric_error)?,
            bounding_volume: header.bounding_volume.to_volume()?,
            content_bounding_volume,
            refinement,
            kind,
        });

        for child in header.children.iter().rev() {
            stack.push((child, Some(index), refinement));
        }
    }

    Ok(staged)
}
