//! Geometric reading-order sorting.
//!
//! Each page's `CHILD` references are re-sorted top to bottom, then left to
//! right. Blocks whose top edges fall within [`OrderOptions::y_tolerance`]
//! of the first block of a row band are treated as one visual row and sorted
//! by their left edge, so side-by-side columns are never interleaved by tiny
//! vertical jitter.

use crate::model::{AnalysisDocument, BlockType, RelationshipType};

use super::{MissingGeometry, OrderOptions};

#[derive(Debug, Clone, Copy)]
struct Placed {
    index: usize,
    x: f32,
    y: f32,
}

/// Compute a reading-order permutation for a list of positions.
///
/// `positions[i]` is the top-left `(x, y)` of the i-th sibling, or `None`
/// when it has no geometry. The result lists the original indices in
/// reading order. The sort is stable, so applying it to already ordered
/// input returns the identity permutation.
pub fn reading_order(positions: &[Option<(f32, f32)>], options: &OrderOptions) -> Vec<usize> {
    let mut placed = Vec::with_capacity(positions.len());
    let mut unplaced = Vec::new();

    for (index, position) in positions.iter().enumerate() {
        match (position, options.missing_geometry) {
            (Some((x, y)), _) => placed.push(Placed {
                index,
                x: *x,
                y: *y,
            }),
            (None, MissingGeometry::Origin) => placed.push(Placed {
                index,
                x: 0.0,
                y: 0.0,
            }),
            (None, MissingGeometry::Trailing) => unplaced.push(index),
        }
    }

    placed.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut order = Vec::with_capacity(positions.len());
    let mut start = 0;
    while start < placed.len() {
        let band_top = placed[start].y;
        let mut end = start + 1;
        while end < placed.len() && placed[end].y - band_top <= options.y_tolerance {
            end += 1;
        }

        let band = &mut placed[start..end];
        band.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        order.extend(band.iter().map(|p| p.index));
        start = end;
    }

    order.extend(unplaced);
    order
}

/// Re-sort every page's child references into reading order, in place.
///
/// Only the order of ids inside `PAGE` blocks' `CHILD` relationships
/// changes. Geometry, text and all other relationships are left as they
/// are. Ids that reference no known block are treated as having no
/// geometry.
pub fn order_blocks(doc: &mut AnalysisDocument, options: &OrderOptions) {
    let mut updates: Vec<(usize, usize, Vec<String>)> = Vec::new();

    {
        let index = doc.index();
        let locate = |id: &str| {
            index
                .get(id)
                .and_then(|&i| doc.blocks[i].top_left())
        };

        for (block_idx, block) in doc.blocks.iter().enumerate() {
            if block.block_type != BlockType::Page {
                continue;
            }

            for (rel_idx, rel) in block.relationships.iter().enumerate() {
                if rel.kind != RelationshipType::Child {
                    continue;
                }

                let positions: Vec<_> = rel.ids.iter().map(|id| locate(id.as_str())).collect();
                let missing = positions.iter().filter(|p| p.is_none()).count();
                if missing > 0 {
                    log::debug!(
                        "Page {}: {} of {} children have no geometry",
                        block.id,
                        missing,
                        rel.ids.len()
                    );
                }

                let order = reading_order(&positions, options);
                if order.iter().enumerate().any(|(pos, &i)| pos != i) {
                    let ids = order.into_iter().map(|i| rel.ids[i].clone()).collect();
                    updates.push((block_idx, rel_idx, ids));
                }
            }
        }
    }

    log::debug!("Reordered {} page child lists", updates.len());

    for (block_idx, rel_idx, ids) in updates {
        doc.blocks[block_idx].relationships[rel_idx].ids = ids;
    }
}
