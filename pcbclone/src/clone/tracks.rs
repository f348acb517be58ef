use super::{CloneGrid, Document, HitTestable, Translatable};
use crate::geometry::BoundingBox;

/// Copies every track touching `marker` into each non-template cell.
///
/// Tracks that only cross the marker edge are copied as well. Only tracks
/// present before the call are considered. Returns the number of copies
/// added.
pub fn clone_tracks<D: Document>(doc: &mut D, marker: &BoundingBox, grid: &CloneGrid) -> usize {
    let templates: Vec<&D::Path> = doc.paths().iter().filter(|track| track.hit_test(marker)).collect();
    tracing::info!("Cloning {} track(s)", templates.len());

    let copies: Vec<D::Path> = templates
        .iter()
        .flat_map(|track| grid.slots().map(move |(_, offset)| track.duplicate_moved(offset)))
        .collect();

    let count = copies.len();
    doc.add_paths(copies);
    count
}
