//! Layout Cloning Module
//!
//! The cloning algorithm works against a small set of capability traits
//! rather than a concrete board type:
//!
//! - [`Positionable`] - a placed component that can be moved, rotated and
//!   flipped to the other board side
//! - [`BoundaryTestable`] - a closed region (zone) with a layer and an outline
//! - [`Translatable`] - an item that can be duplicated at an offset
//! - [`Document`] - the container holding all of the above
//!
//! The KiCad board model implements them in [`kicad`].

pub mod grid;
pub mod kicad;
pub mod placement;
pub mod reference;
pub mod tracks;
pub mod zones;

use thiserror::Error;

use crate::geometry::{BoundingBox, Point, Vector};
use crate::parser::pcb_schema::{layer_matches, PcbNet, Side};

pub use grid::CloneGrid;
pub use placement::{place_clones, PlacementOutcome};
pub use reference::{Reference, ReferenceError, ReferenceMapper};
pub use tracks::clone_tracks;
pub use zones::{clone_zones, AmbiguousZone, NetTieBreak, ZoneOutcome};

/// Errors raised by the cloning algorithm
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("No marker zone found on layer {layer}")]
    MarkerNotFound { layer: String },

    #[error("Found {count} marker zones on layer {layer}, expected exactly one")]
    MultipleMarkers { layer: String, count: usize },

    #[error("Marker zone on layer {layer} has no outline")]
    EmptyMarker { layer: String },

    #[error("Cloned zone on {layer} at slot {slot} touches pads of several nets: {}", nets.join(", "))]
    AmbiguousNet {
        slot: usize,
        layer: String,
        nets: Vec<String>,
    },

    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// A placed component.
pub trait Positionable {
    fn position(&self) -> Point;
    fn set_position(&mut self, position: Point);
    fn rotation(&self) -> f64;
    fn set_rotation(&mut self, rotation: f64);
    fn side(&self) -> Side;
    /// Moves the component to the other board side, mirroring its footprint.
    fn flip(&mut self);
}

/// A closed region with an outline on one layer.
pub trait BoundaryTestable {
    fn layer(&self) -> &str;
    /// The region's reference point, used to decide whether it belongs to
    /// the template.
    fn anchor(&self) -> Option<Point>;
    fn contains(&self, p: Point) -> bool;
    fn bounding_box(&self) -> Option<BoundingBox>;
    fn assign_net(&mut self, net: &PcbNet);
}

/// An item that can be copied to another place.
pub trait Translatable: Sized {
    /// A copy moved by `by`. The copy is a new item, not an alias.
    fn duplicate_moved(&self, by: Vector) -> Self;
}

/// An open path (track) that can be tested against an area.
pub trait HitTestable {
    fn hit_test(&self, area: &BoundingBox) -> bool;
}

/// A pad as seen by the zone cloner: absolute position, layers and net
/// (net 0 when unconnected).
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub reference: String,
    pub pad: String,
    pub position: Point,
    pub layers: Vec<String>,
    pub net: PcbNet,
}

impl Contact {
    pub fn is_on_layer(&self, layer: &str) -> bool {
        self.layers.iter().any(|pattern| layer_matches(pattern, layer))
    }
}

/// The board the algorithm edits.
pub trait Document {
    type Component: Positionable;
    type Region: BoundaryTestable + Translatable + Clone;
    type Path: HitTestable + Translatable + Clone;

    fn component(&self, reference: &str) -> Option<&Self::Component>;
    fn component_mut(&mut self, reference: &str) -> Option<&mut Self::Component>;

    /// Every pad in component order then pad order. Pads without a net
    /// are reported on net 0.
    fn contacts(&self) -> Vec<Contact>;

    fn regions(&self) -> &[Self::Region];
    fn add_region(&mut self, region: Self::Region);

    fn paths(&self) -> &[Self::Path];
    fn add_paths(&mut self, paths: Vec<Self::Path>);
}

/// Finds the single region on `layer` and returns its bounding box.
pub fn locate_marker<D: Document>(doc: &D, layer: &str) -> Result<BoundingBox, CloneError> {
    let markers: Vec<&D::Region> = doc.regions().iter().filter(|r| r.layer() == layer).collect();

    match markers.as_slice() {
        [] => Err(CloneError::MarkerNotFound {
            layer: layer.to_string(),
        }),
        [marker] => marker.bounding_box().ok_or_else(|| CloneError::EmptyMarker {
            layer: layer.to_string(),
        }),
        many => Err(CloneError::MultipleMarkers {
            layer: layer.to_string(),
            count: many.len(),
        }),
    }
}
