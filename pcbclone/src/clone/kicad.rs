//! KiCad board implementation of the cloning traits.

use super::{BoundaryTestable, Contact, Document, HitTestable, Positionable, Translatable};
use crate::geometry::{BoundingBox, Point, Vector};
use crate::parser::pcb_schema::{Board, Footprint, PcbNet, Side, Track, Zone};

impl Positionable for Footprint {
    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        Footprint::set_position(self, position)
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: f64) {
        Footprint::set_rotation(self, rotation)
    }

    fn side(&self) -> Side {
        Footprint::side(self)
    }

    fn flip(&mut self) {
        Footprint::flip(self)
    }
}

impl BoundaryTestable for Zone {
    fn layer(&self) -> &str {
        Zone::layer(self)
    }

    fn anchor(&self) -> Option<Point> {
        Zone::anchor(self)
    }

    fn contains(&self, p: Point) -> bool {
        Zone::contains(self, p)
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        Zone::bounding_box(self)
    }

    fn assign_net(&mut self, net: &PcbNet) {
        Zone::assign_net(self, net)
    }
}

impl Translatable for Zone {
    fn duplicate_moved(&self, by: Vector) -> Self {
        Zone::duplicate_moved(self, by)
    }
}

impl HitTestable for Track {
    fn hit_test(&self, area: &BoundingBox) -> bool {
        Track::hit_test(self, area)
    }
}

impl Translatable for Track {
    fn duplicate_moved(&self, by: Vector) -> Self {
        Track::duplicate_moved(self, by)
    }
}

impl Document for Board {
    type Component = Footprint;
    type Region = Zone;
    type Path = Track;

    fn component(&self, reference: &str) -> Option<&Footprint> {
        self.find_footprint(reference)
    }

    fn component_mut(&mut self, reference: &str) -> Option<&mut Footprint> {
        self.find_footprint_mut(reference)
    }

    fn contacts(&self) -> Vec<Contact> {
        self.footprints
            .iter()
            .flat_map(|fp| {
                fp.pads.iter().map(move |pad| Contact {
                    reference: fp.reference.clone(),
                    pad: pad.number.clone(),
                    position: fp.pad_position(pad),
                    layers: pad.layers.clone(),
                    net: pad.net.clone().unwrap_or_else(PcbNet::unconnected),
                })
            })
            .collect()
    }

    fn regions(&self) -> &[Zone] {
        &self.zones
    }

    fn add_region(&mut self, region: Zone) {
        self.add_zone(region);
    }

    fn paths(&self) -> &[Track] {
        &self.tracks
    }

    fn add_paths(&mut self, paths: Vec<Track>) {
        for track in paths {
            self.add_track(track);
        }
    }
}
