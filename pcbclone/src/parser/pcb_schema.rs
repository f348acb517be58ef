//! PCB Schema Definitions
//!
//! Typed views of the parts of a KiCad board (.kicad_pcb) that the cloner
//! reads and edits. Every view keeps the S-expression node it was read from;
//! edits are applied to the node and to the typed fields together, so the
//! board can be written back without losing anything the model does not
//! describe.

use serde::Serialize;

use crate::geometry::{normalize_angle, polygon_contains, BoundingBox, Point, Vector};
use crate::parser::sexp::SExp;

/// Net declaration, also used as the net of a pad.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PcbNet {
    pub id: u32,
    pub name: String,
}

impl PcbNet {
    /// Net 0, which KiCad gives to unconnected items.
    pub fn unconnected() -> Self {
        PcbNet {
            id: 0,
            name: String::new(),
        }
    }
}

/// Board side a footprint is mounted on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn from_layer(layer: &str) -> Self {
        if layer.starts_with("B.") {
            Side::Back
        } else {
            Side::Front
        }
    }
}

/// Swaps a front layer name for its back counterpart and vice versa.
/// Inner and wildcard layers are returned unchanged.
pub fn flip_layer_name(layer: &str) -> String {
    if let Some(rest) = layer.strip_prefix("F.") {
        format!("B.{}", rest)
    } else if let Some(rest) = layer.strip_prefix("B.") {
        format!("F.{}", rest)
    } else {
        layer.to_string()
    }
}

/// Matches a pad layer pattern (`F.Cu`, `*.Cu`, `F&B.Cu`) against a layer.
pub fn layer_matches(pattern: &str, layer: &str) -> bool {
    if pattern == layer {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return layer.ends_with(suffix);
    }
    if let Some(suffix) = pattern.strip_prefix("F&B") {
        return layer == format!("F{}", suffix) || layer == format!("B{}", suffix);
    }
    false
}

/// Pad on a footprint. Positions are footprint-local; the angle is the
/// absolute pad orientation as KiCad stores it.
#[derive(Debug, Clone, Serialize)]
pub struct Pad {
    pub number: String,
    pub position: Point,
    pub angle: f64,
    pub layers: Vec<String>,
    pub net: Option<PcbNet>,
}

/// Footprint (component) placed on the board.
#[derive(Debug, Clone, Serialize)]
pub struct Footprint {
    pub reference: String,
    pub footprint_lib: String,
    pub layer: String,
    pub position: Point,
    pub rotation: f64,
    pub pads: Vec<Pad>,
    #[serde(skip)]
    pub(crate) node: SExp,
}

impl Footprint {
    pub fn side(&self) -> Side {
        Side::from_layer(&self.layer)
    }

    /// Absolute board position of one of this footprint's pads.
    pub fn pad_position(&self, pad: &Pad) -> Point {
        self.position + to_vector(pad.position.rotated(self.rotation))
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        if let Some(at) = self.node.child_mut("at") {
            set_xy(at, position);
        }
    }

    /// Sets the footprint orientation. Pads and texts store absolute angles,
    /// so they turn by the same amount.
    pub fn set_rotation(&mut self, rotation: f64) {
        let rotation = normalize_angle(rotation);
        let delta = rotation - self.rotation;
        self.rotation = rotation;

        if let Some(items) = self.node.as_list_mut() {
            for item in items.iter_mut() {
                match item.tag() {
                    Some("at") => set_angle(item, rotation),
                    Some("pad") | Some("fp_text") | Some("property") => {
                        if let Some(at) = item.child_mut("at") {
                            let current = at_angle(at);
                            set_angle(at, normalize_angle(current + delta));
                        }
                    }
                    _ => {}
                }
            }
        }
        for pad in &mut self.pads {
            pad.angle = normalize_angle(pad.angle + delta);
        }
    }

    /// Mirrors the footprint onto the other board side about its own
    /// horizontal axis. The board position does not change.
    pub fn flip(&mut self) {
        if let Some(items) = self.node.as_list_mut() {
            for item in items.iter_mut() {
                match item.tag() {
                    Some("at") => {
                        let angle = at_angle(item);
                        set_angle(item, normalize_angle(-angle));
                    }
                    _ => item.walk_mut(&mut mirror_footprint_item),
                }
            }
        }

        self.layer = flip_layer_name(&self.layer);
        self.rotation = normalize_angle(-self.rotation);
        for pad in &mut self.pads {
            pad.position.y = -pad.position.y;
            pad.angle = normalize_angle(-pad.angle);
            pad.layers = pad.layers.iter().map(|l| flip_layer_name(l)).collect();
        }
    }
}

fn mirror_footprint_item(node: &mut SExp) {
    match node.tag() {
        Some("layer") | Some("layers") => {
            if let Some(items) = node.as_list_mut() {
                for layer in items.iter_mut().skip(1) {
                    match layer {
                        SExp::Str(name) | SExp::Atom(name) => *name = flip_layer_name(name),
                        SExp::List(_) => {}
                    }
                }
            }
        }
        Some("at") => {
            negate_y(node);
            let angle = at_angle(node);
            if angle != 0.0 {
                set_angle(node, normalize_angle(-angle));
            }
        }
        Some("start") | Some("end") | Some("mid") | Some("center") | Some("xy") => negate_y(node),
        Some("angle") => {
            if let Some(items) = node.as_list_mut() {
                if let Some(angle) = items.get(1).and_then(SExp::as_f64) {
                    items[1] = SExp::number(-angle);
                }
            }
        }
        Some("effects") => toggle_text_mirror(node),
        _ => {}
    }
}

fn toggle_text_mirror(effects: &mut SExp) {
    let mirror = SExp::atom("mirror");
    match effects.child_mut("justify").and_then(SExp::as_list_mut) {
        Some(justify) => {
            if let Some(pos) = justify.iter().position(|j| j.as_atom() == Some("mirror")) {
                justify.remove(pos);
            } else {
                justify.push(mirror);
            }
        }
        None => {
            if let Some(items) = effects.as_list_mut() {
                items.push(SExp::List(vec![SExp::atom("justify"), mirror]));
            }
        }
    }
    // An empty (justify) is noise in the file
    if let Some(items) = effects.as_list_mut() {
        items.retain(|item| !(item.is_tag("justify") && item.as_list().map_or(false, |l| l.len() == 1)));
    }
}

/// Copper zone (pour).
#[derive(Debug, Clone, Serialize)]
pub struct Zone {
    pub net: u32,
    pub net_name: String,
    pub layers: Vec<String>,
    pub outlines: Vec<Vec<Point>>,
    #[serde(skip)]
    pub(crate) node: SExp,
}

impl Zone {
    /// Primary layer; multi-layer zones report the first one.
    pub fn layer(&self) -> &str {
        self.layers.first().map(String::as_str).unwrap_or("")
    }

    /// The zone's position in KiCad terms: its first outline corner.
    pub fn anchor(&self) -> Option<Point> {
        self.outlines.first().and_then(|outline| outline.first()).copied()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.outlines.iter().any(|outline| polygon_contains(outline, p))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.outlines.iter().flatten())
    }

    pub fn assign_net(&mut self, net: &PcbNet) {
        self.net = net.id;
        self.net_name = net.name.clone();
        self.node.set_child("net", vec![SExp::number(net.id as f64)]);
        self.node.set_child("net_name", vec![SExp::string(net.name.clone())]);
    }

    /// Copy of this zone moved by `by`, with a fresh identity.
    pub fn duplicate_moved(&self, by: Vector) -> Self {
        let mut zone = self.clone();
        translate_node(&mut zone.node, by);
        refresh_identity(&mut zone.node);
        for outline in &mut zone.outlines {
            for p in outline.iter_mut() {
                *p = *p + by;
            }
        }
        zone
    }
}

/// Geometry of a routed item.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TrackKind {
    Segment { start: Point, end: Point },
    Arc { start: Point, mid: Point, end: Point },
    Via { position: Point, size: f64 },
}

/// Track segment, arc or via.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub kind: TrackKind,
    pub layers: Vec<String>,
    #[serde(skip)]
    pub(crate) node: SExp,
}

impl Track {
    /// True when the track touches or crosses `area`.
    pub fn hit_test(&self, area: &BoundingBox) -> bool {
        match self.kind {
            TrackKind::Segment { start, end } => area.intersects_segment(start, end),
            TrackKind::Arc { start, mid, end } => {
                area.intersects_segment(start, mid) || area.intersects_segment(mid, end)
            }
            TrackKind::Via { position, size } => {
                area.intersects(&BoundingBox::around(position, size / 2.0))
            }
        }
    }

    /// Copy of this track moved by `by`, with a fresh identity.
    pub fn duplicate_moved(&self, by: Vector) -> Self {
        let mut track = self.clone();
        translate_node(&mut track.node, by);
        refresh_identity(&mut track.node);
        track.kind = match track.kind {
            TrackKind::Segment { start, end } => TrackKind::Segment {
                start: start + by,
                end: end + by,
            },
            TrackKind::Arc { start, mid, end } => TrackKind::Arc {
                start: start + by,
                mid: mid + by,
                end: end + by,
            },
            TrackKind::Via { position, size } => TrackKind::Via {
                position: position + by,
                size,
            },
        };
        track
    }
}

/// Position of a top-level item in the board file.
#[derive(Debug, Clone)]
pub(crate) enum BoardItem {
    Raw(SExp),
    Footprint(usize),
    Zone(usize),
    Track(usize),
}

/// A loaded board: typed views of footprints, zones and tracks, plus every
/// other top-level item kept verbatim in file order.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub filename: String,
    pub version: Option<String>,
    pub nets: Vec<PcbNet>,
    pub footprints: Vec<Footprint>,
    pub zones: Vec<Zone>,
    pub tracks: Vec<Track>,
    pub(crate) items: Vec<BoardItem>,
}

impl Board {
    pub fn find_footprint(&self, reference: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|fp| fp.reference == reference)
    }

    pub fn find_footprint_mut(&mut self, reference: &str) -> Option<&mut Footprint> {
        self.footprints.iter_mut().find(|fp| fp.reference == reference)
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.items.push(BoardItem::Zone(self.zones.len()));
        self.zones.push(zone);
    }

    pub fn add_track(&mut self, track: Track) {
        self.items.push(BoardItem::Track(self.tracks.len()));
        self.tracks.push(track);
    }

    pub fn zones_on_layer<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.iter().filter(move |zone| zone.layer() == layer)
    }
}

fn to_vector(p: Point) -> Vector {
    Vector::new(p.x, p.y)
}

/// Shifts every coordinate pair below `node` by `by`.
pub(crate) fn translate_node(node: &mut SExp, by: Vector) {
    node.walk_mut(&mut |item| match item.tag() {
        Some("at") | Some("start") | Some("end") | Some("mid") | Some("center") | Some("xy") => {
            if let Some(p) = read_xy(item) {
                set_xy(item, p + by);
            }
        }
        _ => {}
    });
}

/// Gives a duplicated item a new `uuid` (KiCad 7+) or `tstamp` (older
/// files; eight hex digits when the original was in that form).
pub(crate) fn refresh_identity(node: &mut SExp) {
    let Some(items) = node.as_list_mut() else {
        return;
    };
    for item in items.iter_mut() {
        let key = match item.tag() {
            Some(key @ ("uuid" | "tstamp")) => key.to_string(),
            _ => continue,
        };
        let Some(values) = item.as_list_mut() else {
            continue;
        };
        let Some(value) = values.get_mut(1) else {
            continue;
        };
        let fresh = uuid::Uuid::new_v4();
        let legacy_hex = key == "tstamp" && value.as_atom().map_or(false, |v| !v.contains('-'));
        let text = if legacy_hex {
            format!("{:08X}", fresh.as_fields().0)
        } else {
            fresh.to_string()
        };
        let quoted = matches!(value, SExp::Str(_));
        *value = if quoted { SExp::Str(text) } else { SExp::Atom(text) };
    }
}

pub(crate) fn read_xy(node: &SExp) -> Option<Point> {
    let list = node.as_list()?;
    let x = list.get(1)?.as_f64()?;
    let y = list.get(2)?.as_f64()?;
    Some(Point::new(x, y))
}

fn set_xy(node: &mut SExp, p: Point) {
    if let Some(list) = node.as_list_mut() {
        if list.len() >= 3 {
            list[1] = SExp::number(p.x);
            list[2] = SExp::number(p.y);
        }
    }
}

fn negate_y(node: &mut SExp) {
    if let Some(p) = read_xy(node) {
        set_xy(node, Point::new(p.x, -p.y));
    }
}

/// Angle of an `(at x y [angle] ...)` node, zero when absent.
pub(crate) fn at_angle(at: &SExp) -> f64 {
    at.as_list()
        .and_then(|list| list.get(3))
        .and_then(SExp::as_f64)
        .unwrap_or(0.0)
}

/// Writes the angle of an `(at ...)` node, keeping trailing flags such as
/// `unlocked`. A zero angle is left out, as KiCad does.
fn set_angle(at: &mut SExp, angle: f64) {
    let Some(list) = at.as_list_mut() else {
        return;
    };
    if list.len() < 3 {
        return;
    }
    let has_angle = list.get(3).and_then(SExp::as_f64).is_some();
    match (has_angle, angle == 0.0) {
        (true, true) => {
            list.remove(3);
        }
        (true, false) => list[3] = SExp::number(angle),
        (false, false) => list.insert(3, SExp::number(angle)),
        (false, true) => {}
    }
}
