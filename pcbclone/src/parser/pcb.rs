//! KiCAD PCB Parser and Writer
//!
//! Reads KiCAD PCB files (.kicad_pcb, KiCad 5-9 S-Expression format) into a
//! [`Board`] and writes them back.
//!
//! Key format details:
//! - All values are in millimeters
//! - Footprints are `(footprint ...)` (KiCad 6+) or `(module ...)` (KiCad 5)
//! - Traces are stored as `(segment ...)` / `(arc ...)`, vias as `(via ...)`
//! - Zones carry their outline in `(polygon (pts (xy x y) ...))`
//!
//! Only footprints, zones and tracks get a typed view. Everything else is
//! kept as parsed and written back untouched.

use std::path::Path;

use thiserror::Error;

use crate::geometry::Point;
use crate::parser::pcb_schema::*;
use crate::parser::sexp::{ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Parser for KiCAD PCB files
pub struct PcbParser;

impl PcbParser {
    /// Parse a PCB file from disk
    pub fn parse_pcb(path: &Path) -> Result<Board, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();
        Self::parse_pcb_str(&content, &filename)
    }

    /// Parse PCB from string
    pub fn parse_pcb_str(content: &str, filename: &str) -> Result<Board, PcbParseError> {
        if content.trim_start().starts_with("PCBNEW") {
            return Err(PcbParseError::InvalidFormat(
                "legacy .brd boards are not supported, save the board as .kicad_pcb first"
                    .to_string(),
            ));
        }

        let mut parser = SExpParser::new(content);
        let root = parser.parse()?;

        // Root should be (kicad_pcb ...)
        let kicad_pcb = root
            .tag()
            .ok_or_else(|| PcbParseError::InvalidFormat("Expected kicad_pcb root".to_string()))?;

        if kicad_pcb != "kicad_pcb" {
            return Err(PcbParseError::InvalidFormat(format!(
                "Expected kicad_pcb, found {}",
                kicad_pcb
            )));
        }

        let mut board = Board {
            filename: filename.to_string(),
            version: Self::get_string_value(&root, "version"),
            ..Default::default()
        };

        let SExp::List(items) = root else {
            return Err(PcbParseError::InvalidFormat("Expected kicad_pcb root".to_string()));
        };

        // Parse all elements
        for item in items.into_iter().skip(1) {
            match item.tag() {
                Some("net") => {
                    if let Ok(net) = Self::parse_net(&item) {
                        board.nets.push(net);
                    }
                    board.items.push(BoardItem::Raw(item));
                }
                Some("footprint") | Some("module") => match Self::parse_footprint(item.clone()) {
                    Ok(fp) => {
                        board.items.push(BoardItem::Footprint(board.footprints.len()));
                        board.footprints.push(fp);
                    }
                    Err(e) => {
                        tracing::debug!("Keeping unreadable footprint verbatim: {}", e);
                        board.items.push(BoardItem::Raw(item));
                    }
                },
                Some("zone") => match Self::parse_zone(item.clone()) {
                    Ok(zone) => {
                        board.items.push(BoardItem::Zone(board.zones.len()));
                        board.zones.push(zone);
                    }
                    Err(e) => {
                        tracing::debug!("Keeping unreadable zone verbatim: {}", e);
                        board.items.push(BoardItem::Raw(item));
                    }
                },
                Some("segment") | Some("arc") | Some("via") => match Self::parse_track(item.clone()) {
                    Ok(track) => {
                        board.items.push(BoardItem::Track(board.tracks.len()));
                        board.tracks.push(track);
                    }
                    Err(e) => {
                        tracing::debug!("Keeping unreadable track verbatim: {}", e);
                        board.items.push(BoardItem::Raw(item));
                    }
                },
                _ => board.items.push(BoardItem::Raw(item)),
            }
        }

        Ok(board)
    }

    fn get_string_value(sexp: &SExp, key: &str) -> Option<String> {
        sexp.get(key).and_then(|exp| {
            if let Some(list) = exp.as_list() {
                list.get(1).and_then(|v| v.as_atom()).map(|s| s.to_string())
            } else {
                exp.as_atom().map(|s| s.to_string())
            }
        })
    }

    fn get_float_value(sexp: &SExp, key: &str) -> Option<f64> {
        Self::get_string_value(sexp, key).and_then(|s| s.parse().ok())
    }

    fn get_int_value(sexp: &SExp, key: &str) -> Option<u32> {
        Self::get_string_value(sexp, key).and_then(|s| s.parse().ok())
    }

    fn parse_net(sexp: &SExp) -> Result<PcbNet, PcbParseError> {
        let list = sexp
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Net must be a list".to_string()))?;

        if list.len() < 3 {
            return Err(PcbParseError::InvalidFormat("Net requires id and name".to_string()));
        }

        let id = list[1]
            .as_atom()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PcbParseError::MissingField("net id".to_string()))?;

        let name = list[2].as_atom().unwrap_or("").to_string();

        Ok(PcbNet { id, name })
    }

    fn parse_layer_list(sexp: &SExp) -> Vec<String> {
        if let Some(layer) = sexp.child("layer") {
            return layer
                .as_list()
                .and_then(|l| l.get(1))
                .and_then(|v| v.as_atom())
                .map(|s| vec![s.to_string()])
                .unwrap_or_default();
        }
        sexp.child("layers")
            .and_then(|l| l.as_list())
            .map(|l| {
                l.iter()
                    .skip(1)
                    .filter_map(|v| v.as_atom())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn parse_footprint(sexp: SExp) -> Result<Footprint, PcbParseError> {
        // Footprint library is the second element
        let footprint_lib = sexp
            .as_list()
            .and_then(|l| l.get(1))
            .and_then(|a| a.as_atom())
            .unwrap_or("")
            .to_string();

        let layer = Self::get_string_value(&sexp, "layer").unwrap_or_else(|| "F.Cu".to_string());
        let at = sexp
            .child("at")
            .ok_or_else(|| PcbParseError::MissingField("footprint at".to_string()))?;
        let position = read_xy(at)
            .ok_or_else(|| PcbParseError::InvalidFormat("Invalid 'at' format".to_string()))?;
        let rotation = at_angle(at);

        let mut reference = String::new();

        for prop_exp in sexp.get_all("property") {
            if let Some(list) = prop_exp.as_list() {
                if list.len() >= 3 && list[1].as_atom() == Some("Reference") {
                    if let Some(val) = list[2].as_atom() {
                        reference = val.to_string();
                    }
                }
            }
        }

        // Also check fp_text for reference (older format)
        if reference.is_empty() {
            for text_exp in sexp.get_all("fp_text") {
                if let Some(list) = text_exp.as_list() {
                    if list.len() >= 3 && list[1].as_atom() == Some("reference") {
                        if let Some(text_value) = list[2].as_atom() {
                            reference = text_value.to_string();
                        }
                    }
                }
            }
        }

        if reference.is_empty() {
            return Err(PcbParseError::MissingField(format!(
                "reference of footprint {}",
                footprint_lib
            )));
        }

        let pads = sexp
            .get_all("pad")
            .into_iter()
            .filter_map(|pad_exp| Self::parse_pad(pad_exp).ok())
            .collect();

        Ok(Footprint {
            reference,
            footprint_lib,
            layer,
            position,
            rotation,
            pads,
            node: sexp,
        })
    }

    fn parse_pad(sexp: &SExp) -> Result<Pad, PcbParseError> {
        let list = sexp
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Pad must be a list".to_string()))?;

        if list.len() < 4 {
            return Err(PcbParseError::InvalidFormat(
                "Pad requires number, type, shape".to_string(),
            ));
        }

        let number = list[1].as_atom().unwrap_or("").to_string();
        let at = sexp
            .child("at")
            .ok_or_else(|| PcbParseError::MissingField("pad at".to_string()))?;
        let position = read_xy(at)
            .ok_or_else(|| PcbParseError::InvalidFormat("Invalid 'at' format".to_string()))?;

        // Parse net; net 0 is "no net"
        let net = sexp.child("net").and_then(|net_exp| {
            let net_list = net_exp.as_list()?;
            let id = net_list.get(1)?.as_atom()?.parse().ok()?;
            let name = net_list.get(2).and_then(|v| v.as_atom()).unwrap_or("");
            if id == 0 && name.is_empty() {
                None
            } else {
                Some(PcbNet {
                    id,
                    name: name.to_string(),
                })
            }
        });

        Ok(Pad {
            number,
            position,
            angle: at_angle(at),
            layers: Self::parse_layer_list(sexp),
            net,
        })
    }

    pub(crate) fn parse_zone(sexp: SExp) -> Result<Zone, PcbParseError> {
        let net = Self::get_int_value(&sexp, "net").unwrap_or(0);
        let net_name = Self::get_string_value(&sexp, "net_name").unwrap_or_default();
        let layers = Self::parse_layer_list(&sexp);
        if layers.is_empty() {
            return Err(PcbParseError::MissingField("zone layer".to_string()));
        }

        // Parse outline polygons
        let outlines: Vec<Vec<Point>> = sexp
            .get_all("polygon")
            .into_iter()
            .filter_map(|polygon| polygon.child("pts"))
            .map(Self::parse_pts)
            .filter(|pts| !pts.is_empty())
            .collect();

        Ok(Zone {
            net,
            net_name,
            layers,
            outlines,
            node: sexp,
        })
    }

    pub(crate) fn parse_track(sexp: SExp) -> Result<Track, PcbParseError> {
        let point = |key: &str| -> Result<Point, PcbParseError> {
            let node = sexp
                .child(key)
                .ok_or_else(|| PcbParseError::MissingField(key.to_string()))?;
            read_xy(node)
                .ok_or_else(|| PcbParseError::InvalidFormat(format!("Invalid '{}' format", key)))
        };

        let kind = match sexp.tag() {
            Some("segment") => TrackKind::Segment {
                start: point("start")?,
                end: point("end")?,
            },
            Some("arc") => TrackKind::Arc {
                start: point("start")?,
                mid: point("mid")?,
                end: point("end")?,
            },
            Some("via") => TrackKind::Via {
                position: point("at")?,
                size: Self::get_float_value(&sexp, "size")
                    .ok_or_else(|| PcbParseError::MissingField("via size".to_string()))?,
            },
            other => {
                return Err(PcbParseError::InvalidFormat(format!(
                    "Not a track: {:?}",
                    other
                )))
            }
        };

        let layers = Self::parse_layer_list(&sexp);

        Ok(Track {
            kind,
            layers,
            node: sexp,
        })
    }

    fn parse_pts(sexp: &SExp) -> Vec<Point> {
        let mut points = Vec::new();

        if let Some(pts_list) = sexp.as_list() {
            for item in pts_list.iter().skip(1) {
                match item.tag() {
                    Some("xy") => points.extend(read_xy(item)),
                    // KiCad 7+ outlines may contain arcs; their three points
                    // approximate the curve well enough for containment
                    Some("arc") => {
                        for key in ["start", "mid", "end"] {
                            points.extend(item.child(key).and_then(read_xy));
                        }
                    }
                    _ => {}
                }
            }
        }

        points
    }
}

/// Writer for KiCAD PCB files
pub struct PcbWriter;

impl PcbWriter {
    /// Render the board in KiCad's S-Expression layout.
    pub fn to_string(board: &Board) -> String {
        let mut out = String::from("(kicad_pcb");
        for item in &board.items {
            let node = match item {
                BoardItem::Raw(node) => node,
                BoardItem::Footprint(i) => &board.footprints[*i].node,
                BoardItem::Zone(i) => &board.zones[*i].node,
                BoardItem::Track(i) => &board.tracks[*i].node,
            };
            out.push_str("\n\t");
            node.write_pretty(&mut out, 1);
        }
        out.push_str("\n)\n");
        out
    }

    /// Save the board to `path`, replacing any existing file.
    pub fn write_pcb(board: &Board, path: &Path) -> Result<(), PcbParseError> {
        std::fs::write(path, Self::to_string(board))?;
        Ok(())
    }
}
