//! Tests for KiCad board parsing and writing

use pcbclone::geometry::Point;
use pcbclone::parser::pcb_schema::{Side, TrackKind};
use pcbclone::{parse_pcb, PcbParser, PcbWriter};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_parse_cell_grid() {
    let board = parse_pcb(&fixture_path("cell_grid.kicad_pcb")).expect("Should parse board");

    assert_eq!(board.version.as_deref(), Some("20221018"));
    assert_eq!(board.nets.len(), 7);
    assert_eq!(board.footprints.len(), 7);
    assert_eq!(board.zones.len(), 3);
    assert_eq!(board.tracks.len(), 4);

    let d201 = board.find_footprint("D201").expect("Should find D201");
    assert_eq!(d201.footprint_lib, "Diode_SMD:D_0805_2012Metric");
    assert_eq!(d201.position, Point::new(4.0, 4.0));
    assert_eq!(d201.pads.len(), 2);
    assert_eq!(d201.pads[0].net.as_ref().map(|n| n.name.as_str()), Some("/cell0/A"));

    assert_eq!(board.find_footprint("D401").unwrap().side(), Side::Back);
    assert!(board.find_footprint("C401").is_none());
}

#[test]
fn test_pad_positions_follow_footprint_rotation() {
    let board = parse_pcb(&fixture_path("cell_grid.kicad_pcb")).unwrap();

    let d201 = board.find_footprint("D201").unwrap();
    assert_eq!(d201.pad_position(&d201.pads[0]), Point::new(3.0, 4.0));

    let d501 = board.find_footprint("D501").unwrap();
    assert_eq!(d501.rotation, 180.0);
    let p = d501.pad_position(&d501.pads[0]);
    assert!((p.x - 81.0).abs() < 1e-9 && (p.y - 10.0).abs() < 1e-9);
}

#[test]
fn test_parse_zones_and_tracks() {
    let board = parse_pcb(&fixture_path("cell_grid.kicad_pcb")).unwrap();

    let marker: Vec<_> = board.zones_on_layer("Cmts.User").collect();
    assert_eq!(marker.len(), 1);
    let bbox = marker[0].bounding_box().unwrap();
    assert_eq!((bbox.width(), bbox.height()), (8.0, 8.0));

    let template = &board.zones[1];
    assert_eq!(template.net, 1);
    assert_eq!(template.layer(), "F.Cu");
    // The filled polygon is not part of the outline
    assert_eq!(template.outlines.len(), 1);
    assert_eq!(template.anchor(), Some(Point::new(2.0, 2.0)));

    assert!(matches!(
        board.tracks[1].kind,
        TrackKind::Via { size, .. } if size == 0.8
    ));
    assert_eq!(board.tracks[2].layers, vec!["B.Cu"]);
}

#[test]
fn test_write_then_parse_is_stable() {
    let board = parse_pcb(&fixture_path("cell_grid.kicad_pcb")).unwrap();
    let text = PcbWriter::to_string(&board);

    let reparsed = PcbParser::parse_pcb_str(&text, "written.kicad_pcb").expect("Written board should parse");
    assert_eq!(reparsed.footprints.len(), board.footprints.len());
    assert_eq!(reparsed.zones.len(), board.zones.len());
    assert_eq!(reparsed.tracks.len(), board.tracks.len());
    assert_eq!(PcbWriter::to_string(&reparsed), text);
}

#[test]
fn test_parse_invalid_file() {
    let result = parse_pcb(&PathBuf::from("not_a_real_file.kicad_pcb"));
    assert!(result.is_err(), "Should fail on nonexistent file");
}

#[test]
fn test_legacy_board_is_rejected() {
    let result = PcbParser::parse_pcb_str("PCBNEW-BOARD Version 1 date 2014\n$GENERAL\n", "old.brd");
    assert!(result.is_err(), "Legacy boards are not supported");
}

#[test]
fn test_non_board_root_is_rejected() {
    let result = PcbParser::parse_pcb_str("(kicad_sch (version 20230121))", "sheet.kicad_sch");
    assert!(result.is_err());
}
