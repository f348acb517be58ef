//! Integration tests for the pcbclone library

use pcbclone::parser::pcb_schema::{Side, TrackKind};
use pcbclone::prelude::*;
use pcbclone::CloneError;
use pcbclone::geometry::Point;
use std::path::{Path, PathBuf};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn two_by_two() -> CloneOptions {
    CloneOptions {
        pitch_x: 10.0,
        pitch_y: 10.0,
        columns: 2,
        rows: 2,
        ..Default::default()
    }
}

fn run(input: &Path, output: &Path, options: &CloneOptions) -> Result<CloneReport, PcbCloneError> {
    PcbCloneCore::clone_file(
        input,
        &fixture_path("references.txt"),
        Some(output),
        options,
        false,
    )
}

fn zone_nets(board: &Board) -> Vec<&str> {
    board.zones.iter().map(|z| z.net_name.as_str()).collect()
}

#[test]
fn test_clone_cell_grid_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cloned.kicad_pcb");

    let report = run(&fixture_path("cell_grid.kicad_pcb"), &output, &two_by_two())
        .expect("Cloning should succeed");

    assert!(report.saved);
    assert_eq!(report.templates.len(), 3);
    assert_eq!(report.templates[0].clones, vec!["D301", "D401", "D501"]);
    assert_eq!(report.missing_templates, vec!["R999"]);
    assert_eq!(report.missing_clones, vec!["C401"]);
    assert_eq!(report.stats.components_moved, 5);
    assert_eq!(report.stats.components_flipped, 1);
    assert_eq!(report.stats.zones_cloned, 3);
    assert_eq!(report.stats.tracks_cloned, 9);
    assert!(report.ambiguous_zones.is_empty());

    let board = pcbclone::parse_pcb(&output).expect("Output should parse");
    let fp = |r: &str| board.find_footprint(r).unwrap();

    assert_eq!(fp("D201").position, Point::new(4.0, 4.0));
    assert_eq!(fp("D301").position, Point::new(14.0, 4.0));
    assert_eq!(fp("D401").position, Point::new(4.0, 14.0));
    assert_eq!(fp("D501").position, Point::new(14.0, 14.0));
    assert_eq!(fp("C301").position, Point::new(14.0, 6.5));
    assert_eq!(fp("C501").position, Point::new(14.0, 16.5));

    // D401 started on the back side
    assert_eq!(fp("D401").side(), Side::Front);
    assert!(fp("D401").pads.iter().all(|p| p.is_on_layer("F.Cu")));
    // D501 takes the template's rotation
    assert_eq!(fp("D501").rotation, 0.0);
    assert_eq!(fp("D501").pads[0].angle, 0.0);

    assert_eq!(
        zone_nets(&board),
        vec!["", "/cell0/A", "GND", "/cell1/A", "/cell2/A", "/cell3/A"]
    );
    assert_eq!(board.zones[3].net, 2);
    assert_eq!(board.zones[5].anchor(), Some(Point::new(12.0, 12.0)));

    assert_eq!(board.tracks.len(), 13);
    let vias: Vec<Point> = board
        .tracks
        .iter()
        .filter_map(|t| match t.kind {
            TrackKind::Via { position, .. } => Some(position),
            _ => None,
        })
        .collect();
    assert_eq!(
        vias,
        vec![
            Point::new(7.0, 4.0),
            Point::new(17.0, 4.0),
            Point::new(7.0, 14.0),
            Point::new(17.0, 14.0),
        ]
    );
}

#[test]
fn test_input_is_left_alone_when_output_given() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cloned.kicad_pcb");
    let input = fixture_path("cell_grid.kicad_pcb");
    let before = std::fs::read_to_string(&input).unwrap();

    run(&input, &output, &two_by_two()).unwrap();

    assert_eq!(std::fs::read_to_string(&input).unwrap(), before);
}

#[test]
fn test_output_defaults_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let board_path = dir.path().join("board.kicad_pcb");
    std::fs::copy(fixture_path("cell_grid.kicad_pcb"), &board_path).unwrap();

    let report = PcbCloneCore::clone_file(
        &board_path,
        &fixture_path("references.txt"),
        None,
        &two_by_two(),
        false,
    )
    .unwrap();

    assert_eq!(report.output.as_deref(), Some(board_path.as_path()));
    let board = pcbclone::parse_pcb(&board_path).unwrap();
    assert_eq!(board.zones.len(), 6);
}

#[test]
fn test_unmodelled_items_survive() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cloned.kicad_pcb");
    run(&fixture_path("cell_grid.kicad_pcb"), &output, &two_by_two()).unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("(kicad_pcb"));
    assert!(text.contains("(paper \"A4\")"));
    assert!(text.contains("0x00010fc_ffffffff"));
    assert!(text.contains("\"gerbers/\""));
    assert!(text.contains("Edge.Cuts"));
    assert!(text.contains("(net 6 \"GND\")"));
}

#[test]
fn test_second_run_clones_again() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.kicad_pcb");
    let second = dir.path().join("second.kicad_pcb");

    run(&fixture_path("cell_grid.kicad_pcb"), &first, &two_by_two()).unwrap();
    let report = run(&first, &second, &two_by_two()).unwrap();

    // Components are already in place, but zones and tracks are copied again
    assert_eq!(report.stats.components_flipped, 0);
    let board = pcbclone::parse_pcb(&second).unwrap();
    assert_eq!(board.find_footprint("D301").unwrap().position, Point::new(14.0, 4.0));
    assert_eq!(board.zones.len(), 9);
    assert_eq!(board.tracks.len(), 22);
}

#[test]
fn test_missing_marker_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cloned.kicad_pcb");

    let result = run(&fixture_path("no_marker.kicad_pcb"), &output, &two_by_two());

    assert!(matches!(
        result,
        Err(PcbCloneError::Clone(CloneError::MarkerNotFound { .. }))
    ));
    assert!(!output.exists(), "No output should be written on a fatal error");
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cloned.kicad_pcb");

    let report = PcbCloneCore::clone_file(
        &fixture_path("cell_grid.kicad_pcb"),
        &fixture_path("references.txt"),
        Some(&output),
        &two_by_two(),
        true,
    )
    .unwrap();

    assert!(!report.saved);
    assert_eq!(report.stats.zones_cloned, 3);
    assert!(!output.exists());
}

/// Widens the template zone so each copy covers both diode pads.
fn ambiguous_fixture(dir: &Path) -> PathBuf {
    let text = std::fs::read_to_string(fixture_path("cell_grid.kicad_pcb")).unwrap();
    let widened = text.replace(
        "(xy 3.5 2)\n        (xy 3.5 6)",
        "(xy 5.5 2)\n        (xy 5.5 6)",
    );
    assert_ne!(text, widened);
    let path = dir.join("ambiguous.kicad_pcb");
    std::fs::write(&path, widened).unwrap();
    path
}

#[test]
fn test_ambiguous_zones_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = ambiguous_fixture(dir.path());
    let output = dir.path().join("cloned.kicad_pcb");

    let report = run(&input, &output, &two_by_two()).unwrap();

    assert_eq!(report.ambiguous_zones.len(), 3);
    assert_eq!(report.ambiguous_zones[0].nets, vec!["/cell1/A", "VCC"]);
    assert_eq!(report.ambiguous_zones[0].chosen, "VCC");

    let first = CloneOptions {
        net_tie_break: NetTieBreak::First,
        ..two_by_two()
    };
    let report = run(&input, &output, &first).unwrap();
    assert_eq!(report.ambiguous_zones[2].chosen, "/cell3/A");
}

#[test]
fn test_ambiguous_zone_aborts_under_error_policy() {
    let dir = tempfile::tempdir().unwrap();
    let input = ambiguous_fixture(dir.path());
    let output = dir.path().join("cloned.kicad_pcb");
    let strict = CloneOptions {
        net_tie_break: NetTieBreak::Error,
        ..two_by_two()
    };

    let result = run(&input, &output, &strict);

    assert!(matches!(
        result,
        Err(PcbCloneError::Clone(CloneError::AmbiguousNet { slot: 1, .. }))
    ));
    assert!(!output.exists());
}

#[test]
fn test_options_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pcbclone.toml");
    std::fs::write(&config, "pitch_x = 10.0\npitch_y = 10.0\ncolumns = 2\nrows = 2\n").unwrap();

    let options = CloneOptions::from_toml_file(&config).unwrap();
    assert_eq!(options, two_by_two());
}
