//! Core cloning logic shared by the library API and the CLI.
//! No terminal or process dependencies.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clone::{
    clone_tracks, clone_zones, locate_marker, place_clones, AmbiguousZone, CloneError, CloneGrid,
    NetTieBreak, Reference, ReferenceError, ReferenceMapper,
};
use crate::geometry::Vector;
use crate::parser::pcb::{PcbParser, PcbWriter};
use crate::parser::pcb_schema::Board;

#[derive(Debug, thiserror::Error)]
pub enum PcbCloneError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Cannot read {}: {}", path.display(), source)]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Clone(#[from] CloneError),
}

impl From<crate::parser::pcb::PcbParseError> for PcbCloneError {
    fn from(e: crate::parser::pcb::PcbParseError) -> Self {
        match e {
            crate::parser::pcb::PcbParseError::Io(source) => PcbCloneError::Io(source),
            other => PcbCloneError::Parse(other.to_string()),
        }
    }
}

/// Options for a cloning run (CLI flags or a TOML file).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneOptions {
    /// Difference between the reference numbers of two consecutive cells.
    pub offset_step: u64,
    /// First reference number of the template cell.
    pub offset_start: u64,
    /// Cell pitch in mm.
    pub pitch_x: f64,
    pub pitch_y: f64,
    pub columns: usize,
    pub rows: usize,
    /// Layer of the zone that outlines the template cell.
    pub marker_layer: String,
    pub net_tie_break: NetTieBreak,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            offset_step: 100,
            offset_start: 200,
            pitch_x: 11.0,
            pitch_y: 11.0,
            columns: 4,
            rows: 4,
            marker_layer: "Cmts.User".to_string(),
            net_tie_break: NetTieBreak::Last,
        }
    }
}

impl CloneOptions {
    /// Load options from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, PcbCloneError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PcbCloneError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, PcbCloneError> {
        toml::from_str(contents).map_err(|e| PcbCloneError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), PcbCloneError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(PcbCloneError::InvalidOptions(format!(
                "grid must have at least one column and one row, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.columns.checked_mul(self.rows).is_none() {
            return Err(PcbCloneError::InvalidOptions("grid is too large".to_string()));
        }
        if !self.pitch_x.is_finite() || !self.pitch_y.is_finite() {
            return Err(PcbCloneError::InvalidOptions(format!(
                "pitch must be a finite number, got ({}, {})",
                self.pitch_x, self.pitch_y
            )));
        }
        if self.offset_step == 0 {
            return Err(PcbCloneError::InvalidOptions(
                "reference step must be greater than zero".to_string(),
            ));
        }
        if self.marker_layer.is_empty() {
            return Err(PcbCloneError::InvalidOptions("marker layer is empty".to_string()));
        }
        Ok(())
    }

    pub fn grid(&self) -> CloneGrid {
        CloneGrid::new(self.columns, self.rows, Vector::new(self.pitch_x, self.pitch_y))
    }
}

/// A template reference and the references of its clones, in slot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateClones {
    pub template: String,
    pub clones: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloneStats {
    pub components_moved: usize,
    pub components_flipped: usize,
    pub zones_cloned: usize,
    pub tracks_cloned: usize,
}

/// Result of a cloning run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CloneReport {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub templates: Vec<TemplateClones>,
    pub missing_templates: Vec<String>,
    pub missing_clones: Vec<String>,
    pub stats: CloneStats,
    pub ambiguous_zones: Vec<AmbiguousZone>,
    pub saved: bool,
}

impl CloneReport {
    /// True when every template and clone was found and every zone net was
    /// unambiguous.
    pub fn is_clean(&self) -> bool {
        self.missing_templates.is_empty()
            && self.missing_clones.is_empty()
            && self.ambiguous_zones.is_empty()
    }
}

/// Reads a whitespace-separated list of template references.
pub fn read_reference_list(path: &Path) -> Result<Vec<String>, PcbCloneError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PcbCloneError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents.split_whitespace().map(str::to_string).collect())
}

/// Maps every template reference before anything is edited, so a malformed
/// reference aborts the run on an untouched board.
fn map_references(
    references: &[String],
    options: &CloneOptions,
) -> Result<Vec<TemplateClones>, PcbCloneError> {
    let mapper = ReferenceMapper::new(options.offset_step);
    let count = options.columns * options.rows;
    let first_range = options.offset_start..options.offset_start.saturating_add(options.offset_step);

    references
        .iter()
        .map(|template| -> Result<TemplateClones, PcbCloneError> {
            let numeral = Reference::parse(template)?.numeral;
            if !first_range.contains(&numeral) {
                tracing::warn!(
                    "Reference {} is outside the template numbering {}..{}",
                    template,
                    first_range.start,
                    first_range.end
                );
            }
            let clones = mapper.clone_references(template, count)?;
            tracing::info!(
                "Original reference: {}, generated clone references: {}",
                template,
                clones.join(", ")
            );
            Ok(TemplateClones {
                template: template.clone(),
                clones,
            })
        })
        .collect()
}

/// Core cloning API used by the CLI.
pub struct PcbCloneCore;

impl PcbCloneCore {
    /// Clone the template cell of `board` across the grid.
    ///
    /// Options, references and the marker zone are checked before the board
    /// is edited. Under [`NetTieBreak::Error`] an ambiguous zone aborts the
    /// run after components were already moved, so the board must then be
    /// discarded.
    pub fn clone_board(
        board: &mut Board,
        references: &[String],
        options: &CloneOptions,
    ) -> Result<CloneReport, PcbCloneError> {
        options.validate()?;
        if references.is_empty() {
            tracing::warn!("No template references given, only zones and tracks will be cloned");
        }
        let templates = map_references(references, options)?;

        let marker = locate_marker(board, &options.marker_layer)?;
        tracing::info!(
            "Marker zone left top: ({}, {}) width: {} height: {}",
            marker.min.x,
            marker.min.y,
            marker.width(),
            marker.height()
        );

        let grid = options.grid();
        let mut report = CloneReport::default();

        for mapping in &templates {
            match place_clones(board, &mapping.template, &mapping.clones, &grid) {
                Some(outcome) => {
                    report.stats.components_moved += outcome.moved.len();
                    report.stats.components_flipped += outcome.flipped.len();
                    report.missing_clones.extend(outcome.missing);
                }
                None => report.missing_templates.push(mapping.template.clone()),
            }
        }
        tracing::info!("Components moved and oriented according to template");

        let zones = clone_zones(
            board,
            &marker,
            &options.marker_layer,
            &grid,
            options.net_tie_break,
        )?;
        report.stats.zones_cloned = zones.cloned;
        report.ambiguous_zones = zones.ambiguous;
        tracing::info!("Zones cloned");

        report.stats.tracks_cloned = clone_tracks(board, &marker, &grid);
        tracing::info!("Tracks cloned");

        report.templates = templates;
        Ok(report)
    }

    /// Load `input`, clone it and save the result to `output` (or back to
    /// `input`). Nothing is written on error or when `dry_run` is set.
    pub fn clone_file(
        input: &Path,
        references_path: &Path,
        output: Option<&Path>,
        options: &CloneOptions,
        dry_run: bool,
    ) -> Result<CloneReport, PcbCloneError> {
        let references = read_reference_list(references_path)?;
        let mut board = PcbParser::parse_pcb(input)?;
        tracing::debug!(
            "Loaded {}: {} footprints, {} zones, {} tracks",
            input.display(),
            board.footprints.len(),
            board.zones.len(),
            board.tracks.len()
        );

        let mut report = Self::clone_board(&mut board, &references, options)?;
        let output = output.unwrap_or(input);
        report.input = Some(input.to_path_buf());
        report.output = Some(output.to_path_buf());

        if dry_run {
            tracing::info!("Dry run, {} not written", output.display());
        } else {
            PcbWriter::write_pcb(&board, output)?;
            report.saved = true;
            tracing::info!("Output file saved to {}", output.display());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clone::test_support::*;

    fn refs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
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

    fn cell_board() -> Board {
        board(
            &[
                marker(0.0, 0.0, 8.0, 8.0),
                footprint("D201", "F.Cu", 4.0, 4.0, 0.0, Some((1, "A0"))),
                footprint("D301", "F.Cu", 40.0, 40.0, 0.0, Some((2, "A1"))),
                footprint("D401", "B.Cu", 50.0, 40.0, 0.0, Some((3, "A2"))),
                zone("F.Cu", (1, "A0"), [(3.0, 3.0), (5.0, 3.0), (5.0, 5.0), (3.0, 5.0)]),
            ]
            .join("\n"),
        )
    }

    #[test]
    fn test_default_options() {
        let options = CloneOptions::default();
        assert_eq!(options.offset_step, 100);
        assert_eq!(options.offset_start, 200);
        assert_eq!(options.grid().count(), 16);
        assert_eq!(options.net_tie_break, NetTieBreak::Last);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = CloneOptions::from_toml_str(
            r#"
            columns = 2
            pitch_y = 7.5
            net_tie_break = "error"
            "#,
        )
        .unwrap();
        assert_eq!(options.columns, 2);
        assert_eq!(options.rows, 4);
        assert_eq!(options.pitch_y, 7.5);
        assert_eq!(options.net_tie_break, NetTieBreak::Error);
        assert_eq!(options.marker_layer, "Cmts.User");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            CloneOptions::from_toml_str("net_tie_break = \"random\""),
            Err(PcbCloneError::Config(_))
        ));
    }

    #[test]
    fn test_negative_pitch_is_accepted() {
        let options = CloneOptions {
            pitch_x: -10.0,
            pitch_y: -2.5,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let zero_columns = CloneOptions {
            columns: 0,
            ..Default::default()
        };
        assert!(matches!(zero_columns.validate(), Err(PcbCloneError::InvalidOptions(_))));

        let nan_pitch = CloneOptions {
            pitch_x: f64::NAN,
            ..Default::default()
        };
        assert!(nan_pitch.validate().is_err());

        let zero_step = CloneOptions {
            offset_step: 0,
            ..Default::default()
        };
        assert!(zero_step.validate().is_err());
    }

    #[test]
    fn test_clone_board_report() {
        let mut board = cell_board();
        let report = PcbCloneCore::clone_board(&mut board, &refs(&["D201", "R201"]), &two_by_two()).unwrap();

        assert_eq!(
            report.templates[0],
            TemplateClones {
                template: "D201".to_string(),
                clones: refs(&["D301", "D401", "D501"]),
            }
        );
        assert_eq!(report.missing_templates, vec!["R201"]);
        assert_eq!(report.missing_clones, vec!["D501"]);
        assert_eq!(report.stats.components_moved, 2);
        assert_eq!(report.stats.components_flipped, 1);
        assert_eq!(report.stats.zones_cloned, 3);
        assert_eq!(report.stats.tracks_cloned, 0);
        assert!(!report.saved);
        assert!(!report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["templates"][0]["clones"][2], "D501");
        assert_eq!(json["stats"]["zones_cloned"], 3);
        assert_eq!(json["missing_templates"][0], "R201");
    }

    #[test]
    fn test_options_json_uses_lowercase_policy() {
        let options = CloneOptions {
            net_tie_break: NetTieBreak::First,
            ..Default::default()
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["net_tie_break"], "first");
        assert_eq!(json["marker_layer"], "Cmts.User");
    }

    #[test]
    fn test_missing_marker_leaves_board_untouched() {
        let mut board = board(&footprint("D201", "F.Cu", 4.0, 4.0, 0.0, None));
        let before = PcbWriter::to_string(&board);
        let err = PcbCloneCore::clone_board(&mut board, &refs(&["D201"]), &two_by_two()).unwrap_err();
        assert!(matches!(err, PcbCloneError::Clone(CloneError::MarkerNotFound { .. })));
        assert_eq!(PcbWriter::to_string(&board), before);
    }

    #[test]
    fn test_malformed_reference_leaves_board_untouched() {
        let mut board = cell_board();
        let before = PcbWriter::to_string(&board);
        let err = PcbCloneCore::clone_board(&mut board, &refs(&["D201", "LOGO"]), &two_by_two()).unwrap_err();
        assert!(matches!(err, PcbCloneError::Reference(ReferenceError::Malformed(_))));
        assert_eq!(PcbWriter::to_string(&board), before);
    }

    #[test]
    fn test_reference_list_is_whitespace_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.txt");
        std::fs::write(&path, "D201 C201\n\tR201\n\n").unwrap();
        assert_eq!(read_reference_list(&path).unwrap(), refs(&["D201", "C201", "R201"]));

        let missing = dir.path().join("nope.txt");
        assert!(matches!(read_reference_list(&missing), Err(PcbCloneError::File { .. })));
    }

    #[test]
    fn test_io_failure_is_not_a_parse_error() {
        let err: PcbCloneError =
            crate::parser::pcb::PcbParseError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).into();
        assert!(matches!(err, PcbCloneError::Io(_)));

        let err: PcbCloneError = crate::parser::pcb::PcbParseError::InvalidFormat("root".into()).into();
        assert!(matches!(err, PcbCloneError::Parse(_)));
    }
}
