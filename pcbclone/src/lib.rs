//! pcbclone - clone a hand-made KiCad PCB layout cell across a grid
//!
//! Boards driven by a hierarchical schematic often repeat one sub-circuit
//! many times, with each sheet annotated from a different hundred (`D201`,
//! `D301`, `D401`, ...). This library takes the layout of the first cell,
//! outlined by a zone on the comment layer, and repeats it: clone components
//! are moved into their grid cells, zones inside the outline are copied and
//! connected to the net of the pads they cover, and tracks touching the
//! outline are copied.
//!
//! # Quick Start
//!
//! ```no_run
//! use pcbclone::{CloneOptions, PcbCloneCore};
//! use std::path::Path;
//!
//! let options = CloneOptions::default();
//! let report = PcbCloneCore::clone_file(
//!     Path::new("board.kicad_pcb"),
//!     Path::new("references.txt"),
//!     Some(Path::new("board_cloned.kicad_pcb")),
//!     &options,
//!     false,
//! ).unwrap();
//!
//! println!("{} zones cloned", report.stats.zones_cloned);
//! ```
//!
//! # Features
//!
//! - **Lossless editing**: items the cloner does not touch are written back verbatim
//! - **Side handling**: clones on the other board side are flipped to match
//! - **Net inference**: copied zones take the net of the pads inside them,
//!   with a configurable rule for ambiguous cases

pub mod clone;
pub mod core;
pub mod geometry;
pub mod parser;

// Re-export main types
pub use clone::{CloneError, CloneGrid, Document, NetTieBreak, ReferenceMapper};
pub use core::{
    read_reference_list, CloneOptions, CloneReport, CloneStats, PcbCloneCore, PcbCloneError,
    TemplateClones,
};
pub use parser::pcb::{PcbParser, PcbWriter};
pub use parser::pcb_schema::Board;

/// Parse a PCB file (convenience wrapper).
pub fn parse_pcb(path: &std::path::Path) -> Result<Board, PcbCloneError> {
    PcbParser::parse_pcb(path).map_err(PcbCloneError::from)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Board, CloneOptions, CloneReport, NetTieBreak, PcbCloneCore, PcbCloneError, PcbParser,
        PcbWriter,
    };
}
