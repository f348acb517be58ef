//! Simple cloning example: clone a board's template cell and print the report.

use pcbclone::prelude::*;
use std::path::Path;

fn main() -> Result<(), PcbCloneError> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/cell_grid.kicad_pcb".to_string());
    let references = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/references.txt".to_string());
    let input = Path::new(&input);

    if !input.exists() {
        eprintln!("File not found: {}", input.display());
        eprintln!("Usage: cargo run --example simple_clone [board.kicad_pcb] [references.txt]");
        std::process::exit(1);
    }

    let options = CloneOptions {
        pitch_x: 10.0,
        pitch_y: 10.0,
        columns: 2,
        rows: 2,
        ..Default::default()
    };

    // Dry run: clone in memory only
    let report = PcbCloneCore::clone_file(input, Path::new(&references), None, &options, true)?;

    for mapping in &report.templates {
        println!("{} -> {}", mapping.template, mapping.clones.join(", "));
    }
    println!();
    println!("Components moved: {}", report.stats.components_moved);
    println!("Zones cloned:     {}", report.stats.zones_cloned);
    println!("Tracks cloned:    {}", report.stats.tracks_cloned);

    for zone in &report.ambiguous_zones {
        println!(
            "Warning: zone at slot {} covers nets {}, using {}",
            zone.slot,
            zone.nets.join(", "),
            zone.chosen
        );
    }

    Ok(())
}
