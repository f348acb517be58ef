//! Zone cloning and net inference.
//!
//! A zone copied into another cell must be connected to that cell's net, not
//! the template's. The net is inferred from the pads that end up inside the
//! copied outline on the zone's layer.

use serde::{Deserialize, Serialize};

use super::{BoundaryTestable, CloneError, CloneGrid, Contact, Document, Translatable};
use crate::geometry::BoundingBox;
use crate::parser::pcb_schema::PcbNet;

/// How to pick a net when pads of several nets sit inside one copied zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetTieBreak {
    /// The last pad in board order wins.
    #[default]
    Last,
    /// The first pad in board order wins.
    First,
    /// Abort the run.
    Error,
}

/// A copied zone whose outline holds pads of more than one net.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AmbiguousZone {
    pub slot: usize,
    pub layer: String,
    pub nets: Vec<String>,
    pub chosen: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ZoneOutcome {
    pub cloned: usize,
    pub ambiguous: Vec<AmbiguousZone>,
}

/// Copies every zone anchored inside `marker` into each non-template cell.
///
/// Zones on `marker_layer` (the marker itself) are never copied. Components
/// must already be at their final positions, since the copied zones take
/// their nets from the pads they cover.
pub fn clone_zones<D: Document>(
    doc: &mut D,
    marker: &BoundingBox,
    marker_layer: &str,
    grid: &CloneGrid,
    tie_break: NetTieBreak,
) -> Result<ZoneOutcome, CloneError> {
    let contacts = doc.contacts();
    let templates: Vec<D::Region> = doc
        .regions()
        .iter()
        .filter(|zone| zone.layer() != marker_layer)
        .filter(|zone| zone.anchor().map_or(false, |p| marker.contains(p)))
        .cloned()
        .collect();

    tracing::info!(
        "Cloning {} zone(s) into {} cell(s), testing {} pad(s) per copy",
        templates.len(),
        grid.count().saturating_sub(1),
        contacts.len()
    );

    let mut outcome = ZoneOutcome::default();
    for zone in &templates {
        for (slot, offset) in grid.slots() {
            let mut copy = zone.duplicate_moved(offset);
            let inside = contacts_inside(&copy, &contacts);

            if let Some(net) = resolve_net(&inside, tie_break, slot, copy.layer(), &mut outcome)? {
                copy.assign_net(&net);
            }
            doc.add_region(copy);
            outcome.cloned += 1;
        }
    }

    Ok(outcome)
}

fn contacts_inside<'a, R: BoundaryTestable>(zone: &R, contacts: &'a [Contact]) -> Vec<&'a Contact> {
    contacts
        .iter()
        .filter(|c| c.is_on_layer(zone.layer()) && zone.contains(c.position))
        .collect()
}

/// Picks the net for a copied zone from the pads inside it, in scan order.
/// `None` leaves the copy on the template zone's net.
fn resolve_net(
    inside: &[&Contact],
    tie_break: NetTieBreak,
    slot: usize,
    layer: &str,
    outcome: &mut ZoneOutcome,
) -> Result<Option<PcbNet>, CloneError> {
    let mut nets: Vec<String> = Vec::new();
    for contact in inside {
        if !nets.contains(&contact.net.name) {
            nets.push(contact.net.name.clone());
        }
    }

    let chosen = match tie_break {
        NetTieBreak::Last => inside.last(),
        NetTieBreak::First => inside.first(),
        NetTieBreak::Error if nets.len() > 1 => {
            return Err(CloneError::AmbiguousNet {
                slot,
                layer: layer.to_string(),
                nets,
            })
        }
        NetTieBreak::Error => inside.first(),
    };
    let Some(chosen) = chosen else {
        tracing::debug!("No pads inside cloned zone on {} at slot {}", layer, slot);
        return Ok(None);
    };

    if nets.len() > 1 {
        tracing::warn!(
            "Cloned zone on {} at slot {} covers pads of nets {}; using {}",
            layer,
            slot,
            nets.join(", "),
            chosen.net.name
        );
        outcome.ambiguous.push(AmbiguousZone {
            slot,
            layer: layer.to_string(),
            nets,
            chosen: chosen.net.name.clone(),
        });
    }

    Ok(Some(chosen.net.clone()))
}
