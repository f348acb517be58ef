//! Component placement for clone cells.

use serde::Serialize;

use super::{CloneGrid, Document, Positionable};

/// What happened to the clones of one template component.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlacementOutcome {
    pub template: String,
    pub moved: Vec<String>,
    pub flipped: Vec<String>,
    pub missing: Vec<String>,
}

/// Moves the clones of `template` into their grid cells.
///
/// `clones[i]` goes to grid slot `i + 1`: the clone takes the template's
/// position plus the slot offset and the template's rotation, and is flipped
/// first when it sits on the other board side. Returns `None` when the
/// template itself is not on the board; missing clones are skipped and
/// listed in the outcome.
pub fn place_clones<D: Document>(
    doc: &mut D,
    template: &str,
    clones: &[String],
    grid: &CloneGrid,
) -> Option<PlacementOutcome> {
    let (origin, rotation, side) = match doc.component(template) {
        Some(c) => (c.position(), c.rotation(), c.side()),
        None => {
            tracing::warn!("Component {} was not found in the template board", template);
            return None;
        }
    };

    let mut outcome = PlacementOutcome {
        template: template.to_string(),
        ..Default::default()
    };

    for (i, clone_ref) in clones.iter().enumerate() {
        let Some(clone) = doc.component_mut(clone_ref) else {
            tracing::warn!("Component to be moved ({}) is not found in the board", clone_ref);
            outcome.missing.push(clone_ref.clone());
            continue;
        };

        if clone.side() != side {
            clone.flip();
            outcome.flipped.push(clone_ref.clone());
        }

        let target = origin + grid.offset(i + 1);
        clone.set_position(target);
        clone.set_rotation(rotation);
        tracing::debug!(
            "Placed {} at ({:.3}, {:.3}) rotation {}",
            clone_ref,
            target.x,
            target.y,
            rotation
        );
        outcome.moved.push(clone_ref.clone());
    }

    Some(outcome)
}
