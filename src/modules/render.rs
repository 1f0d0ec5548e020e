use crate::modules::grid::{GRID_SIDE, MapSnapshot};

/// Operator-facing view of a populated map: one cell per room showing the
/// description, encounter, and loot ids.
pub fn render_layout(snapshot: &MapSnapshot) -> String {
    let mut out = String::new();
    for (i, room) in snapshot.rooms.iter().enumerate() {
        out.push_str(&format!(
            "[{:<4} {:<4} {:<4}]",
            short(&room.description_id),
            short(room.encounter_id.as_deref().unwrap_or("-")),
            short(room.loot_id.as_deref().unwrap_or("-")),
        ));
        if (i + 1) % GRID_SIDE == 0 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}

/// In-game progress view: the player's cell, visited cells, and nothing
/// else. The exit is deliberately not revealed.
pub fn render_progress(snapshot: &MapSnapshot) -> String {
    let mut out = String::new();
    for (i, room) in snapshot.rooms.iter().enumerate() {
        let glyph = if room.occupied {
            '@'
        } else if room.visited {
            'x'
        } else {
            '.'
        };
        out.push(glyph);
        if (i + 1) % GRID_SIDE == 0 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}

fn short(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(4)
        .map(|(index, _)| index)
        .unwrap_or(id.len());
    &id[..end]
}
