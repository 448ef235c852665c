use match3_core::{CellCoord, Grid};

/// Damage dealt to an obstacle overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObstacleHit {
    /// Cell carrying the overlay.
    pub cell: CellCoord,
    /// Durability left after the hit.
    pub remaining: u32,
}

/// Lowers the durability of every obstacle 4-adjacent to a destroyed cell.
///
/// Each destroyed cell deals one point to each neighbouring obstacle, so an
/// obstacle bordering two destroyed cells loses two points. Pieces resting
/// on an obstacle are left alone; only the overlay wears down.
pub fn damage_obstacles(grid: &mut Grid, destroyed: &[CellCoord]) -> Vec<ObstacleHit> {
    let mut hits = Vec::new();
    for cell in destroyed {
        let neighbors: Vec<CellCoord> = grid.neighbors(*cell).collect();
        for neighbor in neighbors {
            let Some(slot) = grid.get_mut(neighbor) else {
                continue;
            };
            let durability = slot.durability();
            if durability == 0 {
                continue;
            }
            slot.set_durability(durability - 1);
            hits.push(ObstacleHit {
                cell: neighbor,
                remaining: durability - 1,
            });
        }
    }
    hits
}
