use match3_core::{Cell, ConfigError, Content, Grid, LevelConfig};
use match3_system_gravity::{refill, settle};
use match3_system_matching::detect;
use match3_system_shuffle::{has_any_legal_move, shuffle};
use rand::Rng;

use crate::BoardError;

/// Builds the starting grid of a level.
///
/// A fixed layout is used as written, apart from gaps which are settled.
/// Otherwise stones are placed first and every remaining cell is filled
/// bottom-up with kinds that complete no run.
pub(crate) fn generate<R: Rng + ?Sized>(
    config: &LevelConfig,
    rng: &mut R,
) -> Result<Grid, BoardError> {
    let mut grid = match &config.layout {
        Some(rows) => {
            let grid = Grid::from_layout(rows)?;
            if grid.columns() != config.columns || grid.rows() != config.rows {
                return Err(ConfigError::LayoutSize {
                    columns: config.columns,
                    rows: config.rows,
                    found_columns: grid.columns(),
                    found_rows: grid.rows(),
                }
                .into());
            }
            grid
        }
        None => Grid::new(config.columns, config.rows),
    };

    for &stone in &config.stones {
        grid.set(stone, Cell::new(Content::Stone))?;
    }

    if config.layout.is_some() {
        if !grid.is_full() {
            let _ = settle(
                &mut grid,
                &config.palette,
                rng,
                config.tuning.refill_attempts,
            );
        }
    } else {
        for column in 0..grid.columns() {
            let _ = refill(
                &mut grid,
                column,
                &config.palette,
                rng,
                config.tuning.refill_attempts,
            );
        }
        if !detect(&grid).is_empty() || !has_any_legal_move(&grid) {
            let _ = shuffle(&mut grid, rng, config.tuning.shuffle_attempts)?;
        }
    }

    for obstacle in &config.obstacles {
        if let Some(cell) = grid.get_mut(obstacle.cell) {
            cell.set_durability(obstacle.durability);
        }
    }
    Ok(grid)
}
