//! Front terrain grid
//!
//! A rectangular hex grid (`q` = column, `r` = row) with procedurally rolled
//! terrain and a fixed road network: one road along the centre row and two
//! along the quarter columns.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::TerrainGenConfig;
use crate::core::types::HexCoord;

/// Terrain types affecting movement and defense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontTerrain {
    #[default]
    Plain,
    Forest,
    Mountain,
    River,
    Road,
    Marsh,
}

impl FrontTerrain {
    /// Movement cost multiplier (plain = 1.0)
    pub fn movement_cost(&self) -> f64 {
        match self {
            Self::Plain => 1.0,
            Self::Forest => 1.67,
            Self::Mountain => 2.5,
            Self::River => 3.33,
            Self::Road => 0.67,
            Self::Marsh => 3.0,
        }
    }

    /// Defense bonus when defending in this terrain
    pub fn defense_bonus(&self) -> f64 {
        match self {
            Self::Plain => 0.0,
            Self::Forest => 0.2,
            Self::Mountain => 0.4,
            Self::River => -0.2,
            Self::Road => -0.1,
            Self::Marsh => -0.1,
        }
    }

    /// River and marsh can neither hold buildings nor serve as move targets
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::River | Self::Marsh)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    pub width: u32,
    pub height: u32,
    /// Row-major cells
    cells: Vec<FrontTerrain>,
}

impl TerrainGrid {
    /// Uniform grid, mostly for tests and scripted scenarios
    pub fn filled(width: u32, height: u32, terrain: FrontTerrain) -> Self {
        Self {
            width,
            height,
            cells: vec![terrain; (width * height) as usize],
        }
    }

    /// Roll terrain for every cell, then lay roads over plain cells
    pub fn generate(width: u32, height: u32, config: &TerrainGenConfig, rng: &mut impl Rng) -> Self {
        let mut grid = Self::filled(width, height, FrontTerrain::Plain);
        for r in 0..height {
            for q in 0..width {
                let terrain = roll_cell(r, height, config, rng.gen());
                grid.cells[(r * width + q) as usize] = terrain;
            }
        }
        grid.add_roads();
        grid
    }

    fn add_roads(&mut self) {
        let main_row = self.height / 2;
        for q in 0..self.width {
            self.pave(HexCoord::new(q as i32, main_row as i32));
        }
        let left = (self.width as f64 * 0.25).floor() as i32;
        let right = (self.width as f64 * 0.75).floor() as i32;
        for r in 0..self.height as i32 {
            self.pave(HexCoord::new(left, r));
            self.pave(HexCoord::new(right, r));
        }
    }

    fn pave(&mut self, at: HexCoord) {
        if self.get(at) == Some(FrontTerrain::Plain) {
            self.set(at, FrontTerrain::Road);
        }
    }

    pub fn in_bounds(&self, at: HexCoord) -> bool {
        at.q >= 0 && at.r >= 0 && (at.q as u32) < self.width && (at.r as u32) < self.height
    }

    pub fn get(&self, at: HexCoord) -> Option<FrontTerrain> {
        self.in_bounds(at)
            .then(|| self.cells[(at.r as u32 * self.width + at.q as u32) as usize])
    }

    pub fn set(&mut self, at: HexCoord, terrain: FrontTerrain) {
        if self.in_bounds(at) {
            let idx = (at.r as u32 * self.width + at.q as u32) as usize;
            self.cells[idx] = terrain;
        }
    }

    /// In bounds and not river or marsh
    pub fn is_open(&self, at: HexCoord) -> bool {
        self.get(at).is_some_and(|t| t.is_open())
    }

    /// Movement cost of a cell; out-of-bounds cells cost as plain
    pub fn movement_cost(&self, at: HexCoord) -> f64 {
        self.get(at).map(|t| t.movement_cost()).unwrap_or(1.0)
    }

    pub fn defense_bonus(&self, at: HexCoord) -> f64 {
        self.get(at).map(|t| t.defense_bonus()).unwrap_or(0.0)
    }

    /// Mean movement cost along the greedy hex path to `to`
    pub fn average_path_cost(&self, from: HexCoord, to: HexCoord) -> f64 {
        let path = from.line_to(&to);
        if path.is_empty() {
            return self.movement_cost(from);
        }
        path.iter().map(|&c| self.movement_cost(c)).sum::<f64>() / path.len() as f64
    }

    /// Open cell closest to `near`, scanning outward ring by ring
    pub fn nearest_open(&self, near: HexCoord) -> Option<HexCoord> {
        if self.is_open(near) {
            return Some(near);
        }
        let radius = self.width.max(self.height) as i32;
        for ring in 1..=radius {
            let found = self
                .coords()
                .filter(|c| c.distance(&near) == ring as u32 && self.is_open(*c))
                .min();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// All coordinates in row-major order
    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        (0..self.height as i32)
            .flat_map(move |r| (0..self.width as i32).map(move |q| HexCoord::new(q, r)))
    }

    pub fn count(&self, terrain: FrontTerrain) -> usize {
        self.cells.iter().filter(|&&t| t == terrain).count()
    }
}

fn roll_cell(row: u32, height: u32, config: &TerrainGenConfig, roll: f64) -> FrontTerrain {
    let edge_distance = row.min(height.saturating_sub(1).saturating_sub(row));
    let edge_bonus = if edge_distance < config.edge_rows {
        config.edge_mountain_bonus
    } else {
        0.0
    };
    let near_centre = (row as f64 - height as f64 / 2.0).abs() < config.river_rows as f64;
    let river_bonus = if near_centre { config.center_river_bonus } else { 0.0 };

    if roll < config.plain {
        FrontTerrain::Plain
    } else if roll < config.forest {
        FrontTerrain::Forest
    } else if roll < config.mountain + edge_bonus {
        FrontTerrain::Mountain
    } else if roll < config.river + river_bonus {
        FrontTerrain::River
    } else if roll < config.marsh {
        FrontTerrain::Marsh
    } else {
        FrontTerrain::Plain
    }
}
