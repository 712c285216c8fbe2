//! Frontline - front-based war simulation
//!
//! Wars are fought on generated fronts between two belligerents. Corps drawn
//! from standing armies march, fight, plunder and besiege; battles resolve
//! from unit profiles; the front keeps the war score and decides the peace.

pub mod ai;
pub mod combat;
pub mod core;
pub mod corps;
pub mod front;
pub mod simulation;
pub mod units;
