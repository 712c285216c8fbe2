//! Unit catalog and army compositions

pub mod ability;
pub mod army;
pub mod catalog;
pub mod category;

pub use ability::Ability;
pub use army::{total_losses, Army, Losses};
pub use catalog::{CatalogLoadError, UnitCatalog, UnitType, DEFAULT_OBSOLESCENCE};
pub use category::{PerCategory, UnitCategory};
