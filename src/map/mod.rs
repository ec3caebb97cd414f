pub mod annotation;
pub mod projection;
pub mod renderer;
pub mod selection;
pub mod selector;
pub mod tiers;

pub use annotation::{RegionAnnotation, CITY_ZOOM};
pub use projection::Viewport;
pub use renderer::{MapRenderer, MapScene};
pub use selection::SelectionCoordinator;
pub use selector::TierSelector;
pub use tiers::Tier;
