pub mod export;
pub mod land_cover;
pub mod legend;
pub mod map_display;
