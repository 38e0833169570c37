//! Value objects - Immutable objects defined by their attributes

mod game_day;
mod percent;

pub use game_day::GameDay;
pub use percent::Percent;
