mod geometry;

pub use self::geometry::*;
