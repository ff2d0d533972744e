pub mod geometry;

pub use geometry::Geometry;
