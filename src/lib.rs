pub mod camera;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod pyramid;
pub mod select;

#[cfg(test)]
pub(crate) mod test_utils;
