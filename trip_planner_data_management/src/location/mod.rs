//! Location search and map picking: geocoding, debounced search and the session
//! that ties them to a selected coordinate and camera.

pub mod camera;
pub mod debouncer;
pub mod geocoding;
pub mod nominatim;
pub mod session;
