pub mod error;
pub mod import;
pub mod lookup;
pub mod model;
pub mod params;
pub mod persistables;
pub mod validate;
