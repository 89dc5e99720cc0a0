//! Common types shared by the field acquisition crates.

pub mod error;
pub mod grid;
pub mod time;

pub use error::{FieldError, FieldResult};
pub use grid::{latlon_to_index, GridSpec, GRID_HEIGHT, SOURCE_WIDTH, WRAPPED_WIDTH};
pub use time::{Cycle, ForecastStep, ModelRun, Timestep};
