pub mod location;
pub mod observation;
pub mod series;
pub mod traits;
