pub mod face;
pub mod payload;
pub mod suggestion;
pub mod wire;
