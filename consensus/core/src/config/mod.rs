pub mod constants;
pub mod genesis;
pub mod params;

pub use params::Params;
