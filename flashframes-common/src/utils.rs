pub mod fsutils;
pub mod subprocess;
pub mod workers;
