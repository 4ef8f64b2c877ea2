pub mod polymarket;
pub mod simulated;
