pub mod controller;
pub mod indicators;
pub mod liquidator;

pub use controller::OrderController;
pub use liquidator::{CloseOutcome, LiquidationReport, Liquidator};
