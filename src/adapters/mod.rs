pub mod alpaca_data;
pub mod alpaca_rest;

pub use alpaca_data::AlpacaDataClient;
pub use alpaca_rest::AlpacaClient;
