mod traits;

pub use traits::{Bar, BrokerClient, MarketData};
