mod error;
mod gate;
mod key;
mod price_client;
mod profile_store;
mod registry;

pub mod feed;
pub mod feed_client;
pub mod render;
pub mod scheduler;

pub use error::{FeedError, FetchError, SlotError};
pub use feed::{FeedConfig, FeedReport, FeedWatcher, Notifier};
pub use feed_client::{FeedSource, TwitterClient};
pub use gate::ReadyGate;
pub use key::{EntityKey, NETWORK_FEE, SlotId};
pub use price_client::{
    BinanceClient, EtherscanClient, GasOracle, GasTiers, PriceSource, parse_gas_oracle,
    parse_ticker,
};
pub use profile_store::ProfileStore;
pub use registry::Registry;
pub use scheduler::{Scheduler, SlotDirectory, TickReport};
