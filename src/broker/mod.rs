pub mod broker_client;
pub mod broker_errors;
pub mod broker_model;
pub mod market_hours;

pub use broker_client::{BrokerCredentials, QuoteProviderTrait, SmartBrokerClient};
pub use broker_errors::BrokerError;
pub use broker_model::{ApiEnvelope, FullQuote, QuoteMode, SessionTokens};
pub use market_hours::{is_market_open_at, market_status_now, next_session_start, MarketStatus};
