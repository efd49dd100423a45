//! Behavioural step helpers for token-exchange scenarios.


pub use state::{TokenExchangeState, token_exchange_state};
