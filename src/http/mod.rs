//! HTTP surface of the gateway.

mod handlers;
mod server;
mod state;

pub use handlers::{
    create_payment_intent, health, ErrorResponse, PaymentIntentResponse, RATE_LIMITED_MESSAGE,
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET,
};
pub use server::{router, HttpServer};
pub use state::AppState;
