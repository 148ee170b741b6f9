//! Conversion relay
//!
//! Forwards a normalized projection of every ingested event to the
//! external conversion-tracking API. The server-side channel keeps
//! attribution working even when browser pixels are blocked.
//!
//! ## Architecture
//!
//! The relay follows a store-first principle:
//! - Events are always written to the local store by ingestion
//! - Relay dispatch runs alongside the write, never gated by it
//! - Network failures never surface to the event sender
//!
//! Enable the relay in `~/.config/cartpulse/config.toml`:
//!
//! ```toml
//! [relay]
//! enabled = true
//! endpoint_url = "https://graph.facebook.com/v18.0/<pixel_id>/events"
//! access_token = "EAAB..."
//! site_origin = "https://shop.example.com"
//! ```

mod client;
mod payload;

pub use client::ConversionClient;
pub use payload::{event_source_url, ConversionEvent, ConversionPayload, UserData};
