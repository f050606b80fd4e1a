//! Outbound Discord API access.
//!
//! Every provider call leaves the process through [`api_client::ApiClient`],
//! so rate-limit handling is defined once and applied uniformly. The typed
//! endpoint surface lives in [`rest::DiscordApi`].

pub mod api_client;
pub mod rest;
