//! mediarip core - download and decrypt pipeline
//!
//! This crate turns item ids on a streaming backend into files on disk.
//! A [`Client`] logs in and resolves ids into [`Downloadable`]s; a
//! downloadable fetches its stream in fixed-size blocks, decrypting
//! Deezer streams on the fly, and reports progress in network bytes.
//! Every client gates its requests through a [`RateLimiter`].

mod chunk;
pub mod client;
mod converter;
pub mod crypto;
mod download;
pub mod downloadable;
mod error;
mod rate_limiter;
mod session;
mod settings;

pub use chunk::*;
pub use client::{build_client, Client, DeezerClient, SoundcloudClient};
pub use converter::*;
pub use download::*;
pub use downloadable::Downloadable;
pub use error::*;
pub use rate_limiter::*;
pub use session::*;
pub use settings::*;

pub use mediarip_types::{MediaType, Settings, Source};
