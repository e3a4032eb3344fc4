//! Retrying HTTP transport shared by every outbound call

mod client;

pub use client::{HttpClient, HttpClientBuilder, HttpResponse};

#[cfg(test)]
pub(crate) mod testing;
