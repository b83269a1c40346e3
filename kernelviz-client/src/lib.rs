use snafu::prelude::*;

pub mod client;

pub use client::{Client, ClientConfig, DEFAULT_BASE_URL, new};

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("server responded {status}: {message}"))]
    Api { status: u16, message: String },
    #[snafu(display("request failed: {message}"))]
    Request { message: String },
    #[snafu(display("failed to deserialize response: {message}"))]
    DeserializeJson { message: String },
    #[snafu(display("invalid server url {url}: {message}"))]
    InvalidUrl { url: String, message: String },
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Request {
            message: error.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
