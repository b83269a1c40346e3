use snafu::prelude::*;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("{message}"))]
    Client { message: String },
    #[snafu(display("a polling chain is already running"))]
    ChainActive,
}

impl From<kernelviz_client::Error> for Error {
    fn from(value: kernelviz_client::Error) -> Self {
        Error::Client {
            message: value.to_string(),
        }
    }
}
