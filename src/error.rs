use thiserror::Error;

use crate::bus::BusError;
use crate::config::ConfigError;
use crate::loader::LoadError;
use crate::tokenizer::TokenizerError;
use crate::verse_ref::VerseRefError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),
    #[error("Verse reference error: {0}")]
    VerseRef(#[from] VerseRefError),
    // messaging
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
