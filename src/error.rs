use thiserror::Error;

/// Anomalies the tokenizer recovers from. They never abort tokenization; each one is reported
/// through the error channel while the token stream carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, strum_macros::EnumIs, strum_macros::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenizationError {
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("stray trailing backslash")]
    StrayTrailingBackslash,
    #[error("bad url")]
    BadUrl,
}
