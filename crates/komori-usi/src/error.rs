//! USI protocol errors.

/// Errors that can occur while parsing a USI command line.
#[derive(Debug, thiserror::Error)]
pub enum UsiError {
    /// The `position` command is missing `startpos` or `sfen` keyword.
    #[error("malformed position command: missing startpos or sfen keyword")]
    MalformedPosition,

    /// Failed to parse an SFEN string.
    #[error("invalid SFEN: {sfen}")]
    InvalidSfen {
        /// The SFEN string that failed to parse.
        sfen: String,
    },

    /// A move string in the `position` command did not match any legal
    /// move at the position it was applied to.
    #[error("invalid move: {usi_move}")]
    InvalidMove {
        /// The USI move string that failed to resolve.
        usi_move: String,
    },

    /// `go` was given a subcommand other than `mate`.
    #[error("unsupported go subcommand: {subcommand}")]
    UnsupportedGo {
        /// The subcommand token that followed `go`.
        subcommand: String,
    },
}
