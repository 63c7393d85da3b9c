//! One module per subcommand, each a thin `async fn` that a `Session` and
//! the parsed flags are handed to from `main`.

pub mod clean;
pub mod delete;
pub mod download;
pub mod list;
pub mod statistic;
pub mod upload;
pub mod wipe;
