/*!
The `fragstore` binary provides a lightweight command-line front end over
the `fragstore` crate's `Session`/`CompoundManager`: `upload`, `download`,
`list`, `delete`, `clean`, `statistic`, and `wipe`.
*/
mod cli;
mod commands;
mod exit_code;

use anyhow::Result;
use cli::{Command, Opt};
use fragstore::Session;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();
    init_tracing(opt.verbose);

    let result = run(opt).await;
    match result {
        Ok(()) => std::process::exit(exit_code::SUCCESS),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(exit_code::classify(&e));
        }
    }
}

/// Initializes the `tracing` subscriber from `RUST_LOG`, falling back to a
/// verbosity level driven by repeated `-v` flags when the environment
/// variable is unset. Only the binary installs a subscriber; the library
/// crates only consume `tracing`'s macros.
fn init_tracing(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(opt: Opt) -> Result<()> {
    let session = Session::open_from_path(opt.config).await?;

    match opt.command {
        Command::Upload {
            input,
            name,
            overwrite,
            update,
            fragment_size,
            resource_size,
        } => {
            commands::upload::upload(
                &session,
                input,
                name,
                overwrite,
                update,
                fragment_size,
                resource_size,
            )
            .await
        }
        Command::Download { name, output } => commands::download::download(&session, name, output).await,
        Command::List { details } => commands::list::list(&session, details).await,
        Command::Delete { name } => commands::delete::delete(&session, name).await,
        Command::Clean { defragment } => commands::clean::clean(&session, defragment).await,
        Command::Statistic => commands::statistic::statistic(&session).await,
        Command::Wipe { clear_backend } => commands::wipe::wipe(&session, clear_backend).await,
    }
}
