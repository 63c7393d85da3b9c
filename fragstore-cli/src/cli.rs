/*!
The `cli` module provides the data types used for parsing the command line
arguments: the top-level `Opt`/`Command` pair `structopt` derives from, and
`ByteSize`, the `-fs=0.5MB`-style size parser every size-taking flag uses.
*/

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use structopt::StructOpt;

/// A byte count parsed from a `<number><suffix>` flag value, suffixes
/// `B`/`KB`/`MB`/`GB` using decimal (SI) multipliers, so `0.5MB` means
/// `500_000` bytes exactly, per the CLI's size-flag contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl FromStr for ByteSize {
    type Err = Error;

    fn from_str(input: &str) -> Result<ByteSize, Error> {
        let input = input.trim();
        let (number_part, multiplier) = if let Some(prefix) = input.strip_suffix("GB") {
            (prefix, 1_000_000_000f64)
        } else if let Some(prefix) = input.strip_suffix("MB") {
            (prefix, 1_000_000f64)
        } else if let Some(prefix) = input.strip_suffix("KB") {
            (prefix, 1_000f64)
        } else if let Some(prefix) = input.strip_suffix('B') {
            (prefix, 1f64)
        } else {
            (input, 1f64)
        };
        let value: f64 = number_part
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid size {:?}: expected a number with an optional B/KB/MB/GB suffix", input))?;
        if value < 0.0 {
            return Err(anyhow!("size {:?} must not be negative", input));
        }
        Ok(ByteSize((value * multiplier).round() as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// Subcommands and their flags, as specified.
#[derive(StructOpt, Debug, Clone)]
pub enum Command {
    /// Ingests a file, a directory, or stdin as one or more compounds.
    Upload {
        /// Path to a file or directory to ingest. Reads stdin if omitted.
        #[structopt(short, long, parse(from_os_str))]
        input: Option<PathBuf>,
        /// Name for the new compound. Required when reading from stdin;
        /// defaults to the input path's file name otherwise. When `input`
        /// is a directory, this is used as the compound name prefix.
        #[structopt(short, long)]
        name: Option<String>,
        /// Allow overwriting an existing compound of the same name.
        #[structopt(short = "o", long = "ow")]
        overwrite: bool,
        /// Update mode: compare each source file's whole-stream checksum
        /// against the stored compound before re-reading it; unchanged
        /// files are skipped entirely.
        #[structopt(short, long = "u")]
        update: bool,
        /// Fragment size, e.g. `--fs=0.5MB`. Defaults to the configured value.
        #[structopt(long = "fs")]
        fragment_size: Option<ByteSize>,
        /// Target resource size, e.g. `--rs=4MB`. Defaults to the configured value.
        #[structopt(long = "rs")]
        resource_size: Option<ByteSize>,
    },
    /// Retrieves a compound and verifies its integrity.
    Download {
        /// Name of the compound to retrieve.
        #[structopt(short, long)]
        name: String,
        /// Path to write the reconstructed stream to. Writes stdout if omitted.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// Enumerates compounds in the catalog.
    List {
        /// Print per-compound size and fragment-count detail.
        #[structopt(long)]
        details: bool,
    },
    /// Removes a compound and decrements its fragments' refcounts.
    Delete {
        #[structopt(short, long)]
        name: String,
    },
    /// Garbage-collects resources whose fragments are all dead.
    Clean {
        /// Also rewrite sprawling compounds into freshly packed resources.
        #[structopt(short = "d", long = "df")]
        defragment: bool,
    },
    /// Prints counts, sizes, dedup ratio, and fill efficiency.
    Statistic,
    /// Drops the catalog.
    Wipe {
        /// Also delete every resource from the backend.
        #[structopt(short, long)]
        clear_backend: bool,
    },
}

/// Top-level CLI options.
#[derive(Debug, StructOpt)]
#[structopt(
    name = "fragstore",
    about = "Stores arbitrary byte streams on backends that were not designed to carry them",
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Opt {
    /// Path to a config file. Overrides `$FRAGSTORE_CONFIG` and the XDG default.
    #[structopt(short, long, parse(from_os_str), env = "FRAGSTORE_CONFIG", hide_env_values = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity; repeat for more (`-v`, `-vv`, `-vvv`).
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
    #[structopt(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_si_suffixes() {
        assert_eq!("0.5MB".parse::<ByteSize>().unwrap(), ByteSize(500_000));
        assert_eq!("5MB".parse::<ByteSize>().unwrap(), ByteSize(5_000_000));
        assert_eq!("64KB".parse::<ByteSize>().unwrap(), ByteSize(64_000));
        assert_eq!("128B".parse::<ByteSize>().unwrap(), ByteSize(128));
        assert_eq!("2GB".parse::<ByteSize>().unwrap(), ByteSize(2_000_000_000));
    }

    #[test]
    fn bare_number_is_bytes() {
        assert_eq!("1024".parse::<ByteSize>().unwrap(), ByteSize(1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-size".parse::<ByteSize>().is_err());
    }

    #[test]
    fn rejects_negative() {
        assert!("-5MB".parse::<ByteSize>().is_err());
    }
}
