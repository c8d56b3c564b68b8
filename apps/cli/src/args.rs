use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use bytesink_transfer::TransferOptions;

/// Copy a byte stream into a local file.
#[derive(Debug, Parser)]
#[command(name = "bytesink", version)]
pub struct Args {
    /// Source file, or `-` for stdin.
    pub source: String,

    /// Destination file. Missing parent directories are created.
    pub destination: PathBuf,

    /// Append to the destination if it exists instead of overwriting it.
    #[arg(long)]
    pub append: bool,

    /// Byte count the source must produce. Defaults to the source file size.
    #[arg(long, value_name = "BYTES")]
    pub expected_size: Option<u64>,

    /// Cancel the transfer after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Read buffer size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Bytes between progress events.
    #[arg(long, value_name = "BYTES")]
    pub progress_interval: Option<u64>,

    /// JSON file with transfer options; flags take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn reads_stdin(&self) -> bool {
        self.source == "-"
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Layers command-line overrides on top of `base`.
    pub fn apply_overrides(&self, mut base: TransferOptions) -> TransferOptions {
        if let Some(size) = self.buffer_size {
            base.buffer_size = size;
        }
        if let Some(interval) = self.progress_interval {
            base.progress_interval = interval;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal() {
        let args = Args::try_parse_from(["bytesink", "-", "out.bin"]).unwrap();
        assert!(args.reads_stdin());
        assert!(!args.append);
        assert_eq!(args.destination, PathBuf::from("out.bin"));
        assert!(args.timeout().is_none());
    }

    #[test]
    fn parses_all_flags() {
        let args = Args::try_parse_from([
            "bytesink",
            "--append",
            "--expected-size",
            "42",
            "--timeout",
            "5",
            "--buffer-size",
            "4096",
            "--progress-interval",
            "1024",
            "in.bin",
            "out.bin",
        ])
        .unwrap();
        assert!(args.append);
        assert!(!args.reads_stdin());
        assert_eq!(args.expected_size, Some(42));
        assert_eq!(args.timeout(), Some(Duration::from_secs(5)));

        let opts = args.apply_overrides(TransferOptions::default());
        assert_eq!(opts.buffer_size, 4096);
        assert_eq!(opts.progress_interval, 1024);
    }

    #[test]
    fn overrides_keep_unset_fields() {
        let args = Args::try_parse_from(["bytesink", "--buffer-size", "16", "a", "b"]).unwrap();
        let base = TransferOptions::default().with_progress_interval(77);
        let opts = args.apply_overrides(base);
        assert_eq!(opts.buffer_size, 16);
        assert_eq!(opts.progress_interval, 77);
    }

    #[test]
    fn requires_destination() {
        assert!(Args::try_parse_from(["bytesink", "-"]).is_err());
    }
}
