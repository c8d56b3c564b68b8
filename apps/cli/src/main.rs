mod args;

use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bytesink_transfer::{
    ProgressEvent, TransferError, TransferOptions, TransferSummary, cancel_after, write_to_file,
};

use args::Args;

/// Exit status for a transfer stopped by Ctrl-C or `--timeout`.
const EXIT_CANCELLED: u8 = 130;

type Source = Box<dyn AsyncRead + Send + Unpin>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bytesink=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!("failed to encode summary: {e}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let cancelled = e
                .downcast_ref::<TransferError>()
                .is_some_and(TransferError::is_cancelled);
            tracing::error!("{e:#}");
            if cancelled {
                ExitCode::from(EXIT_CANCELLED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Args) -> anyhow::Result<TransferSummary> {
    let base = match &args.config {
        Some(path) => TransferOptions::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TransferOptions::default(),
    };
    let options = args.apply_overrides(base);
    options.validate()?;

    let (source, source_len) = open_source(&args, options.buffer_size).await?;
    let expected_total = args.expected_size.or(source_len);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling transfer");
            interrupt.cancel();
        }
    });

    let deadline = args.timeout().map(|t| cancel_after(&cancel, t));
    let token = deadline.as_ref().map_or(&cancel, |d| d.token());

    let summary = write_to_file(
        source,
        &args.destination,
        args.append,
        expected_total,
        token,
        log_progress,
        options,
    )
    .await?;

    Ok(summary)
}

/// Opens the source stream and reports its length when it is a regular file.
async fn open_source(args: &Args, buffer_size: usize) -> anyhow::Result<(Source, Option<u64>)> {
    if args.reads_stdin() {
        return Ok((detached_reader(io::stdin(), buffer_size), None));
    }

    let file = tokio::fs::File::open(&args.source)
        .await
        .with_context(|| format!("opening source {}", args.source))?;
    let meta = file.metadata().await?;
    let len = meta.is_file().then_some(meta.len());
    Ok((Box::new(file), len))
}

/// Reads `reader` on a detached thread and exposes it as an async source.
///
/// `tokio::io::stdin` reads on the blocking pool, and a read parked on an
/// idle terminal keeps the runtime from shutting down after cancellation.
/// A detached thread does not: it is torn down when the process exits.
fn detached_reader<R>(mut reader: R, buffer_size: usize) -> Source
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(4);
    std::thread::spawn(move || {
        let mut buf = vec![0u8; buffer_size];
        loop {
            let chunk = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = chunk.is_err();
            if tx.blocking_send(chunk).is_err() || failed {
                break;
            }
        }
    });

    let chunks = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    Box::new(StreamReader::new(Box::pin(chunks)))
}

fn log_progress(event: ProgressEvent) {
    match event.percentage() {
        Some(pct) => tracing::info!(
            transferred = event.transferred,
            total = event.total,
            "{pct:.1}% {}",
            event.target
        ),
        None => tracing::info!(transferred = event.transferred, "{}", event.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_source_reports_length() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.bin");
        std::fs::write(&src, b"12345").unwrap();
        let dst = dir.path().join("out.bin");

        let args = Args::try_parse_from([
            "bytesink",
            src.to_str().unwrap(),
            dst.to_str().unwrap(),
        ])
        .unwrap();
        let (_, len) = open_source(&args, 1024).await.unwrap();
        assert_eq!(len, Some(5));
    }

    #[tokio::test]
    async fn detached_reader_yields_all_bytes() {
        use tokio::io::AsyncReadExt;

        let input: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut source = detached_reader(io::Cursor::new(input.clone()), 512);

        let mut out = Vec::new();
        source.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn detached_reader_surfaces_read_errors() {
        use tokio::io::AsyncReadExt;

        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }

        let mut source = detached_reader(Broken, 64);
        let mut out = Vec::new();
        let err = source.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    // A reader that never returns must not keep the caller waiting once
    // the transfer is cancelled.
    #[tokio::test]
    async fn cancelled_transfer_returns_while_reader_is_parked() {
        struct Parked;
        impl Read for Parked {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                loop {
                    std::thread::park();
                }
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let deadline = cancel_after(&cancel, std::time::Duration::from_millis(50));

        let err = write_to_file(
            detached_reader(Parked, 64),
            &dir.path().join("out.bin"),
            false,
            None,
            deadline.token(),
            bytesink_transfer::NoProgress,
            TransferOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn run_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.bin");
        std::fs::write(&src, vec![9u8; 20_000]).unwrap();
        let dst = dir.path().join("sub/out.bin");

        let args = Args::try_parse_from([
            "bytesink",
            "--buffer-size",
            "1024",
            src.to_str().unwrap(),
            dst.to_str().unwrap(),
        ])
        .unwrap();
        let summary = run(args).await.unwrap();

        assert_eq!(summary.bytes_written, 20_000);
        assert_eq!(std::fs::read(&dst).unwrap(), vec![9u8; 20_000]);
    }

    #[tokio::test]
    async fn run_rejects_wrong_expected_size() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.bin");
        std::fs::write(&src, b"abc").unwrap();
        let dst = dir.path().join("out.bin");

        let args = Args::try_parse_from([
            "bytesink",
            "--expected-size",
            "10",
            src.to_str().unwrap(),
            dst.to_str().unwrap(),
        ])
        .unwrap();
        let err = run(args).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::SizeMismatch {
                written: 3,
                expected: 10
            })
        ));
    }

    #[tokio::test]
    async fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "bytesink",
            dir.path().join("absent").to_str().unwrap(),
            dir.path().join("out").to_str().unwrap(),
        ])
        .unwrap();
        assert!(run(args).await.is_err());
    }
}
