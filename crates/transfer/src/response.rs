//! Response body wrapper with a write-to-file helper.

use std::io;
use std::path::Path;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use bytesink_protocol::TransferSummary;

use crate::progress::{ProgressCallback, ProgressCallbacks};
use crate::{TransferError, TransferOptions, engine};

type Body = Box<dyn AsyncRead + Send + Unpin>;

/// A streamed response body plus the metadata needed to persist it.
///
/// `content_length` is the expected total used for size validation; `None`
/// disables the check.
pub struct StreamedResponse {
    key: String,
    body: Body,
    content_length: Option<u64>,
    callbacks: ProgressCallbacks,
    options: TransferOptions,
}

impl StreamedResponse {
    pub fn new<R>(key: impl Into<String>, body: R, content_length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            key: key.into(),
            body: Box::new(body),
            content_length,
            callbacks: ProgressCallbacks::new(),
            options: TransferOptions::default(),
        }
    }

    /// Wraps a chunk stream, the body shape HTTP clients expose.
    pub fn from_stream<St, E>(key: impl Into<String>, stream: St, content_length: Option<u64>) -> Self
    where
        St: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let reader = StreamReader::new(stream.map_err(io::Error::other));
        Self::new(key, reader, content_length)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a progress callback.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.callbacks.push(callback);
    }

    /// Writes the body to `path`, appending if `append` is set and the file
    /// exists.
    pub async fn write_to_file(
        self,
        path: &Path,
        append: bool,
        cancel: &CancellationToken,
    ) -> Result<TransferSummary, TransferError> {
        engine::write_to_file(
            self.body,
            path,
            append,
            self.content_length,
            cancel,
            self.callbacks,
            self.options,
        )
        .await
    }

    /// Writes the body to an arbitrary destination stream.
    ///
    /// Progress events carry the response key as their target.
    pub async fn write_to<D>(self, destination: D, cancel: &CancellationToken) -> Result<u64, TransferError>
    where
        D: AsyncWrite + Unpin,
    {
        engine::transfer(
            &self.key,
            self.body,
            destination,
            self.content_length,
            cancel,
            self.callbacks,
            self.options,
        )
        .await
    }
}

impl std::fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("key", &self.key)
            .field("content_length", &self.content_length)
            .field("callbacks", &self.callbacks)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
