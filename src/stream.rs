//! Deferred transform stream
//!
//! Syntax trees need the whole file, so the stream buffers every byte of
//! the source and only runs the transformer once the input is closed. The
//! transformed output is released as a single unit.

use crate::engine::SourceTransformer;
use crate::error::{WeftError, WeftResult};
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use tracing::debug;

/// Result of feeding the filter
#[derive(Debug, PartialEq, Eq)]
pub enum Filtered {
    /// Input is still open; nothing to emit yet
    NeedMore,
    /// Input closed; the complete transformed source
    Complete(Vec<u8>),
}

/// Buffering filter that transforms exactly once, at end of input
pub struct DeferredTransform {
    transformer: Arc<dyn SourceTransformer>,
    buffer: Vec<u8>,
    finished: bool,
}

impl DeferredTransform {
    pub fn new(transformer: Arc<dyn SourceTransformer>) -> Self {
        Self {
            transformer,
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Feed a chunk of source; `closing` marks the end of input
    pub fn filter(&mut self, chunk: &[u8], closing: bool) -> WeftResult<Filtered> {
        if self.finished {
            return Err(WeftError::Internal(
                "deferred transform already completed".to_string(),
            ));
        }

        self.buffer.extend_from_slice(chunk);
        if !closing {
            return Ok(Filtered::NeedMore);
        }

        self.finished = true;
        let source = std::str::from_utf8(&self.buffer)
            .map_err(|e| WeftError::syntax(format!("source is not valid UTF-8: {}", e)))?;
        let output = self.transformer.transform(source)?;
        debug!(
            "Transformed {} bytes into {} bytes",
            self.buffer.len(),
            output.len()
        );
        Ok(Filtered::Complete(output.into_bytes()))
    }

    /// Bytes consumed so far
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }
}

/// Called with `(input, output)` once a transform has completed
pub type CompletionHook = Box<dyn FnOnce(&[u8], &[u8]) + Send>;

const CHUNK_SIZE: usize = 8 * 1024;

/// `Read` adapter serving the transformed contents of `inner`
///
/// The first read drains `inner` completely. Transformation failures come
/// out as `io::Error` wrapping a [`WeftError`]; see
/// [`WeftError::from_read_error`]. Once a read has failed, every later read
/// fails too.
pub struct DeferredTransformReader<R> {
    inner: Option<R>,
    filter: DeferredTransform,
    output: Cursor<Vec<u8>>,
    on_complete: Option<CompletionHook>,
    failed: Option<(io::ErrorKind, String)>,
}

impl<R: Read> DeferredTransformReader<R> {
    pub fn new(inner: R, transformer: Arc<dyn SourceTransformer>) -> Self {
        Self {
            inner: Some(inner),
            filter: DeferredTransform::new(transformer),
            output: Cursor::new(Vec::new()),
            on_complete: None,
            failed: None,
        }
    }

    /// Run `hook` after the transform has succeeded
    pub fn on_complete(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    fn drain(&mut self, mut inner: R) -> io::Result<()> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let closing = n == 0;
            match self.filter.filter(&chunk[..n], closing).map_err(io::Error::other)? {
                Filtered::NeedMore => continue,
                Filtered::Complete(output) => {
                    if let Some(hook) = self.on_complete.take() {
                        hook(self.filter.buffered(), &output);
                    }
                    self.output = Cursor::new(output);
                    return Ok(());
                }
            }
        }
    }
}

impl<R: Read> Read for DeferredTransformReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some((kind, message)) = &self.failed {
            return Err(io::Error::new(
                *kind,
                format!("deferred transform failed earlier: {}", message),
            ));
        }
        if let Some(inner) = self.inner.take() {
            if let Err(e) = self.drain(inner) {
                self.failed = Some((e.kind(), e.to_string()));
                return Err(e);
            }
        }
        self.output.read(buf)
    }
}
