//! Pull-driven stream duplicator.
//!
//! [`TeeReader`] wraps one reader and any number of writers. Whatever the
//! consumer pulls through it has already been written to every sink, so a
//! remote upload that reads the stream leaves a complete local copy behind
//! without the body ever being buffered in full. A failing sink turns into a
//! read error, which halts the consumer.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

const CHUNK_SIZE: usize = 64 * 1024;

/// Boxed sink accepted by [`TeeReader`].
pub type TeeSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Shared view of a tee's progress, readable after the reader itself has
/// been moved into a consumer.
#[derive(Debug, Clone, Default)]
pub struct TeeProgress {
    bytes: Arc<AtomicU64>,
    complete: Arc<AtomicBool>,
}

impl TeeProgress {
    /// Bytes read from the source and written to every sink so far.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Whether the source hit EOF and every sink was flushed.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    Writing,
    Delivering,
    Flushing,
    Done,
    Failed,
}

pub struct TeeReader<R> {
    inner: R,
    sinks: Vec<TeeSink>,
    written: Vec<usize>,
    chunk: Box<[u8]>,
    filled: usize,
    delivered: usize,
    state: State,
    progress: TeeProgress,
}

impl<R> TeeReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(inner: R, sinks: Vec<TeeSink>) -> Self {
        let written = vec![0; sinks.len()];
        Self {
            inner,
            sinks,
            written,
            chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            filled: 0,
            delivered: 0,
            state: State::Reading,
            progress: TeeProgress::default(),
        }
    }

    pub fn progress(&self) -> TeeProgress {
        self.progress.clone()
    }

    /// Push the current chunk into every sink, resuming where each one left off.
    fn poll_write_sinks(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        for (idx, sink) in self.sinks.iter_mut().enumerate() {
            while self.written[idx] < self.filled {
                let pending = &self.chunk[self.written[idx]..self.filled];
                match Pin::new(&mut **sink).poll_write(cx, pending) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(0)) => {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("tee sink {} accepted no bytes", idx),
                        )))
                    }
                    Poll::Ready(Ok(n)) => self.written[idx] += n,
                    Poll::Ready(Err(e)) => {
                        return Poll::Ready(Err(io::Error::new(
                            e.kind(),
                            format!("tee sink {} failed: {}", idx, e),
                        )))
                    }
                }
            }
        }
        Poll::Ready(Ok(()))
    }

    fn poll_flush_sinks(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        for (idx, sink) in self.sinks.iter_mut().enumerate() {
            match Pin::new(&mut **sink).poll_flush(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => {
                    return Poll::Ready(Err(io::Error::new(
                        e.kind(),
                        format!("tee sink {} failed to flush: {}", idx, e),
                    )))
                }
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl<R> AsyncRead for TeeReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match this.state {
                State::Failed => {
                    return Poll::Ready(Err(io::Error::other("tee stopped after an earlier failure")))
                }
                State::Done => return Poll::Ready(Ok(())),
                State::Reading => {
                    let mut read_buf = ReadBuf::new(&mut this.chunk);
                    match Pin::new(&mut this.inner).poll_read(cx, &mut read_buf) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => {
                            this.state = State::Failed;
                            return Poll::Ready(Err(e));
                        }
                        Poll::Ready(Ok(())) => {}
                    }
                    let n = read_buf.filled().len();
                    if n == 0 {
                        this.state = State::Flushing;
                        continue;
                    }
                    this.filled = n;
                    this.delivered = 0;
                    this.written.iter_mut().for_each(|w| *w = 0);
                    this.state = State::Writing;
                }
                State::Writing => match this.poll_write_sinks(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => {
                        this.state = State::Failed;
                        return Poll::Ready(Err(e));
                    }
                    Poll::Ready(Ok(())) => {
                        this.progress
                            .bytes
                            .fetch_add(this.filled as u64, Ordering::AcqRel);
                        this.state = State::Delivering;
                    }
                },
                State::Delivering => {
                    let n = buf.remaining().min(this.filled - this.delivered);
                    buf.put_slice(&this.chunk[this.delivered..this.delivered + n]);
                    this.delivered += n;
                    if this.delivered == this.filled {
                        this.state = State::Reading;
                    }
                    return Poll::Ready(Ok(()));
                }
                State::Flushing => match this.poll_flush_sinks(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => {
                        this.state = State::Failed;
                        return Poll::Ready(Err(e));
                    }
                    Poll::Ready(Ok(())) => {
                        this.progress.complete.store(true, Ordering::Release);
                        this.state = State::Done;
                        return Poll::Ready(Ok(()));
                    }
                },
            }
        }
    }
}
