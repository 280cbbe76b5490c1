//! Upload progress display for file-backed parts

use crate::logging::{Logger, format_size};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, ReadBuf};

const LINE_WIDTH: usize = 80;
const SIZE_COLUMN_WIDTH: usize = 18;
const MIN_BAR_WIDTH: usize = 10;

/// Async reader that counts bytes as they are read and redraws a progress
/// line at most once per `interval`, plus once more at end of stream.
pub struct ProgressReader<R> {
    inner: R,
    label: String,
    total: Option<u64>,
    transferred: u64,
    interval: Duration,
    last_draw: Option<Instant>,
    finished: bool,
    logger: Logger,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, label: impl Into<String>, total: Option<u64>, logger: Logger) -> Self {
        Self {
            inner,
            label: label.into(),
            total,
            transferred: 0,
            interval: Duration::from_secs(1),
            last_draw: None,
            finished: false,
            logger,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    fn record(&mut self, read: usize) {
        if read == 0 {
            if !self.finished {
                self.finished = true;
                self.draw(true);
            }
            return;
        }

        self.transferred += read as u64;
        let due = self
            .last_draw
            .is_none_or(|last| last.elapsed() >= self.interval);
        if due {
            self.draw(false);
        }
    }

    fn draw(&mut self, finished: bool) {
        self.last_draw = Some(Instant::now());
        self.logger.live_line(
            &render_line(&self.label, self.transferred, self.total),
            finished,
        );
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            this.record(read);
        }
        poll
    }
}

/// One progress line, e.g. `Uploading ACI: [=====     ] 1.0 MB / 2.0 MB`.
pub fn render_line(label: &str, transferred: u64, total: Option<u64>) -> String {
    let prefix = if label.is_empty() {
        "Uploading".to_string()
    } else {
        format!("Uploading {}", label)
    };

    let Some(total) = total else {
        return format!(
            "{}: {} of an unknown total size",
            prefix,
            format_size(transferred)
        );
    };

    let width = LINE_WIDTH
        .saturating_sub(prefix.len() + SIZE_COLUMN_WIDTH)
        .max(MIN_BAR_WIDTH);
    let filled = if total == 0 {
        width
    } else {
        ((transferred.min(total) as u128 * width as u128) / total as u128) as usize
    };

    format!(
        "{}: [{}{}] {} / {}",
        prefix,
        "=".repeat(filled),
        " ".repeat(width - filled),
        format_size(transferred),
        format_size(total)
    )
}
