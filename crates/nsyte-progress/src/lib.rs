//! Terminal progress rendering for nsyte pipeline runs.
//!
//! Built on `atty` + `indicatif`. It is the only consumer of
//! [`nsyte_collector::Collector`]'s pull-based snapshot API: it never
//! receives pushed events, it polls on a tick and renders whatever has
//! accumulated since the last poll.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nsyte_collector::{Category, Collector, MessageKind};

/// Tick interval used by `nsyte-cli` when driving [`TerminalRenderer::tick`]
/// from a background thread.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Whether stderr looks like an interactive terminal. When it doesn't
/// (piped output, CI), [`TerminalRenderer`] degrades to plain line
/// output so redirected logs stay readable.
pub fn stderr_is_terminal() -> bool {
    atty::is(atty::Stream::Stderr)
}

/// Renders a [`Collector`]'s accumulating snapshot as a live progress bar
/// plus a scrolling log of warnings/errors, or as plain lines when stderr
/// isn't a terminal.
pub struct TerminalRenderer {
    bar: Option<ProgressBar>,
    _multi: Option<MultiProgress>,
    last_rendered_len: AtomicU64,
    interactive: bool,
}

impl TerminalRenderer {
    /// Build a renderer for a run expected to produce `total` files.
    /// `total` may be zero (unknown ahead of time); the bar then runs in
    /// spinner mode.
    pub fn new(total: u64) -> Self {
        let interactive = stderr_is_terminal();

        if !interactive {
            return Self { bar: None, _multi: None, last_rendered_len: AtomicU64::new(0), interactive };
        }

        let multi = MultiProgress::new();
        let bar = if total > 0 {
            let bar = multi.add(ProgressBar::new(total));
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            bar
        } else {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };

        Self {
            bar: Some(bar),
            _multi: Some(multi),
            last_rendered_len: AtomicU64::new(0),
            interactive,
        }
    }

    /// Pull the collector's current snapshot and render any messages
    /// added since the last tick, then update the bar's position from
    /// the count of file-category messages.
    pub fn tick(&self, collector: &Collector) {
        let snapshot = collector.snapshot();
        let already_rendered = self.last_rendered_len.load(Ordering::Relaxed) as usize;

        for message in snapshot.iter().skip(already_rendered) {
            self.emit_line(message);
        }
        self.last_rendered_len.store(snapshot.len() as u64, Ordering::Relaxed);

        if let Some(bar) = &self.bar {
            let counts = collector.counts_by_category();
            let files = counts.get(&Category::File).copied().unwrap_or(0);
            bar.set_position(files as u64);
        }
    }

    fn emit_line(&self, message: &nsyte_collector::Message) {
        let text = if message.occurrences > 1 {
            format!("{} (x{})", message.content, message.occurrences)
        } else {
            message.content.clone()
        };

        match (&self.bar, message.kind) {
            (Some(bar), MessageKind::Error) => bar.println(format!("error: {}: {text}", message.target)),
            (Some(bar), MessageKind::Warn) => bar.println(format!("warn: {}: {text}", message.target)),
            (Some(bar), MessageKind::Info) => bar.set_message(text),
            (None, MessageKind::Error) => eprintln!("error: {}: {text}", message.target),
            (None, MessageKind::Warn) => eprintln!("warn: {}: {text}", message.target),
            (None, MessageKind::Info) => eprintln!("info: {}: {text}", message.target),
        }
    }

    /// Finalize the bar (if any) with a closing message.
    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        } else if self.interactive {
            eprintln!("{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_only_renders_new_messages_once() {
        let collector = Collector::new();
        let renderer = TerminalRenderer::new(0);

        collector.info(Category::File, "/a.txt", "uploaded");
        renderer.tick(&collector);
        assert_eq!(renderer.last_rendered_len.load(Ordering::Relaxed), 1);

        renderer.tick(&collector);
        assert_eq!(renderer.last_rendered_len.load(Ordering::Relaxed), 1);

        collector.info(Category::File, "/b.txt", "uploaded");
        renderer.tick(&collector);
        assert_eq!(renderer.last_rendered_len.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn new_with_zero_total_still_builds_a_renderer() {
        let renderer = TerminalRenderer::new(0);
        let collector = Collector::new();
        renderer.tick(&collector);
    }
}
