//! Byte progress reporting for downloads.
//!
//! Fetchers only report byte counts; how (or whether) progress is displayed
//! is up to the [`ProgressMeter`] the caller passes in.

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress updates for one transfer at a time.
pub trait ProgressMeter {
    /// A transfer of `size` bytes (if known) described by `text` begins.
    fn start(&mut self, size: Option<u64>, text: &str);

    /// `amount` bytes of the current transfer have been read so far.
    fn update(&mut self, amount: u64);

    /// The current transfer finished after `amount` bytes.
    fn end(&mut self, amount: u64);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMeter;

impl ProgressMeter for NullMeter {
    fn start(&mut self, _size: Option<u64>, _text: &str) {}
    fn update(&mut self, _amount: u64) {}
    fn end(&mut self, _amount: u64) {}
}

/// Terminal progress bar backed by `indicatif`.
#[derive(Default)]
pub struct BarMeter {
    bar: Option<ProgressBar>,
}

impl BarMeter {
    pub fn new() -> Self {
        Self::default()
    }

    fn style(sized: bool) -> ProgressStyle {
        let template = if sized {
            "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
             {bytes}/{total_bytes} ({bytes_per_sec}, {eta})"
        } else {
            "{msg} {spinner:.green} {bytes} ({bytes_per_sec})"
        };
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl ProgressMeter for BarMeter {
    fn start(&mut self, size: Option<u64>, text: &str) {
        let bar = match size {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        bar.set_style(Self::style(size.is_some()));
        bar.set_message(text.to_string());
        self.bar = Some(bar);
    }

    fn update(&mut self, amount: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(amount);
        }
    }

    fn end(&mut self, amount: u64) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(amount);
            bar.finish();
        }
    }
}
