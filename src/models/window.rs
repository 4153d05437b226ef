//! Ordered bar windows used as indicator input.
//!
//! A [`Window`] is always oldest-to-newest with unique timestamps, whatever order the
//! source delivered. Batch stores hand back newest-first rows and streams append
//! chronologically, so every construction path goes through [`Window::from_bars`].

use super::bar::Bar;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Window {
    bars: Vec<Bar>,
}

impl Window {
    pub fn new() -> Self {
        Self { bars: Vec::new() }
    }

    /// Build a window from bars in any order. Duplicate timestamps keep the last occurrence.
    pub fn from_bars(bars: impl IntoIterator<Item = Bar>) -> Self {
        let mut bars: Vec<Bar> = bars.into_iter().collect();
        // stable sort keeps arrival order between equal timestamps
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Self { bars: deduped }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// The newest `n` bars as a window (or the whole window when shorter).
    pub fn tail(&self, n: usize) -> Window {
        let start = self.bars.len().saturating_sub(n);
        Window {
            bars: self.bars[start..].to_vec(),
        }
    }

    /// Latest low is below every prior low.
    pub fn has_lower_low(&self) -> bool {
        self.compare_latest(|b| b.low, |latest, prior| latest < prior.iter().cloned().fold(f64::INFINITY, f64::min))
    }

    /// Latest high is above every prior high.
    pub fn has_higher_high(&self) -> bool {
        self.compare_latest(|b| b.high, |latest, prior| latest > prior.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
    }

    fn compare_latest<F, C>(&self, field: F, cmp: C) -> bool
    where
        F: Fn(&Bar) -> f64,
        C: Fn(f64, &[f64]) -> bool,
    {
        let Some((latest, prior)) = self.bars.split_last() else {
            return false;
        };
        if prior.is_empty() {
            return false;
        }
        let prior: Vec<f64> = prior.iter().map(&field).collect();
        cmp(field(latest), &prior)
    }

    pub(crate) fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    pub(crate) fn replace_latest(&mut self, bar: Bar) {
        if let Some(last) = self.bars.last_mut() {
            *last = bar;
        }
    }

    pub(crate) fn evict_front(&mut self, count: usize) -> usize {
        let count = count.min(self.bars.len());
        self.bars.drain(..count);
        count
    }
}

/// Outcome of applying a streamed bar to a [`SlidingWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// New period appended; `evicted` oldest bars were dropped to hold capacity.
    Appended { evicted: usize },
    /// Same period as the most recent bar; replaced in place.
    Replaced,
    /// Older than the most recent bar; ignored.
    Stale,
}

impl WindowUpdate {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, WindowUpdate::Stale)
    }
}

/// Fixed-capacity FIFO window fed by a live stream.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    window: Window,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            window: Window::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Replace the contents with `bars`, keeping only the newest `capacity` periods.
    pub fn seed(&mut self, bars: impl IntoIterator<Item = Bar>) -> usize {
        let mut window = Window::from_bars(bars);
        let excess = window.len().saturating_sub(self.capacity);
        window.evict_front(excess);
        self.window = window;
        excess
    }

    pub fn clear(&mut self) {
        self.window = Window::new();
    }

    pub fn apply(&mut self, bar: Bar) -> WindowUpdate {
        let latest = self.window.latest().map(|b| b.timestamp);
        match latest {
            Some(ts) if bar.timestamp < ts => WindowUpdate::Stale,
            Some(ts) if bar.timestamp == ts => {
                self.window.replace_latest(bar);
                WindowUpdate::Replaced
            }
            _ => {
                self.window.push(bar);
                let excess = self.window.len().saturating_sub(self.capacity);
                let evicted = self.window.evict_front(excess);
                WindowUpdate::Appended { evicted }
            }
        }
    }
}
