//! Display-color assignment from a fixed rotating palette.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The fixed rotation of member display colors.
pub const USER_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

/// Process-wide palette cursor. The starting index is injected so tests can
/// assert exact color sequences.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    next: Arc<AtomicUsize>,
}

impl ColorPalette {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    #[must_use]
    pub fn starting_at(index: usize) -> Self {
        Self { next: Arc::new(AtomicUsize::new(index)) }
    }

    /// Hand out the next color, wrapping around the palette.
    pub fn assign(&self) -> &'static str {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        USER_COLORS[index % USER_COLORS.len()]
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}
