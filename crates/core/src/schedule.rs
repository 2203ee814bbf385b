use serde::Serialize;

/// Progress report emitted at chunk boundaries of a long pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub percent: f64,
}

impl Progress {
    pub fn new(processed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (processed as f64 / total as f64) * 100.0
        };
        Self { processed, total, percent }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Cooperative suspension point.
///
/// Long passes call this between chunks so the executor can run other tasks
/// (UI event handling, a progress repaint). A chunk never yields midway.
pub async fn yield_point() {
    smol::future::yield_now().await;
}

/// Rows (or pairs) processed between two yield points for a pass of `total` items.
///
/// Small inputs run in one go; large inputs get larger chunks so the number of
/// yield cycles stays bounded.
pub fn adaptive_chunk_size(total: usize) -> usize {
    match total {
        0..=999 => total.max(1),
        1_000..=9_999 => 500,
        10_000..=99_999 => 1_000,
        _ => 2_500,
    }
}
