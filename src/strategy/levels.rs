//! Stop-loss and take-profit levels.

use tracing::debug;

use crate::types::BarSeries;

/// Bars needed to anchor the stop on the third-most-recent low.
pub const MIN_BARS_FOR_STOP: usize = 3;

/// Lower of the third-most-recent low and `cap_ratio × last close`.
///
/// Returns `None` when the series has fewer than three bars.
pub fn stop_loss_with_cap(series: &BarSeries, cap_ratio: f64) -> Option<f64> {
    if series.len() < MIN_BARS_FOR_STOP {
        debug!(symbol = %series.symbol, bars = series.len(), "Not enough data to calculate stop loss");
        return None;
    }
    let anchor_low = series.nth_from_end(MIN_BARS_FOR_STOP)?.low;
    let max_stop = series.last_close()? * cap_ratio;
    Some(anchor_low.min(max_stop))
}

pub fn take_profit_with_ratio(entry: f64, ratio: f64) -> f64 {
    entry * ratio
}
