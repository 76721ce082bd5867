//! Simple Moving Average (SMA) over a close series.
//!
//! Output is aligned with the input: `None` until the window fills, and
//! `None` for any window containing an absent close.

pub fn moving_average(closes: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut result = vec![None; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut missing = 0usize;
    for (i, close) in closes.iter().enumerate() {
        match close {
            Some(v) => sum += v,
            None => missing += 1,
        }
        if i >= window {
            match closes[i - window] {
                Some(v) => sum -= v,
                None => missing -= 1,
            }
        }
        if i + 1 >= window && missing == 0 {
            result[i] = Some(sum / window as f64);
        }
    }
    result
}

/// Most recent SMA value, if the series is long enough.
pub fn latest_moving_average(closes: &[Option<f64>], window: usize) -> Option<f64> {
    moving_average(closes, window).last().copied().flatten()
}
