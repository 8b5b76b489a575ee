//! Price-series indicators used by the signal, trend and execution agents

use common::Regime;

/// Floor for the average loss so a loss-free window does not divide by zero
const MIN_AVG_LOSS: f64 = 1e-9;

/// Relative strength index over the last `period` changes.
///
/// Returns the neutral 50.0 when the series has fewer than `period + 1` points.
pub fn rsi(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period + 1 {
        return 50.0;
    }

    let (gains, losses) = values[values.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), delta: f64| {
            (g + delta.max(0.0), l + (-delta).max(0.0))
        });

    let avg_gain = gains / period as f64;
    let avg_loss = if losses > 0.0 {
        losses / period as f64
    } else {
        MIN_AVG_LOSS
    };
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Simple moving average of the last `period` values, or of the whole
/// series when it is shorter. Empty input gives 0.0.
pub fn sma(values: &[f64], period: usize) -> f64 {
    let window = if period == 0 || values.len() < period {
        values
    } else {
        &values[values.len() - period..]
    };
    window.iter().sum::<f64>() / window.len().max(1) as f64
}

/// Change of the last value against the one `lookback` steps earlier
pub fn momentum(values: &[f64], lookback: usize) -> f64 {
    if values.len() < lookback + 1 {
        return 0.0;
    }
    values[values.len() - 1] - values[values.len() - 1 - lookback]
}

/// Direction of the last `window` values by counting up and down moves.
///
/// `None` when the series has fewer than `window + 1` points.
pub fn regime(values: &[f64], window: usize) -> Option<Regime> {
    if values.len() < window + 1 {
        return None;
    }

    let net: i32 = values[values.len() - window..]
        .windows(2)
        .map(|w| {
            let d = w[1] - w[0];
            if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            }
        })
        .sum();

    Some(if net >= 2 {
        Regime::Up
    } else if net <= -2 {
        Regime::Down
    } else {
        Regime::Sideways
    })
}

/// Blend of RSI and moving-average slope, clamped to [-1, 1]
pub fn composite_score(rsi: f64, sma_fast: f64, sma_slow: f64, last_close: f64) -> f64 {
    let rsi_norm = (rsi - 50.0) / 50.0;
    let slope_norm = ((sma_fast - sma_slow) / last_close.max(1e-9)).clamp(-1.0, 1.0);
    (0.7 * rsi_norm + 0.3 * slope_norm).clamp(-1.0, 1.0)
}
