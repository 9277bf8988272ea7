//! Rolling-window indicator math over bar closes.
//!
//! Simple moving average and the rolling-mean RSI variant. Stateless pure
//! functions; `None` until the window has filled.

use rust_decimal::Decimal;

/// Simple moving average over `window` values.
pub fn sma(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let divisor = Decimal::from(window as u64);
    let mut out = Vec::with_capacity(values.len());
    let mut running = Decimal::ZERO;

    for (i, value) in values.iter().enumerate() {
        running += value;
        if i >= window {
            running -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(running / divisor));
        } else {
            out.push(None);
        }
    }
    out
}

/// Relative strength index over `window` deltas, rolling-mean gains/losses:
/// `100 - 100 / (1 + avg_gain / avg_loss)`. A window with gains and no
/// losses saturates at 100, no gains at 0; a flat window (no movement at
/// all) has no value.
pub fn rsi(values: &[Decimal], window: usize) -> Vec<Option<Decimal>> {
    let hundred = Decimal::from(100u64);
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() <= window {
        return out;
    }

    let mut gains = Vec::with_capacity(values.len() - 1);
    let mut losses = Vec::with_capacity(values.len() - 1);
    for pair in values.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > Decimal::ZERO {
            gains.push(delta);
            losses.push(Decimal::ZERO);
        } else {
            gains.push(Decimal::ZERO);
            losses.push(-delta);
        }
    }

    let avg_gains = sma(&gains, window);
    let avg_losses = sma(&losses, window);

    for i in window..values.len() {
        // Delta index i-1 corresponds to value index i.
        let (Some(gain), Some(loss)) = (avg_gains[i - 1], avg_losses[i - 1]) else {
            continue;
        };
        if loss.is_zero() {
            // A window with no movement has no relative strength.
            if gain.is_zero() {
                continue;
            }
            out[i] = Some(hundred);
        } else {
            out[i] = Some(hundred - hundred / (Decimal::ONE + gain / loss));
        }
    }
    out
}
