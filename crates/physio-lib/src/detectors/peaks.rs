use crate::signal::Events;

/// Adaptive detection threshold for one window: `mean + k * stddev`.
///
/// Uses the population standard deviation. An empty window yields 0.
pub fn adaptive_threshold(window: &[f64], k: f64) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let var = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    mean + k * var.sqrt()
}

/// Find local maxima above `threshold` separated by at least `min_distance_s`.
///
/// A candidate needs a strict rise into it and a non-strict fall after it, so
/// the leading edge of a flat top counts as the peak. A candidate that lands
/// inside the refractory zone of the last accepted peak replaces it only when
/// strictly taller; accepted peaks are never closer than the refractory
/// distance.
pub fn detect_peaks(
    signal: &[f64],
    sample_rate: f64,
    min_distance_s: f64,
    threshold: f64,
) -> Events {
    if signal.len() < 3 {
        return Events::default();
    }
    let min_distance = (min_distance_s * sample_rate).round().max(1.0) as usize;

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..signal.len() - 1 {
        let x = signal[i];
        if x <= threshold || !(signal[i - 1] < x && x >= signal[i + 1]) {
            continue;
        }
        match peaks.last_mut() {
            None => peaks.push(i),
            Some(last) if i - *last >= min_distance => peaks.push(i),
            Some(last) => {
                if x > signal[*last] {
                    *last = i;
                }
            }
        }
    }
    Events::from_indices(peaks)
}
