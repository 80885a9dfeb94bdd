/// Median-of-three noise filter.
///
/// Sorts the samples, then averages the median with its two neighbours when
/// there are more than three samples, or takes the middle sample otherwise.
/// The result is truncated toward zero; no samples yield 0.
pub fn signal_filter(samples: &mut [i64]) -> i64 {
    samples.sort_unstable();

    let n = samples.len();
    match n {
        0 => 0,
        1..=3 => samples[n / 2],
        _ => {
            let mid = n / 2;
            (samples[mid - 1] + samples[mid] + samples[mid + 1]) / 3
        }
    }
}
