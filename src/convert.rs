/// Convert the selected band values from linear scale to decibels,
/// in place: `v -> 10 * log10(v)`.
///
/// Indices are 0-based positions into the band vector and must be
/// validated by the caller. Non-positive inputs produce NaN or -inf under
/// IEEE semantics and are left to downstream cleanup, matching how the
/// sentinel values flow through the rest of the pipeline.
pub fn to_decibel(values: &mut [f64], indices: &[usize]) {
    for &i in indices {
        values[i] = 10.0 * values[i].log10();
    }
}
