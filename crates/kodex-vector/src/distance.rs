use std::cmp::Ordering;

/// Squared Euclidean distance.
#[must_use]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Order by distance, ties by position.
pub(crate) fn by_distance(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Brute-force `k` nearest rows of a row-major matrix.
pub(crate) fn exact_search(
    data: &[f32],
    dimension: usize,
    query: &[f32],
    k: usize,
) -> Vec<(usize, f32)> {
    if dimension == 0 || k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(usize, f32)> = data
        .chunks_exact(dimension)
        .enumerate()
        .map(|(i, row)| (i, l2_squared(query, row)))
        .collect();
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, by_distance);
        scored.truncate(k);
    }
    scored.sort_by(by_distance);
    scored
}
