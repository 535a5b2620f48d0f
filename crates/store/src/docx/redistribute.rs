//! Proportional redistribution of paragraph text over its original text
//! nodes

/// Split `text` into `weights.len()` segments whose lengths follow the
/// weights (original node lengths, in chars).
///
/// Boundaries are cumulative floors, `floor(new_len * cum_i / total)`, and
/// the last segment takes the remainder, so the segments always concatenate
/// back to `text` and each length stays within one char of its exact share.
/// With a zero total everything lands in the first segment.
pub fn redistribute(text: &str, weights: &[usize]) -> Vec<String> {
    if weights.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let new_len = chars.len();
    let total: usize = weights.iter().sum();

    let mut boundaries = Vec::with_capacity(weights.len() + 1);
    boundaries.push(0usize);
    if total == 0 {
        boundaries.extend(std::iter::repeat(new_len).take(weights.len()));
    } else {
        let mut cumulative = 0usize;
        for (i, weight) in weights.iter().enumerate() {
            cumulative += weight;
            let boundary = if i + 1 == weights.len() {
                new_len
            } else {
                // u128 keeps new_len * cumulative exact for any realistic input
                ((new_len as u128 * cumulative as u128) / total as u128) as usize
            };
            boundaries.push(boundary);
        }
    }

    boundaries
        .windows(2)
        .map(|w| chars[w[0]..w[1]].iter().collect())
        .collect()
}
