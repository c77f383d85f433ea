// src/utils/masking.rs
//! Name redaction for pre-confirmation display.

/// Masks a full name so its owner can recognise it without it being readable.
///
/// Each space-separated part longer than two characters keeps its first and
/// last character and has everything in between replaced by `*`. Parts of two
/// characters or fewer are returned unchanged. Lengths are counted in
/// characters, not bytes.
///
/// The name is split on single spaces, so runs of spaces survive as empty
/// parts and the original spacing is preserved.
///
/// # Example
/// ```
/// use certdesk::utils::masking::mask_name;
/// assert_eq!(mask_name("Rupesh Kumar"), "R****h K****r");
/// ```
pub fn mask_name(name: &str) -> String {
    name.split(' ').map(mask_part).collect::<Vec<_>>().join(" ")
}

fn mask_part(part: &str) -> String {
    let chars: Vec<char> = part.chars().collect();
    if chars.len() <= 2 {
        return part.to_string();
    }

    let mut masked = String::with_capacity(part.len());
    masked.push(chars[0]);
    masked.extend(std::iter::repeat('*').take(chars.len() - 2));
    masked.push(chars[chars.len() - 1]);
    masked
}
