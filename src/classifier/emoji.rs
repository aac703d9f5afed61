// Emoji code point detection
//
// Ranges follow the Unicode emoji blocks. The enclosed-characters range is
// limited to U+24C2 and the enclosed alphanumeric/ideographic supplements so
// that CJK and Hangul text is never mistaken for emoji.

const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F), // emoticons
    (0x1F300, 0x1F5FF), // symbols & pictographs
    (0x1F680, 0x1F6FF), // transport & map symbols
    (0x1F1E0, 0x1F1FF), // regional indicators (flags)
    (0x2700, 0x27BF),   // dingbats
    (0x24C2, 0x24C2),   // circled M
    (0x1F100, 0x1F251), // enclosed alphanumeric / ideographic supplements
    (0x1F900, 0x1F9FF), // supplemental symbols & pictographs
    (0x1FA00, 0x1FA6F), // chess symbols
    (0x1FA70, 0x1FAFF), // symbols & pictographs extended-A
    (0x2600, 0x26FF),   // miscellaneous symbols
];

/// Whether a code point falls in one of the emoji blocks
pub fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

/// Remove every emoji code point, leaving the rest of the text untouched
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|&c| !is_emoji(c)).collect()
}
