//! A1-style column reference arithmetic.
//!
//! Column letters map bijectively to 1-based column numbers by base-26
//! arithmetic with digits A=1..Z=26 (there is no zero digit).

/// Convert a 1-based column number to its letter form (1 → "A", 27 → "AA").
///
/// Numbers below 1 collapse to `"A"`.
pub fn column_letters(n: u32) -> String {
    if n < 1 {
        return "A".to_string();
    }
    let mut n = n;
    let mut letters = String::new();
    while n > 0 {
        letters.push((b'A' + ((n - 1) % 26) as u8) as char);
        n = (n - 1) / 26;
    }
    letters.chars().rev().collect()
}

/// Convert column letters to the 1-based column number ("A" → 1, "AA" → 27).
///
/// Characters outside A-Z are skipped after uppercase folding, so a full
/// cell reference like `"B12"` resolves to column 2. An input with no
/// letters at all yields 0.
pub fn column_number(s: &str) -> u32 {
    let mut n: u32 = 0;
    for c in s.chars() {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            n = n.saturating_mul(26).saturating_add(c as u32 - 'A' as u32 + 1);
        }
    }
    n
}

/// Extract the column number from the alphabetic prefix of a cell
/// reference ("C3" → 3). Returns 0 when the reference has no such prefix.
pub fn column_of_ref(cell_ref: &str) -> u32 {
    let prefix_len = cell_ref
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    column_number(&cell_ref[..prefix_len])
}
