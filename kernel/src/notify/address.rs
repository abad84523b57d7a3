//! Phone number to messaging address normalization.

/// Suffix of personal chat addresses.
pub const ADDRESS_SUFFIX: &str = "@s.whatsapp.net";

const MIN_DIGITS: usize = 8;

/// Turns a locally formatted phone number into a messaging address.
///
/// `0812-3456-789` with country code `62` becomes `628123456789@s.whatsapp.net`.
/// Returns `None` when too few digits remain.
#[must_use]
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let international = raw.trim_start().starts_with('+');

    let number = if international || digits.starts_with(country_code) {
        digits
    } else if let Some(local) = digits.strip_prefix('0') {
        format!("{country_code}{local}")
    } else {
        format!("{country_code}{digits}")
    };

    if number.len() < MIN_DIGITS {
        return None;
    }
    Some(format!("{number}{ADDRESS_SUFFIX}"))
}
