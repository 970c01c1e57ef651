use chrono::NaiveDate;

const PHN_WEIGHTS: [u32; 8] = [2, 4, 8, 5, 10, 9, 7, 3];

/// Check a BC personal health number: ten digits, leading `9`, mod-11 check digit.
pub fn is_valid_phn(phn: &str) -> bool {
    let digits: Vec<u32> = phn.trim().chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 10 || phn.trim().len() != 10 || digits[0] != 9 {
        return false;
    }

    let sum: u32 = digits[1..9]
        .iter()
        .zip(PHN_WEIGHTS)
        .map(|(digit, weight)| (digit * weight) % 11)
        .sum();
    let check = 11 - (sum % 11);

    // 10 and 11 have no single-digit representation.
    check < 10 && check == digits[9]
}

/// Parse a `yyyy-MM-dd` birth date.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
