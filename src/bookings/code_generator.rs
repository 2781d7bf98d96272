// Booking code generation
// Codes look like BK20260315A7QZ: prefix, creation day, four random characters

use chrono::NaiveDate;
use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

pub const CODE_PREFIX: &str = "BK";
pub const CODE_SUFFIX_LEN: usize = 4;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of candidate booking codes
///
/// Uniqueness is not the generator's job: the store rejects duplicates and
/// the booking service asks for another candidate.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, day: NaiveDate) -> String;
}

/// Random uppercase-alphanumeric suffix from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, day: NaiveDate) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..CODE_SUFFIX_LEN)
            .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
            .collect();
        format!("{}{}{}", CODE_PREFIX, day.format("%Y%m%d"), suffix)
    }
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^BK[0-9]{8}[A-Z0-9]{4}$").expect("booking code pattern compiles"))
}

/// True when `code` has the booking code shape
pub fn is_valid_code(code: &str) -> bool {
    code_pattern().is_match(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    #[test]
    fn test_generated_code_format() {
        let code = RandomCodeGenerator.generate(day());
        assert_eq!(code.len(), 14);
        assert!(code.starts_with("BK20260315"));
        assert!(is_valid_code(&code), "bad code {}", code);
    }

    #[test]
    fn test_is_valid_code_rejects_other_shapes() {
        assert!(!is_valid_code("BK20260315abcd"));
        assert!(!is_valid_code("BK2026031A1234"));
        assert!(!is_valid_code("XX20260315ABCD"));
        assert!(!is_valid_code("BK20260315ABCDE"));
    }

    #[test]
    fn test_codes_vary() {
        let codes: HashSet<String> = (0..200).map(|_| RandomCodeGenerator.generate(day())).collect();
        assert!(codes.len() > 190);
    }
}
