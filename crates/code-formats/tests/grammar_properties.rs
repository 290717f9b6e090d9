use code_formats::{QR_SERIAL, find_format, list_formats};
use proptest::prelude::*;
use proptest::test_runner::Config;

const CODE39_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn code128_accepts_any_nonempty_ascii(value in "[\\x00-\\x7F]{1,48}") {
        prop_assert!(find_format("CODE128").unwrap().validate(&value));
    }

    #[test]
    fn code128_rejects_any_non_ascii(prefix in "[ -~]{0,8}", c in "[\\x{80}-\\x{10FFFF}]", suffix in "[ -~]{0,8}") {
        let value = format!("{prefix}{c}{suffix}");
        prop_assert!(!find_format("CODE128").unwrap().validate(&value));
    }

    #[test]
    fn itf_accepts_exactly_twelve_digits(value in "[0-9]{12}") {
        prop_assert!(find_format("ITF").unwrap().validate(&value));
    }

    #[test]
    fn itf_rejects_other_lengths(value in "[0-9]{0,30}") {
        prop_assume!(value.len() != 12);
        prop_assert!(!find_format("ITF").unwrap().validate(&value));
    }

    #[test]
    fn code39_accepts_its_charset(value in "[0-9A-Z\\-\\. \\$/\\+%]{1,32}") {
        prop_assert!(find_format("CODE39").unwrap().validate(&value));
    }

    #[test]
    fn code39_rejects_any_foreign_char(value in "[0-9A-Z]{0,6}", c in any::<char>()) {
        prop_assume!(!CODE39_CHARSET.contains(c));
        let bad = format!("{value}{c}");
        prop_assert!(!find_format("CODE39").unwrap().validate(&bad));
    }

    #[test]
    fn msi_matches_digit_strings(value in "[0-9]{1,40}") {
        prop_assert!(find_format("MSI").unwrap().validate(&value));
    }

    #[test]
    fn msi_rejects_digit_strings_with_noise(value in "[0-9]{0,10}[^0-9][0-9]{0,10}") {
        prop_assert!(!find_format("MSI").unwrap().validate(&value));
    }

    #[test]
    fn pharmacode_matches_numeric_range(n in 0u32..400_000) {
        let expected = (3..=131_070).contains(&n);
        prop_assert_eq!(find_format("pharmacode").unwrap().validate(&n.to_string()), expected);
    }

    #[test]
    fn qr_serial_normalises_to_digits(parts in proptest::collection::vec("[0-9]{1,4}", 1..5)) {
        let spaced = parts.join(" ");
        prop_assert!(QR_SERIAL.validate(&spaced));
        prop_assert_eq!(QR_SERIAL.normalize(&spaced), parts.concat());
    }

    #[test]
    fn validation_is_a_pure_function(value in ".{0,24}") {
        for f in list_formats() {
            prop_assert_eq!(f.validate(&value), f.validate(&value));
        }
    }
}
