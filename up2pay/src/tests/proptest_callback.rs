use proptest::prelude::*;

use crate::{callback::parse_callback, format::parse_leading_int};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_signed_message_precedes_signature(
        amount in "[0-9]{1,10}",
        payment_id in "[A-Za-z0-9]{1,20}",
        signature in "[A-Za-z0-9+/]{4,172}={0,2}",
    ) {
        let encoded = signature.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");
        let query = format!("amount={amount}&paymentId={payment_id}&error=00000");
        let url = format!("https://shop.example.com/cb?{query}&signature={encoded}");

        let result = parse_callback(&url);

        prop_assert_eq!(&result.signed_message, &query);
        prop_assert_eq!(&result.signature, &signature);
        prop_assert_eq!(&result.amount, &amount);
        prop_assert_eq!(&result.payment_id, &payment_id);
    }

    #[test]
    fn test_unencoded_plus_in_signature_is_preserved(signature in "[A-Za-z0-9+/]{4,64}") {
        let result = parse_callback(&format!("?amount=1&signature={signature}"));
        prop_assert_eq!(result.signature, signature);
    }

    #[test]
    fn test_leading_int_ignores_trailing_text(value in any::<u32>(), tail in "[^0-9]{0,8}") {
        prop_assert_eq!(parse_leading_int(&format!("{value}{tail}")), Some(i64::from(value)));
    }
}
