//! Property tests for broker path construction.

use dbcreds::broker::{creds_path, role_path, validate_role, BrokerError};
use proptest::prelude::*;

proptest! {
    #[test]
    fn valid_roles_map_to_a_single_segment(role in "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,63}") {
        prop_assume!(!role.contains(".."));

        let path = creds_path("database", &role).unwrap();
        prop_assert_eq!(path, format!("database/creds/{}", role));

        let path = role_path("database", &role).unwrap();
        prop_assert_eq!(path.split('/').count(), 3);
    }

    #[test]
    fn roles_with_separators_are_rejected(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        for sep in ["/", "\\", "..", " ", "?", "#", "%"] {
            let role = format!("{}{}{}", prefix, sep, suffix);
            let rejected = matches!(validate_role(&role), Err(BrokerError::InvalidRole { .. }));
            prop_assert!(rejected, "{:?} should be rejected", role);
        }
    }

    #[test]
    fn dot_segments_are_rejected(dots in "\\.{1,2}") {
        let rejected = matches!(validate_role(&dots), Err(BrokerError::InvalidRole { .. }));
        prop_assert!(rejected, "{:?} should be rejected", dots);
        prop_assert!(creds_path("database", &dots).is_err());
    }

    #[test]
    fn overlong_roles_are_rejected(role in "[a-z]{129,200}") {
        prop_assert!(validate_role(&role).is_err());
    }
}
