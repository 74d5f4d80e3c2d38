// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Assertions that also record their outcome in the test log.

/// Assert `condition`, logging the attempt and its outcome.
#[macro_export]
macro_rules! logged_assert {
    ($logger:expr, $condition:expr) => {
        $crate::logged_assert!($logger, $condition, stringify!($condition))
    };
    ($logger:expr, $condition:expr, $message:expr) => {{
        let _ = $logger.log(&format!("Asserting: {}", $message));
        if $condition {
            let _ = $logger.log("✓ Assertion passed");
        } else {
            let _ = $logger.log("✗ Assertion failed");
            panic!("Assertion failed: {}", $message);
        }
    }};
}

/// Assert equality, logging both sides on failure.
#[macro_export]
macro_rules! logged_assert_eq {
    ($logger:expr, $left:expr, $right:expr) => {{
        let left = &$left;
        let right = &$right;
        let _ = $logger.log(&format!(
            "Asserting equality: {} == {}",
            stringify!($left),
            stringify!($right)
        ));
        if left == right {
            let _ = $logger.log("✓ Equality assertion passed");
        } else {
            let message = format!(
                "assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                left, right
            );
            let _ = $logger.log(&format!("✗ {}", message));
            panic!("{}", message);
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::TestLogger;

    #[crate::logged_test]
    fn failing_assertions_panic() {
        let result = std::panic::catch_unwind(|| {
            let mut inner = TestLogger::new("inner_logged_assert").unwrap();
            logged_assert!(inner, 1 + 1 == 3, "arithmetic");
        });
        assert!(result.is_err());

        let result = std::panic::catch_unwind(|| {
            let mut inner = TestLogger::new("inner_logged_assert_eq").unwrap();
            logged_assert_eq!(inner, 1, 2);
        });
        assert!(result.is_err());

        logged_assert_eq!(logger, "same", "same");
    }
}
