//! Assertion macros for scenario functions.
//!
//! Borrowed from the `pretty_assertions` crate with one twist: a failed
//! check returns a `Result` instead of panicking, so it aborts only the
//! scenario it lives in and the run carries on with the next one. Every
//! outcome is also published to the runner channel so reporters can show
//! which checks a scenario performed.

/// Custom error type used by the comparison assertion macros. Test
/// functions propagate it through `eyre::Report`, which keeps the
/// colorized backtrace output.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    StrEq(String),
    #[error("{0}")]
    Eq(String),
    #[error("{0}")]
    Ne(String),
}

/// Asserts that a boolean expression is true.
///
/// On failure a failed check event is published and an error is returned
/// from the enclosing function; the process keeps running.
#[macro_export]
macro_rules! check {
    ($cond:expr) => {
        $crate::check!(@ $cond, "", "");
    };
    ($cond:expr, $($arg:tt)+) => {
        $crate::check!(@ $cond, ": ", $($arg)+);
    };
    (@ $cond:expr, $maybe_colon:expr, $($arg:tt)*) => {
        if !$cond {
            let __message = format!(
                "check failed: {}{}{}",
                stringify!($cond),
                $maybe_colon,
                format_args!($($arg)*)
            );
            $crate::runner::publish_check($crate::runner::Check::error(&__message))?;
            $crate::eyre::bail!(__message);
        } else {
            let __message = format!(
                "check succeeded: {}{}{}",
                stringify!($cond),
                $maybe_colon,
                format_args!($($arg)*)
            );
            $crate::runner::publish_check($crate::runner::Check::success(&__message))?;
        }
    };
}

/// Asserts that two expressions are equal using `==`, with a
/// `pretty_assertions` diff in the failure message.
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr$(,)?) => ({
        $crate::check_eq!(@ $left, $right, "", "");
    });
    ($left:expr, $right:expr, $($arg:tt)*) => ({
        $crate::check_eq!(@ $left, $right, ": ", $($arg)+);
    });
    (@ $left:expr, $right:expr, $maybe_colon:expr, $($arg:tt)*) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    let __message = format!(
                        "check failed: `(left == right)`{}{}\
                        \n\
                        \n{}\
                        \n",
                        $maybe_colon,
                        format_args!($($arg)*),
                        $crate::pretty_assertions::Comparison::new(left_val, right_val)
                    );
                    $crate::runner::publish_check($crate::runner::Check::error(&__message))?;
                    Err($crate::assertion::Error::Eq(__message))?;
                } else {
                    let __message = format!(
                        "check succeeded: `(left == right)`{}{}",
                        $maybe_colon,
                        format_args!($($arg)*)
                    );
                    $crate::runner::publish_check($crate::runner::Check::success(&__message))?;
                }
            }
        }
    });
}

/// Asserts that two string expressions are equal, with a line-by-line
/// string diff on failure. Prefer this over `check_eq!` for response
/// bodies and other text.
#[macro_export]
macro_rules! check_str_eq {
    ($left:expr, $right:expr$(,)?) => ({
        $crate::check_str_eq!(@ $left, $right, "", "");
    });
    ($left:expr, $right:expr, $($arg:tt)*) => ({
        $crate::check_str_eq!(@ $left, $right, ": ", $($arg)+);
    });
    (@ $left:expr, $right:expr, $maybe_colon:expr, $($arg:tt)*) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    let __message = format!(
                        "check failed: `(left == right)`{}{}\
                        \n\
                        \n{}\
                        \n",
                        $maybe_colon,
                        format_args!($($arg)*),
                        $crate::pretty_assertions::StrComparison::new(left_val, right_val)
                    );
                    $crate::runner::publish_check($crate::runner::Check::error(&__message))?;
                    Err($crate::assertion::Error::StrEq(__message))?;
                } else {
                    let __message = format!(
                        "check succeeded: `(left == right)`{}{}",
                        $maybe_colon,
                        format_args!($($arg)*)
                    );
                    $crate::runner::publish_check($crate::runner::Check::success(&__message))?;
                }
            }
        }
    });
}

/// Asserts that two expressions are not equal using `!=`.
#[macro_export]
macro_rules! check_ne {
    ($left:expr, $right:expr$(,)?) => ({
        $crate::check_ne!(@ $left, $right, "", "");
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        $crate::check_ne!(@ $left, $right, ": ", $($arg)+);
    });
    (@ $left:expr, $right:expr, $maybe_colon:expr, $($arg:tt)*) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    let __message = format!(
                        "check failed: `(left != right)`{}{}\
                        \n\
                        \nBoth sides:\
                        \n{:#?}\
                        \n",
                        $maybe_colon,
                        format_args!($($arg)*),
                        left_val
                    );
                    $crate::runner::publish_check($crate::runner::Check::error(&__message))?;
                    Err($crate::assertion::Error::Ne(__message))?;
                } else {
                    let __message = format!(
                        "check succeeded: `(left != right)`{}{}",
                        $maybe_colon,
                        format_args!($($arg)*)
                    );
                    $crate::runner::publish_check($crate::runner::Check::success(&__message))?;
                }
            }
        }
    });
}

#[cfg(test)]
mod test {
    fn passing_checks() -> eyre::Result<()> {
        crate::check!(1 + 1 == 2);
        crate::check_eq!(2, 1 + 1);
        crate::check_ne!(3, 1 + 1, "sum should differ");
        crate::check_str_eq!("ab", "ab");
        Ok(())
    }

    fn failing_check() -> eyre::Result<()> {
        crate::check_eq!("expected", "actual", "deliberate mismatch");
        Ok(())
    }

    #[test]
    fn checks_return_instead_of_panicking() {
        assert!(passing_checks().is_ok());

        let err = failing_check().unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("deliberate mismatch"), "{rendered}");
        assert!(rendered.contains("check failed"), "{rendered}");
    }

    #[test]
    fn boolean_check_carries_the_expression_text() {
        fn run() -> eyre::Result<()> {
            let status = 500;
            crate::check!(status < 400, "unexpected status {status}");
            Ok(())
        }

        let err = run().unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("status < 400"), "{rendered}");
        assert!(rendered.contains("unexpected status 500"), "{rendered}");
    }
}
