#![deny(missing_docs)]
//! Test utilities to be used in the module proxy crates' tests.

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Repeatedly run a code block until it `break`s, sleeping between
/// attempts. Panics if the block has not broken out after the timeout.
///
/// - `iter_check!({ .. })` - 1000ms timeout, 10ms sleep.
/// - `iter_check!(500, { .. })` - custom timeout, 10ms sleep.
/// - `iter_check!(500, 5, { .. })` - custom timeout and sleep.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:literal, $sleep_ms:literal, $code:block) => {
        tokio::time::timeout(
            std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        $sleep_ms,
                    ))
                    .await;
                    $code
                }
            },
        )
        .await
        .unwrap();
    };
    ($timeout_ms:literal, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(1000, $code)
    };
}

pub mod upstream;
