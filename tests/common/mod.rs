#![allow(dead_code)]

pub use assetpipe_test_utils::builders;
pub use assetpipe_test_utils::fake_executor;
pub use assetpipe_test_utils::{init_tracing, with_timeout};
