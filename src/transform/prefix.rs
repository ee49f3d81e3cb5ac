// src/transform/prefix.rs

//! Vendor-prefix injection (`autoprefixer` equivalent).

use lightningcss::targets::{Browsers, Targets};

use crate::errors::TransformError;
use crate::transform::css;
use crate::transform::{Asset, Transform, TransformKind};

/// `lightningcss` encodes browser versions as `major << 16 | minor << 8`.
const fn version(major: u32) -> Option<u32> {
    Some(major << 16)
}

/// Oldest browsers the prefixed output still supports.
///
/// Safari 12 needs `-webkit-user-select` and `-webkit-sticky`, Firefox 68
/// `-moz-user-select`, EdgeHTML 18 `-ms-user-select`.
pub const PREFIX_BROWSERS: Browsers = Browsers {
    android: None,
    chrome: version(80),
    edge: version(18),
    firefox: version(68),
    ie: None,
    ios_saf: version(12),
    opera: version(67),
    safari: version(12),
    samsung: version(12),
};

#[derive(Debug, Clone, Default)]
pub struct Autoprefix;

impl Transform for Autoprefix {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Prefix
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = css::process(
            self.name(),
            &asset.origin,
            asset.text(self.name())?,
            Targets::from(PREFIX_BROWSERS),
            false,
        )?;
        asset.contents = out.into_bytes();
        Ok(asset)
    }
}
