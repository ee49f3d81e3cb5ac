// src/transform/css.rs

//! CSS processing through `lightningcss`.
//!
//! Both the prefixing and the minifying step parse the stylesheet, run the
//! `lightningcss` minify pass against a set of browser targets and print
//! the result. Prefixing pretty-prints for browsers that still need vendor
//! prefixes; minifying prints compactly with no targets, so whatever
//! prefixes are already present are kept as they are.

use std::fmt::Display;

use lightningcss::error::Error as CssError;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::Targets;

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformKind};

/// Parse `src`, apply the minify pass for `targets` and print it.
///
/// `origin` only shows up in error locations.
pub fn process(
    transform: &'static str,
    origin: &str,
    src: &str,
    targets: Targets,
    minify: bool,
) -> Result<String, TransformError> {
    let mut sheet = StyleSheet::parse(
        src,
        ParserOptions {
            filename: origin.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| syntax_error(transform, &e))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| syntax_error(transform, &e))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| syntax_error(transform, &e))?;
    Ok(printed.code)
}

fn syntax_error<T: Display>(transform: &'static str, err: &CssError<T>) -> TransformError {
    TransformError::Syntax {
        transform,
        // lightningcss lines are zero-based.
        line: err.loc.as_ref().map_or(1, |loc| loc.line as usize + 1),
        message: err.kind.to_string(),
    }
}

/// `cleanCSS` equivalent: compact output, no comments except leading `/*!`
/// licence comments, empty rules dropped.
#[derive(Debug, Clone, Default)]
pub struct CssMinify;

impl Transform for CssMinify {
    fn name(&self) -> &'static str {
        "css-minify"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Minify
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let out = process(
            self.name(),
            &asset.origin,
            asset.text(self.name())?,
            Targets::default(),
            true,
        )?;
        asset.contents = out.into_bytes();
        Ok(asset)
    }
}
