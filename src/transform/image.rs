// src/transform/image.rs

//! Image optimisation (`imagemin` equivalent).
//!
//! - PNG: lossless recompression through `oxipng` at the configured preset.
//! - SVG: markup cleanup (comments, doctype, metadata, inter-tag whitespace,
//!   optional `viewBox` removal and unused-id removal).
//! - GIF/JPEG and anything else: copied unchanged.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::model::ImageSection;
use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformKind};

const NAME: &str = "image-optimize";

static SVG_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SVG_DOCTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!DOCTYPE[^>]*>").expect("valid regex"));
static SVG_XML_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\?xml[^>]*\?>").expect("valid regex"));
static SVG_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata\b.*?</metadata>").expect("valid regex"));
static SVG_BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));
static SVG_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("valid regex"));
static SVG_ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+id="([^"]*)""#).expect("valid regex"));

#[derive(Debug, Clone)]
pub struct ImageOptimize {
    options: ImageSection,
}

impl ImageOptimize {
    pub fn new(options: ImageSection) -> Self {
        Self { options }
    }
}

impl Transform for ImageOptimize {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Optimize
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        match asset.extension().as_deref() {
            Some("png") => {
                let opts = oxipng::Options::from_preset(self.options.png_optimization_level);
                let optimized = oxipng::optimize_from_memory(&asset.contents, &opts).map_err(|e| {
                    TransformError::Codec {
                        transform: NAME,
                        message: e.to_string(),
                    }
                })?;
                // oxipng can return a larger file for already-optimal input.
                if optimized.len() < asset.contents.len() {
                    asset.contents = optimized;
                }
            }
            Some("svg") => {
                let cleaned = clean_svg(asset.text(NAME)?, &self.options);
                asset.contents = cleaned.into_bytes();
            }
            other => {
                debug!(path = ?asset.path, extension = ?other, "image copied unchanged");
            }
        }
        Ok(asset)
    }
}

/// Clean up SVG markup according to the `svg_*` options.
pub fn clean_svg(src: &str, options: &ImageSection) -> String {
    let mut svg = SVG_XML_DECL.replace_all(src, "").into_owned();
    svg = SVG_DOCTYPE.replace_all(&svg, "").into_owned();
    svg = SVG_COMMENT.replace_all(&svg, "").into_owned();
    svg = SVG_METADATA.replace_all(&svg, "").into_owned();
    svg = SVG_BETWEEN_TAGS.replace_all(&svg, "><").into_owned();

    if options.svg_remove_view_box {
        svg = remove_redundant_view_box(&svg);
    }
    if options.svg_cleanup_ids {
        svg = remove_unused_ids(&svg);
    }

    svg.trim().to_string()
}

/// Drop `viewBox="0 0 W H"` from the root element when it matches the
/// element's own `width`/`height`.
fn remove_redundant_view_box(svg: &str) -> String {
    let Some(root) = SVG_ROOT.find(svg) else {
        return svg.to_string();
    };
    let tag = root.as_str();
    let attr = |name: &str| -> Option<String> {
        let re = Regex::new(&format!(r#"\s{name}="([^"]*)""#)).ok()?;
        re.captures(tag).map(|c| c[1].trim().to_string())
    };

    let (Some(view_box), Some(width), Some(height)) = (attr("viewBox"), attr("width"), attr("height"))
    else {
        return svg.to_string();
    };

    let strip_px = |s: &str| s.trim_end_matches("px").to_string();
    let parts: Vec<&str> = view_box.split([' ', ',']).filter(|p| !p.is_empty()).collect();
    let redundant = parts.len() == 4
        && parts[0] == "0"
        && parts[1] == "0"
        && parts[2] == strip_px(&width)
        && parts[3] == strip_px(&height);
    if !redundant {
        return svg.to_string();
    }

    let new_tag = tag.replace(&format!(r#" viewBox="{view_box}""#), "");
    format!("{}{}{}", &svg[..root.start()], new_tag, &svg[root.end()..])
}

/// Remove `id` attributes that nothing references via `#id`.
fn remove_unused_ids(svg: &str) -> String {
    let referenced: HashSet<String> = SVG_ID_ATTR
        .captures_iter(svg)
        .map(|c| c[1].to_string())
        .filter(|id| svg.contains(&format!("#{id}")))
        .collect();

    SVG_ID_ATTR
        .replace_all(svg, |c: &regex::Captures<'_>| {
            if referenced.contains(&c[1]) {
                c[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}
