// src/transform/sourcemap.rs

//! Source map capture (`sourcemaps.init()`) and emission
//! (`sourcemaps.write()`).
//!
//! Maps are version 3 with the original path in `sources` and the original
//! text in `sourcesContent`. Outputs are minified onto few lines, so no
//! per-segment `mappings` are produced.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::errors::TransformError;
use crate::transform::{Asset, Companion, SourceMapState, Transform, TransformKind};
use crate::types::SourceMapMode;

#[derive(Debug, Clone, Default)]
pub struct SourceMapInit;

impl Transform for SourceMapInit {
    fn name(&self) -> &'static str {
        "sourcemap-init"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::SourceMapInit
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let source_content = asset.text(self.name())?.to_string();
        asset.source_map = Some(SourceMapState {
            source: asset.origin.clone(),
            source_content,
        });
        Ok(asset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceMapWrite {
    mode: SourceMapMode,
}

impl SourceMapWrite {
    pub fn new(mode: SourceMapMode) -> Self {
        Self { mode }
    }
}

/// Serialized form of a v3 source map.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson<'a> {
    pub version: u8,
    pub file: &'a str,
    pub sources: Vec<&'a str>,
    pub sources_content: Vec<&'a str>,
    pub names: Vec<&'a str>,
    pub mappings: &'a str,
}

impl Transform for SourceMapWrite {
    fn name(&self) -> &'static str {
        "sourcemap-write"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::SourceMapWrite
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let Some(state) = asset.source_map.take() else {
            return Ok(asset);
        };

        let file_name = asset
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let map = SourceMapJson {
            version: 3,
            file: &file_name,
            sources: vec![state.source.as_str()],
            sources_content: vec![state.source_content.as_str()],
            names: Vec::new(),
            mappings: "",
        };
        let json = serde_json::to_string(&map).map_err(|e| TransformError::Codec {
            transform: "sourcemap-write",
            message: e.to_string(),
        })?;

        let url = match self.mode {
            SourceMapMode::Inline => format!(
                "data:application/json;charset=utf8;base64,{}",
                STANDARD.encode(json.as_bytes())
            ),
            SourceMapMode::File => {
                let map_name = format!("{file_name}.map");
                let mut map_path = asset.path.clone();
                map_path.set_file_name(&map_name);
                asset.companions.push(Companion {
                    path: map_path,
                    contents: json.into_bytes(),
                });
                map_name
            }
        };

        let comment = if asset.extension().as_deref() == Some("css") {
            format!("\n/*# sourceMappingURL={url} */\n")
        } else {
            format!("\n//# sourceMappingURL={url}\n")
        };
        asset.contents.extend_from_slice(comment.as_bytes());
        Ok(asset)
    }
}
