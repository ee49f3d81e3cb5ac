// src/transform/js.rs

//! JavaScript minification through `swc`.
//!
//! The source is parsed into an AST and re-emitted by the codegen in minify
//! mode, so whitespace and comments go while literals stay intact.
//! Identifiers are never renamed. `/*!` licence comments are kept and
//! hoisted to the top of the output.

use swc_common::comments::{CommentKind, SingleThreadedComments};
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, GLOBALS, Globals, SourceMap, Span, Spanned};
use swc_ecma_ast::EsVersion;
use swc_ecma_codegen::text_writer::JsWriter;
use swc_ecma_codegen::{Config as CodegenConfig, Emitter};
use swc_ecma_parser::{EsSyntax, Syntax, parse_file_as_program};

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformKind};

const NAME: &str = "js-minify";

#[derive(Debug, Clone, Default)]
pub struct JsMinify;

impl Transform for JsMinify {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Minify
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        let minified = minify(asset.text(NAME)?)?;
        asset.contents = minified.into_bytes();
        Ok(asset)
    }
}

/// Minify a script or module.
///
/// Anything the parser rejects, including errors it could recover from,
/// fails the file instead of producing output.
pub fn minify(src: &str) -> Result<String, TransformError> {
    let cm: Lrc<SourceMap> = Lrc::new(SourceMap::default());
    let file = cm.new_source_file(Lrc::new(FileName::Anon), src.to_owned());
    let comments = SingleThreadedComments::default();

    GLOBALS.set(&Globals::new(), || {
        let mut recovered = Vec::new();
        let program = parse_file_as_program(
            &file,
            Syntax::Es(EsSyntax::default()),
            EsVersion::EsNext,
            Some(&comments),
            &mut recovered,
        )
        .map_err(|e| syntax_error(&cm, e.span(), &e.kind().msg()))?;

        if let Some(first) = recovered.first() {
            return Err(syntax_error(&cm, first.span(), &first.kind().msg()));
        }

        let mut buf = Vec::with_capacity(src.len());
        {
            let wr = JsWriter::new(Lrc::clone(&cm), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: CodegenConfig::default().with_minify(true),
                cm: Lrc::clone(&cm),
                comments: None,
                wr,
            };
            emitter.emit_program(&program).map_err(|e| TransformError::Codec {
                transform: NAME,
                message: e.to_string(),
            })?;
        }

        let code = String::from_utf8(buf).map_err(|_| TransformError::Encoding { transform: NAME })?;
        let licences = licence_comments(&comments);
        if licences.is_empty() {
            Ok(code)
        } else {
            Ok(format!("{}\n{code}", licences.join("\n")))
        }
    })
}

fn syntax_error(cm: &SourceMap, span: Span, message: &str) -> TransformError {
    TransformError::Syntax {
        transform: NAME,
        line: cm.lookup_char_pos(span.lo).line,
        message: message.to_string(),
    }
}

/// `/*! ... */` blocks in source order.
fn licence_comments(comments: &SingleThreadedComments) -> Vec<String> {
    let (leading, trailing) = comments.borrow_all();
    let mut found: Vec<(BytePos, String)> = leading
        .values()
        .chain(trailing.values())
        .flatten()
        .filter(|c| c.kind == CommentKind::Block && c.text.starts_with('!'))
        .map(|c| (c.span.lo, format!("/*{}*/", &*c.text)))
        .collect();
    found.sort();
    found.dedup();
    found.into_iter().map(|(_, text)| text).collect()
}
