// src/transform/sass.rs

//! Compiler for the indented Sass syntax (`.sass`).
//!
//! Supported: `$variables` (with `!default`), nesting by indentation, `&`
//! parent references, comma selector lists, at-rule blocks such as `@media`
//! or `@font-face`, block-less at-rules, `//` and `/* */` comments.
//! Mixins, imports and control flow are reported as unsupported.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformKind};

const NAME: &str = "sass";

static VARIABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][\w-]*)").expect("valid regex"));

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?[A-Za-z][\w-]*)\s*:\s*(.+)$").expect("valid regex"));

static OLD_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(-?[A-Za-z][\w-]*)\s+(.+)$").expect("valid regex"));

const UNSUPPORTED: &[&str] = &[
    "@import", "@use", "@forward", "@mixin", "@include", "@extend", "@function", "@return",
    "@if", "@else", "@each", "@for", "@while", "=", "+",
];

#[derive(Debug, Clone, Default)]
pub struct SassCompile;

impl Transform for SassCompile {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Compile
    }

    fn apply(&self, mut asset: Asset) -> Result<Asset, TransformError> {
        asset.contents = compile(asset.text(NAME)?)?.into_bytes();
        asset.path.set_extension("css");
        Ok(asset)
    }
}

/// Compiled output, printed by [`print_pretty`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum CssNode {
    /// Selector list or at-rule prelude followed by a `{ ... }` block.
    Rule { prelude: String, body: Vec<CssNode> },
    Declaration { property: String, value: String },
    /// At-rule without a block, e.g. `@charset "utf-8"`.
    Statement(String),
    /// Full comment text including `/*` and `*/`.
    Comment(String),
}

/// Compile indented Sass source into readable CSS.
pub fn compile(src: &str) -> Result<String, TransformError> {
    let lines = split_lines(src);
    let mut idx = 0;
    let items = parse_items(&lines, &mut idx, 0)?;
    if let Some(line) = lines.get(idx) {
        return Err(syntax(line.number, "inconsistent indentation"));
    }

    let mut emitter = Emitter {
        vars: HashMap::new(),
    };
    let mut nodes = Vec::new();
    emitter.emit_block(&[], &items, false, &mut nodes)?;

    let mut out = String::new();
    print_pretty(&nodes, 0, &mut out);
    Ok(out)
}

/// Two-space indentation, one declaration per line.
fn print_pretty(nodes: &[CssNode], indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    for node in nodes {
        match node {
            CssNode::Rule { prelude, body } => {
                out.push_str(&format!("{pad}{prelude} {{\n"));
                print_pretty(body, indent + 2, out);
                out.push_str(&format!("{pad}}}\n"));
            }
            CssNode::Declaration { property, value } => {
                out.push_str(&format!("{pad}{property}: {value};\n"));
            }
            CssNode::Statement(text) => out.push_str(&format!("{pad}{text};\n")),
            CssNode::Comment(text) => out.push_str(&format!("{pad}{text}\n")),
        }
    }
}

#[derive(Debug)]
struct Line {
    number: usize,
    indent: usize,
    /// Trimmed text. A `/*` comment carries its continuation lines too.
    text: String,
}

#[derive(Debug)]
enum Item {
    Variable {
        name: String,
        value: String,
        default: bool,
    },
    Declaration {
        line: usize,
        property: String,
        value: String,
    },
    Comment(String),
    Statement {
        line: usize,
        text: String,
    },
    Block {
        line: usize,
        header: String,
        children: Vec<Item>,
    },
}

fn syntax(line: usize, message: impl Into<String>) -> TransformError {
    TransformError::Syntax {
        transform: NAME,
        line,
        message: message.into(),
    }
}

fn indent_of(raw: &str) -> usize {
    raw.len() - raw.trim_start().len()
}

/// Non-blank lines with comments folded in.
///
/// A comment swallows every following line indented deeper than itself.
/// `//` comments are dropped; `/*` comments become a single line.
fn split_lines(src: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut raw_lines = src.lines().enumerate().peekable();

    while let Some((i, raw)) = raw_lines.next() {
        let text = raw.trim();
        if text.is_empty() {
            continue;
        }
        let indent = indent_of(raw);

        if text.starts_with("//") || text.starts_with("/*") {
            let mut body = vec![text.to_string()];
            while let Some(&(_, next)) = raw_lines.peek() {
                let next_text = next.trim();
                if !next_text.is_empty() {
                    if indent_of(next) <= indent {
                        break;
                    }
                    body.push(next_text.to_string());
                }
                raw_lines.next();
            }
            if text.starts_with("/*") {
                lines.push(Line {
                    number: i + 1,
                    indent,
                    text: body.join("\n"),
                });
            }
            continue;
        }

        lines.push(Line {
            number: i + 1,
            indent,
            text: text.to_string(),
        });
    }
    lines
}

fn parse_items(lines: &[Line], idx: &mut usize, level: usize) -> Result<Vec<Item>, TransformError> {
    let mut items = Vec::new();

    while let Some(line) = lines.get(*idx) {
        if line.indent < level {
            break;
        }
        if line.indent > level {
            return Err(syntax(line.number, "unexpected indentation"));
        }
        *idx += 1;

        let children = match lines.get(*idx) {
            Some(next) if next.indent > level => parse_items(lines, idx, next.indent)?,
            _ => Vec::new(),
        };

        items.push(classify(line, children)?);
    }

    Ok(items)
}

fn classify(line: &Line, children: Vec<Item>) -> Result<Item, TransformError> {
    let text = line.text.as_str();

    if text.starts_with("/*") {
        let comment = if text.ends_with("*/") {
            text.to_string()
        } else {
            format!("{text} */")
        };
        return Ok(Item::Comment(comment));
    }

    if let Some(keyword) = UNSUPPORTED.iter().find(|k| {
        text == **k || text.starts_with(&format!("{k} ")) || (k.len() == 1 && text.starts_with(**k))
    }) {
        return Err(TransformError::Unsupported {
            transform: NAME,
            what: format!("{keyword} (line {})", line.number),
        });
    }

    if let Some(rest) = text.strip_prefix('$') {
        let (name, value) = rest
            .split_once(':')
            .ok_or_else(|| syntax(line.number, "variable without value"))?;
        let value = value.trim();
        let (value, default) = match value.strip_suffix("!default") {
            Some(v) => (v.trim(), true),
            None => (value, false),
        };
        return Ok(Item::Variable {
            name: name.trim().to_string(),
            value: value.to_string(),
            default,
        });
    }

    if !children.is_empty() {
        return Ok(Item::Block {
            line: line.number,
            header: text.to_string(),
            children,
        });
    }

    if text.starts_with('@') {
        return Ok(Item::Statement {
            line: line.number,
            text: text.trim_end_matches(';').to_string(),
        });
    }

    let caps = DECLARATION
        .captures(text)
        .or_else(|| OLD_DECLARATION.captures(text))
        .ok_or_else(|| syntax(line.number, format!("expected a declaration, found {text:?}")))?;
    Ok(Item::Declaration {
        line: line.number,
        property: caps[1].to_string(),
        value: caps[2].trim_end_matches(';').trim().to_string(),
    })
}

struct Emitter {
    vars: HashMap<String, String>,
}

impl Emitter {
    fn substitute(&self, text: &str) -> Result<String, TransformError> {
        if let Some(missing) = VARIABLE_REF
            .captures_iter(text)
            .find(|c| !self.vars.contains_key(&c[1]))
        {
            return Err(TransformError::UndefinedVariable {
                transform: NAME,
                name: missing[1].to_string(),
            });
        }
        Ok(VARIABLE_REF
            .replace_all(text, |c: &Captures<'_>| self.vars[&c[1]].clone())
            .into_owned())
    }

    /// Emit `items` nested under `selectors`.
    ///
    /// Declarations of the block come first as one rule, then nested rules.
    /// `in_at_rule` allows declarations without a selector (`@font-face`).
    fn emit_block(
        &mut self,
        selectors: &[String],
        items: &[Item],
        in_at_rule: bool,
        out: &mut Vec<CssNode>,
    ) -> Result<(), TransformError> {
        let mut own = Vec::new();
        let mut nested = Vec::new();

        for item in items {
            match item {
                Item::Variable {
                    name,
                    value,
                    default,
                } => {
                    if *default && self.vars.contains_key(name) {
                        continue;
                    }
                    let value = self.substitute(value)?;
                    self.vars.insert(name.clone(), value);
                }
                Item::Declaration {
                    line,
                    property,
                    value,
                } => {
                    if selectors.is_empty() && !in_at_rule {
                        return Err(syntax(*line, "declaration outside of a rule"));
                    }
                    own.push(CssNode::Declaration {
                        property: property.clone(),
                        value: self.substitute(value)?,
                    });
                }
                Item::Comment(text) => {
                    if selectors.is_empty() {
                        nested.push(CssNode::Comment(text.clone()));
                    } else {
                        own.push(CssNode::Comment(text.clone()));
                    }
                }
                Item::Statement { line, text } => {
                    if !selectors.is_empty() {
                        return Err(syntax(*line, "at-rule statement inside a rule"));
                    }
                    nested.push(CssNode::Statement(self.substitute(text)?));
                }
                Item::Block {
                    line,
                    header,
                    children,
                } => {
                    let header = self.substitute(header)?;
                    if header.starts_with('@') {
                        let mut body = Vec::new();
                        self.emit_block(selectors, children, true, &mut body)?;
                        nested.push(CssNode::Rule {
                            prelude: header,
                            body,
                        });
                    } else {
                        let resolved = resolve_selectors(selectors, &header);
                        if resolved.is_empty() {
                            return Err(syntax(*line, "empty selector"));
                        }
                        self.emit_block(&resolved, children, false, &mut nested)?;
                    }
                }
            }
        }

        if !own.is_empty() {
            if selectors.is_empty() {
                out.extend(own);
            } else {
                out.push(CssNode::Rule {
                    prelude: selectors.join(", "),
                    body: own,
                });
            }
        }
        out.extend(nested);
        Ok(())
    }
}

/// Combine parent selectors with a nested selector list.
pub fn resolve_selectors(parents: &[String], header: &str) -> Vec<String> {
    let children: Vec<&str> = header
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parents.is_empty() {
        return children.iter().map(|c| c.to_string()).collect();
    }

    let mut resolved = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in &children {
            if child.contains('&') {
                resolved.push(child.replace('&', parent));
            } else {
                resolved.push(format!("{parent} {child}"));
            }
        }
    }
    resolved
}
