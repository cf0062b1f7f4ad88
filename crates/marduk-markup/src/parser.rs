use crate::error::ParseError;
use crate::lexer::{DEFAULT_MACRO_MARKER, Lexer, Token, TokenWithPos};
use crate::node::RawTagNode;

// ── Options ───────────────────────────────────────────────────────────────

/// Tokenizer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Leading character that marks a macro tag (`<:if>` with the default `:`).
    pub macro_marker: char,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self { macro_marker: DEFAULT_MACRO_MARKER }
    }
}

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
}

/// An element whose closing tag has not been seen yet.
struct OpenFrame {
    node: RawTagNode,
    text: Vec<String>,
}

impl OpenFrame {
    fn finish(mut self) -> RawTagNode {
        self.node.text = self.text.join("\n");
        self.node
    }
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPos>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn advance(&mut self) -> TokenWithPos {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(TokenWithPos {
            token: Token::Eof,
            line: 0,
            col: 0,
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Parse the token stream into the list of top-level nodes.
    pub fn parse_document(&mut self) -> Result<Vec<RawTagNode>, ParseError> {
        let mut roots = Vec::new();
        let mut stack: Vec<OpenFrame> = Vec::new();

        loop {
            let TokenWithPos { token, line, col } = self.advance();
            match token {
                Token::Eof => break,
                Token::Text(text) => match stack.last_mut() {
                    Some(frame) => frame.text.extend(text_lines(&text)),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(ParseError::new(
                            format!("text outside of any tag: {:?}", text.trim()),
                            line,
                            col,
                        ));
                    }
                },
                Token::Open { name, is_macro, attributes, self_closing } => {
                    let node = RawTagNode {
                        name,
                        is_macro,
                        attributes,
                        line,
                        col,
                        ..RawTagNode::default()
                    };
                    if self_closing {
                        push_node(&mut stack, &mut roots, node);
                    } else {
                        stack.push(OpenFrame { node, text: Vec::new() });
                    }
                }
                Token::Close { name, is_macro } => {
                    let Some(frame) = stack.pop() else {
                        return Err(ParseError::new(
                            format!("closing tag </{name}> without a matching opening tag"),
                            line,
                            col,
                        ));
                    };
                    if !frame.node.name.eq_ignore_ascii_case(&name) || frame.node.is_macro != is_macro {
                        return Err(ParseError::new(
                            format!(
                                "closing tag </{name}> does not match <{}> opened at {}:{}",
                                frame.node.name, frame.node.line, frame.node.col
                            ),
                            line,
                            col,
                        ));
                    }
                    push_node(&mut stack, &mut roots, frame.finish());
                }
            }
        }

        if let Some(frame) = stack.pop() {
            return Err(ParseError::new(
                format!("tag <{}> is never closed", frame.node.name),
                frame.node.line,
                frame.node.col,
            ));
        }
        Ok(roots)
    }
}

fn push_node(stack: &mut [OpenFrame], roots: &mut Vec<RawTagNode>, node: RawTagNode) {
    match stack.last_mut() {
        Some(parent) => parent.node.children.push(node),
        None => roots.push(node),
    }
}

fn text_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string)
}

// ── Public parse entry points ─────────────────────────────────────────────

/// Parse `.lml` markup into its top-level nodes using default options.
pub fn parse_str(src: &str) -> Result<Vec<RawTagNode>, ParseError> {
    parse_with(src, MarkupOptions::default())
}

/// Parse `.lml` markup into its top-level nodes.
pub fn parse_with(src: &str, options: MarkupOptions) -> Result<Vec<RawTagNode>, ParseError> {
    let tokens = Lexer::new(src).with_macro_marker(options.macro_marker).tokenize()?;
    Parser::new(tokens).parse_document()
}
