use crate::error::ParseError;
use crate::node::Attribute;

/// Default character that marks a macro tag: `<:if test="...">`.
pub const DEFAULT_MACRO_MARKER: char = ':';

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name a="b">` or `<name a="b"/>`.
    Open {
        name: String,
        is_macro: bool,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    /// `</name>`.
    Close { name: String, is_macro: bool },
    /// Raw text between tags, entities already decoded.
    Text(String),
    // Sentinel
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithPos {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
    macro_marker: char,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1, macro_marker: DEFAULT_MACRO_MARKER }
    }

    pub fn with_macro_marker(mut self, marker: char) -> Self {
        self.macro_marker = marker;
        self
    }

    pub fn tokenize(mut self) -> Result<Vec<TokenWithPos>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let (line, col) = (self.line, self.col);
            let token = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push(TokenWithPos { token, line, col });
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.line, self.col)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    /// Skips everything up to and including `end`.
    fn skip_past(&mut self, end: &str, what: &str) -> Result<(), ParseError> {
        let (line, col) = (self.line, self.col);
        loop {
            if self.rest().starts_with(end) {
                self.advance_by(end.chars().count());
                return Ok(());
            }
            if self.advance().is_none() {
                return Err(ParseError::new(format!("unterminated {what}"), line, col));
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Ok(Token::Eof);
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>", "processing instruction")?;
            } else if rest.starts_with("</") {
                return self.lex_close_tag();
            } else if rest.starts_with('<') {
                return self.lex_open_tag();
            } else {
                return Ok(self.lex_text());
            }
        }
    }

    fn lex_text(&mut self) -> Token {
        let start = self.pos;
        while !matches!(self.peek(), None | Some('<')) {
            self.advance();
        }
        Token::Text(decode_entities(&self.src[start..self.pos]))
    }

    /// Consumes the optional macro marker and the tag name.
    fn lex_tag_name(&mut self) -> Result<(String, bool), ParseError> {
        let is_macro = self.peek() == Some(self.macro_marker);
        if is_macro {
            self.advance();
        }
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.err("expected a tag name"));
        }
        Ok((self.src[start..self.pos].to_string(), is_macro))
    }

    fn lex_close_tag(&mut self) -> Result<Token, ParseError> {
        self.advance_by(2); // consume `</`
        let (name, is_macro) = self.lex_tag_name()?;
        self.skip_whitespace();
        match self.advance() {
            Some('>') => Ok(Token::Close { name, is_macro }),
            other => Err(self.err(format!("expected '>' to close </{name}, got {other:?}"))),
        }
    }

    fn lex_open_tag(&mut self) -> Result<Token, ParseError> {
        self.advance(); // consume `<`
        let (name, is_macro) = self.lex_tag_name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.err(format!("unterminated tag <{name}"))),
                Some('>') => {
                    self.advance();
                    return Ok(Token::Open { name, is_macro, attributes, self_closing: false });
                }
                Some('/') => {
                    self.advance();
                    if self.advance() != Some('>') {
                        return Err(self.err(format!("expected '>' after '/' in <{name}")));
                    }
                    return Ok(Token::Open { name, is_macro, attributes, self_closing: true });
                }
                Some(_) => attributes.push(self.lex_attribute()?),
            }
        }
    }

    fn lex_attribute(&mut self) -> Result<Attribute, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_attribute_name_char(c)) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.err(format!("unexpected character {:?} in tag", self.peek())));
        }
        let name = self.src[start..self.pos].to_string();

        self.skip_whitespace();
        if self.peek() != Some('=') {
            // `<checkBox checked/>` reads as `checked="true"`.
            return Ok(Attribute { name, value: "true".to_string() });
        }
        self.advance(); // consume `=`
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let (line, col) = (self.line, self.col);
                self.advance();
                let start = self.pos;
                loop {
                    match self.peek() {
                        None => {
                            return Err(ParseError::new(
                                format!("unterminated value for attribute {name:?}"),
                                line,
                                col,
                            ));
                        }
                        Some(c) if c == quote => break,
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
                let raw = &self.src[start..self.pos];
                self.advance(); // closing quote
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != '>')
                    && !self.rest().starts_with("/>")
                {
                    self.advance();
                }
                if start == self.pos {
                    return Err(self.err(format!("missing value for attribute {name:?}")));
                }
                decode_entities(&self.src[start..self.pos])
            }
        };
        Ok(Attribute { name, value })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn is_attribute_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '<')
}

// ── Entities ──────────────────────────────────────────────────────────────

/// Decodes the five XML entities plus numeric references. Unknown entities
/// are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn open_tag_with_attributes() {
        assert_eq!(
            tokens(r#"<label text="Hi" wrap/>"#),
            vec![
                Token::Open {
                    name: "label".into(),
                    is_macro: false,
                    attributes: vec![Attribute::new("text", "Hi"), Attribute::new("wrap", "true")],
                    self_closing: true,
                },
                Token::Eof,
            ]
        );
    }

    #[test]
    fn macro_marker_is_stripped() {
        let toks = tokens("<:if test='x'></:if>");
        assert!(matches!(&toks[0], Token::Open { name, is_macro: true, .. } if name == "if"));
        assert!(matches!(&toks[1], Token::Close { name, is_macro: true } if name == "if"));
    }

    #[test]
    fn custom_marker() {
        let toks = Lexer::new("<@loop/>").with_macro_marker('@').tokenize().unwrap();
        assert!(matches!(&toks[0].token, Token::Open { is_macro: true, .. }));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(tokens("<!-- <label/> -->"), vec![Token::Eof]);
    }

    #[test]
    fn unquoted_value() {
        let toks = tokens("<slider max=10/>");
        assert!(matches!(&toks[0], Token::Open { attributes, .. } if attributes[0].value == "10"));
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("a &lt;b&gt; &amp; &#65;&#x42; &bogus;"), "a <b> & AB &bogus;");
    }

    #[test]
    fn positions_track_lines() {
        let toks = Lexer::new("<table>\n  <label/>\n</table>").tokenize().unwrap();
        let label = toks.iter().find(|t| matches!(&t.token, Token::Open { name, .. } if name == "label")).unwrap();
        assert_eq!((label.line, label.col), (2, 3));
    }

    #[test]
    fn err_unterminated_value() {
        assert!(Lexer::new(r#"<label text="oops/>"#).tokenize().is_err());
    }

    #[test]
    fn err_unterminated_comment() {
        assert!(Lexer::new("<!-- forever").tokenize().is_err());
    }
}
