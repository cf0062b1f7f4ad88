//! Splitting raw attribute and text values into literal runs and `{…}`
//! placeholders.

use crate::error::LmlErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'s> {
    Literal(String),
    /// `{name}`: loop/assign variable or parser argument.
    Var(&'s str),
    /// `{@key}`
    Translation(&'s str),
    /// `{$action}`
    Action(&'s str),
    /// `{=expr}`
    Expr(&'s str),
}

/// Whether `raw` needs interpolating at all.
pub(crate) fn has_placeholders(raw: &str) -> bool {
    raw.contains('{')
}

pub(crate) fn segments(raw: &str) -> Result<Vec<Segment<'_>>, LmlErrorKind> {
    let mut out = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(pos) = rest.find(['{', '\\']) {
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("\\{") {
            literal.push('{');
            rest = after;
            continue;
        }
        if tail.starts_with('\\') {
            literal.push('\\');
            rest = &tail[1..];
            continue;
        }

        let Some(end) = tail.find('}') else {
            return Err(LmlErrorKind::interpolation(tail, "unterminated `{`"));
        };
        let inner = tail[1..end].trim();
        if inner.is_empty() {
            return Err(LmlErrorKind::interpolation(&tail[..=end], "empty placeholder"));
        }
        if !literal.is_empty() {
            out.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        out.push(match inner.as_bytes()[0] {
            b'@' => Segment::Translation(inner[1..].trim()),
            b'$' => Segment::Action(inner[1..].trim()),
            b'=' => Segment::Expr(inner[1..].trim()),
            _ => Segment::Var(inner),
        });
        rest = &tail[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        out.push(Segment::Literal(literal));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mixed_segments() {
        assert_eq!(
            segments("Hi {name}, {@greeting} {$now} {= 1 + 2}!").unwrap(),
            vec![
                Segment::Literal("Hi ".into()),
                Segment::Var("name"),
                Segment::Literal(", ".into()),
                Segment::Translation("greeting"),
                Segment::Literal(" ".into()),
                Segment::Action("now"),
                Segment::Literal(" ".into()),
                Segment::Expr("1 + 2"),
                Segment::Literal("!".into()),
            ]
        );
    }

    #[test]
    fn escaped_brace_is_literal() {
        assert_eq!(segments(r"a \{b} c").unwrap(), vec![Segment::Literal("a {b} c".into())]);
        assert_eq!(segments(r"C:\path").unwrap(), vec![Segment::Literal(r"C:\path".into())]);
    }

    #[test]
    fn unterminated_and_empty() {
        assert!(matches!(segments("oops {name"), Err(LmlErrorKind::Interpolation { .. })));
        assert!(matches!(segments("{ }"), Err(LmlErrorKind::Interpolation { .. })));
    }

    #[test]
    fn loop_index_names_pass_through() {
        assert_eq!(segments("{item:index}").unwrap(), vec![Segment::Var("item:index")]);
    }
}
