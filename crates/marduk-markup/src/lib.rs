//! Tokenizer and raw tag tree for the **Marduk layout markup** (`.lml`).
//!
//! This crate only knows the shape of the markup. Deciding what a tag or
//! attribute *means* (widgets, macros, values) is the job of `marduk-lml`.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`node`] | `RawTagNode`, `Attribute` |
//! | [`error`] | `ParseError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`parser`] | `parse_str` / `parse_with` entry points |
//!
//! # Quick start
//!
//! ```rust
//! use marduk_markup::parse_str;
//!
//! let src = r#"
//!     <table pad="4">
//!         <:forEach item="a;b"><label text="{item}"/></:forEach>
//!     </table>
//! "#;
//!
//! let roots = parse_str(src).unwrap();
//! assert_eq!(roots[0].name, "table");
//! assert!(roots[0].children[0].is_macro);
//! ```

pub mod error;
pub mod lexer;
pub mod node;
pub mod parser;

pub use error::ParseError;
pub use node::{Attribute, RawTagNode};
pub use parser::{MarkupOptions, parse_str, parse_with};

#[cfg(test)]
mod parse_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(src: &str) -> Vec<RawTagNode> { parse_str(src).unwrap() }
    fn err(src: &str) -> ParseError { parse_str(src).unwrap_err() }

    #[test] fn empty_document() { assert!(ok("").is_empty()); }
    #[test] fn self_closing() { assert_eq!(ok("<label/>")[0].name, "label"); }
    #[test] fn several_roots() { assert_eq!(ok("<label/><image/>").len(), 2); }
    #[test] fn comment_between_tags() { assert_eq!(ok("<table><!-- x --><label/></table>")[0].children.len(), 1); }
    #[test] fn xml_prolog() { ok(r#"<?xml version="1.0"?><table/>"#); }

    #[test]
    fn nested_tree() {
        let roots = ok(r#"
            <window title="Main">
                <table>
                    <label text="A"/>
                    <textButton>Press</textButton>
                </table>
            </window>
        "#);
        let table = &roots[0].children[0];
        assert_eq!(table.name, "table");
        assert_eq!(table.children.len(), 2);
        assert_eq!(table.children[1].text, "Press");
    }

    #[test]
    fn inner_text_lines_are_trimmed() {
        let roots = ok("<table>\n   first line  \n\n  <label/>  second\n</table>");
        assert_eq!(roots[0].text, "first line\nsecond");
    }

    #[test]
    fn attribute_order_is_kept() {
        let roots = ok(r#"<label b="2" a="1" c="3"/>"#);
        let names: Vec<_> = roots[0].attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn macro_nodes() {
        let roots = ok(r#"<:if test="true"><label/></:if>"#);
        assert!(roots[0].is_macro);
        assert_eq!(roots[0].name, "if");
        assert_eq!(roots[0].children[0].name, "label");
    }

    #[test]
    fn err_mismatched_close() {
        let e = err("<table>\n<label></table>");
        assert_eq!(e.line, 2);
        assert!(e.message.contains("does not match"));
    }

    #[test] fn close_tag_ignores_case() { assert_eq!(ok("<TextButton>Go</textButton>")[0].text, "Go"); }
    #[test] fn err_macro_closed_as_tag() { err("<:if></if>"); }
    #[test] fn err_unclosed() { assert!(err("<table><label/>").message.contains("never closed")); }
    #[test] fn err_stray_close() { err("</table>"); }
    #[test] fn err_text_at_root() { err("hello <label/>"); }
    #[test] fn err_missing_name() { err("< />"); }
}
