//! Marduk LML: builds widget trees from `.lml` markup at runtime.
//!
//! A parse runs in three passes over one document:
//!
//! 1. `marduk-markup` turns text into a tree of raw tags.
//! 2. The [`expand`] pass rewrites that tree: macros (`<:if>`, `<:forEach>`,
//!    `<:import>`, ...) are replaced by their output and `{…}` placeholders
//!    are interpolated.
//! 3. The [`tag`] pass walks the expanded tree depth-first and constructs a
//!    target per tag, resolving every name through the [`syntax`] registry.
//!
//! # Quick start
//!
//! ```rust
//! use marduk_lml::LmlParser;
//!
//! let src = r#"
//!     <table defaultPad="2">
//!         <:forEach item="Apples;Pears">
//!             <label text="{item:index}: {item}" row="true"/>
//!         </:forEach>
//!         <textButton id="buy">Buy</textButton>
//!     </table>
//! "#;
//!
//! let doc = LmlParser::default().parse(src).unwrap();
//! let table = doc.roots[0].table().unwrap();
//! assert_eq!(table.row_count(), 3);
//! assert_eq!(doc.named("buy").unwrap().text.as_deref(), Some("Buy"));
//! ```
//!
//! # Extending the syntax
//!
//! ```rust
//! use std::sync::Arc;
//! use marduk_lml::{LmlParser, LmlSyntax, TargetKey, WidgetKind, attribute};
//!
//! let mut builder = LmlSyntax::default().to_builder();
//! builder.register_attribute(
//!     &["shout"],
//!     attribute(TargetKey::Kind(WidgetKind::Label), |cx, _raw| {
//!         let label = cx.widget()?;
//!         label.text = label.text.take().map(|t| t.to_uppercase());
//!         Ok(())
//!     }),
//! );
//!
//! let parser = LmlParser::new(Arc::new(builder.build()));
//! let doc = parser.parse(r#"<label text="hey" shout="true"/>"#).unwrap();
//! assert_eq!(doc.roots[0].text.as_deref(), Some("HEY"));
//! ```

pub mod action;
pub mod builder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod expr;
pub mod logging;
pub mod parser;
pub mod syntax;
pub mod tag;
pub mod value;
pub mod widget;

pub use action::{Action, Actions};
pub use builder::{ActorBuilder, BuilderFeature};
pub use config::{ParserConfig, Strictness};
pub use error::{LmlError, LmlErrorKind, TagPath};
pub use expand::{Expander, Scope};
pub use logging::{LoggingConfig, init_logging};
pub use parser::{Document, LmlParser, Lookup, TemplateLoader};
pub use syntax::{
    AttributeContext, AttributeProcessor, CellAliases, LmlSyntax, MacroCall, MacroProvider, Resolution,
    SyntaxBuilder, TagProvider, attribute, building_attribute, cell_attribute,
};
pub use value::{Align, Color, Edges, ValueError};
pub use widget::{
    Capabilities, Capability, Cell, CellProps, Content, Listener, ListenerEvent, Target, TargetKey, Widget,
    WidgetKind,
};
