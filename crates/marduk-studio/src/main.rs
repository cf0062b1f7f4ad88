//! Marduk Studio: parses an `.lml` file and prints the widget tree it builds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use marduk_lml::{LmlParser, LmlSyntax, LoggingConfig, ParserConfig, TemplateLoader, Widget, init_logging};

#[derive(Parser)]
#[command(name = "marduk-studio", version, about = "Build a widget tree from .lml markup")]
struct Cli {
    /// Markup file to parse.
    file: Option<PathBuf>,

    /// Argument for `{key}` placeholders, as `key=value`. Repeatable.
    #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    args: Vec<(String, String)>,

    /// Translation for `{@key}` placeholders, as `key=value`. Repeatable.
    #[arg(long = "translation", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    translations: Vec<(String, String)>,

    /// Register a named action that only logs its invocations. Repeatable.
    #[arg(long = "action", value_name = "NAME")]
    actions: Vec<String>,

    /// Warn about unknown tags and attributes instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Maximum macro nesting depth.
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Print the registered tag and macro names and exit.
    #[arg(long)]
    list: bool,

    /// Log filter (`env_logger` syntax); defaults to `RUST_LOG`, then `info`.
    #[arg(long)]
    log: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Resolves `<:import>` paths against the directory of the parsed file.
struct FileTemplates {
    base: PathBuf,
}

impl TemplateLoader for FileTemplates {
    fn load(&self, path: &str) -> Option<String> {
        let candidate = self.base.join(path);
        match std::fs::read_to_string(&candidate) {
            Ok(source) => Some(source),
            Err(e) => {
                log::debug!("template {}: {e}", candidate.display());
                None
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig { env_filter: cli.log.clone(), ..LoggingConfig::default() });

    let syntax = Arc::new(LmlSyntax::default());
    if cli.list {
        println!("tags:   {}", syntax.tag_names().join(", "));
        println!("macros: {}", syntax.macro_names().join(", "));
        return Ok(());
    }

    let Some(file) = cli.file.as_deref() else {
        bail!("no input file (see --help)");
    };
    let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let parser = build_parser(&cli, syntax, file);
    let doc = parser.parse(&source).with_context(|| format!("parsing {}", file.display()))?;

    log::info!("{}: {} root(s), {} widget(s), {} id(s)", file.display(), doc.roots.len(), doc.len(), doc.ids.len());
    print!("{doc}");
    Ok(())
}

fn build_parser(cli: &Cli, syntax: Arc<LmlSyntax>, file: &Path) -> LmlParser {
    let config = if cli.lenient { ParserConfig::lenient() } else { ParserConfig::default() };
    let base = file.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut parser = LmlParser::new(syntax)
        .config(config.max_depth(cli.max_depth))
        .templates(Box::new(FileTemplates { base }));

    for (key, value) in &cli.args {
        parser = parser.argument(key.as_str(), value.as_str());
    }
    for (key, value) in &cli.translations {
        parser = parser.translation(key.as_str(), value.as_str());
    }
    for name in &cli.actions {
        let label = name.clone();
        parser = parser.action(name.as_str(), move |widget: Option<&mut Widget>| {
            match widget {
                Some(widget) => log::info!("action `{label}` on {}", widget.kind()),
                None => log::info!("action `{label}` at macro time"),
            }
            None
        });
    }
    parser
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_arguments() {
        assert_eq!(parse_key_value("name=World"), Ok(("name".into(), "World".into())));
        assert_eq!(parse_key_value("eq=a=b"), Ok(("eq".into(), "a=b".into())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn cli_flags() {
        let cli = Cli::try_parse_from(["marduk-studio", "ui.lml", "--arg", "a=1", "--arg", "b=2", "--lenient"]).unwrap();
        assert_eq!(cli.args.len(), 2);
        assert!(cli.lenient);
        assert_eq!(cli.max_depth, 64);
    }

    #[test]
    fn file_templates_resolve_relative_to_base() {
        let dir = std::env::temp_dir().join(format!("marduk-studio-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("row.lml"), "<label text=\"row\"/>").unwrap();

        let loader = FileTemplates { base: dir.clone() };
        assert!(loader.load("row.lml").is_some());
        assert!(loader.load("missing.lml").is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
