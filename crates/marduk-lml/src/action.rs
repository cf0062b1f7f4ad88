use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::LmlErrorKind;
use crate::widget::Widget;

/// A named callback markup can reference as `$name` (or plain `name`).
///
/// Receives the widget the attribute belongs to, or `None` when invoked at
/// macro time. The returned string is what interpolation and `eval` bind.
pub type Action = Arc<dyn Fn(Option<&mut Widget>) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Actions {
    map: HashMap<String, Action>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(Option<&mut Widget>) -> Option<String> + Send + Sync + 'static,
    {
        self.map.insert(name.into(), Arc::new(action));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(strip(name))
    }

    /// Validates a reference and returns the bare action name.
    pub fn resolve<'r>(&self, raw: &'r str) -> Result<&'r str, LmlErrorKind> {
        let name = strip(raw);
        if self.map.contains_key(name) {
            Ok(name)
        } else {
            Err(LmlErrorKind::UnknownAction(name.to_string()))
        }
    }

    pub fn invoke(&self, raw: &str, widget: Option<&mut Widget>) -> Result<Option<String>, LmlErrorKind> {
        let name = strip(raw);
        let action = self.map.get(name).ok_or_else(|| LmlErrorKind::UnknownAction(name.to_string()))?;
        log::trace!("invoking action `{name}`");
        Ok(action(widget))
    }
}

fn strip(raw: &str) -> &str {
    let s = raw.trim();
    s.strip_prefix('$').unwrap_or(s)
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.map.keys().collect();
        names.sort();
        f.debug_struct("Actions").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetKind;

    #[test]
    fn resolves_with_or_without_marker() {
        let mut actions = Actions::new();
        actions.insert("greet", |_| Some("hello".into()));
        assert_eq!(actions.resolve("$greet"), Ok("greet"));
        assert_eq!(actions.resolve(" greet "), Ok("greet"));
        assert_eq!(actions.resolve("$nope"), Err(LmlErrorKind::UnknownAction("nope".into())));
    }

    #[test]
    fn invoke_passes_widget() {
        let mut actions = Actions::new();
        actions.insert("hide", |w: Option<&mut Widget>| {
            if let Some(w) = w {
                w.visible = false;
            }
            None
        });
        let mut label = Widget::new(WidgetKind::Label);
        assert_eq!(actions.invoke("$hide", Some(&mut label)), Ok(None));
        assert!(!label.visible);
    }
}
