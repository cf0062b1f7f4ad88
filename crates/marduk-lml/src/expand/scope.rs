use std::collections::HashMap;

/// Lexical variable scope for macro expansion.
///
/// A child scope sees every binding of its ancestors; its own bindings are
/// dropped with it, so nothing leaks upwards.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    bindings: HashMap<String, String>,
    parent: Option<&'a Scope<'a>>,
}

impl Scope<'static> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> Scope<'a> {
    pub fn child(&self) -> Scope<'_> {
        Scope { bindings: HashMap::new(), parent: Some(self) }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        match self.bindings.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|p| p.get(name)),
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_but_not_the_reverse() {
        let mut root = Scope::new();
        root.bind("a", "1");
        {
            let mut child = root.child();
            child.bind("b", "2");
            assert_eq!(child.get("a"), Some("1"));
            assert_eq!(child.get("b"), Some("2"));
        }
        assert!(!root.is_bound("b"));
    }

    #[test]
    fn shadowing() {
        let mut root = Scope::new();
        root.bind("x", "outer");
        let mut child = root.child();
        child.bind("x", "inner");
        assert_eq!(child.get("x"), Some("inner"));
        assert_eq!(root.get("x"), Some("outer"));
    }
}
