//! Pre-construction state collected from building attributes.

use crate::error::LmlErrorKind;
use crate::widget::Range;

/// Groups of building attributes a tag provider accepts. A provider lists
/// its features in lookup order, so an alias registered under two features
/// (`value`) resolves to the first one the provider names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BuilderFeature {
    /// `style`.
    Base,
    /// Initial text.
    Text,
    /// `min`, `max`, `step`, `value`.
    Range,
    /// `horizontal` / `vertical`.
    Aligned,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeSpec {
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub step: Option<f32>,
    pub value: Option<f32>,
}

/// Values a target needs before it can be created.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorBuilder {
    pub style: String,
    pub text: Option<String>,
    pub vertical: Option<bool>,
    pub range: RangeSpec,
}

impl Default for ActorBuilder {
    fn default() -> Self {
        Self { style: "default".to_string(), text: None, vertical: None, range: RangeSpec::default() }
    }
}

impl ActorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the range spec: `min` 0, `max` 100, `step` 1, `value` = `min`
    /// unless given.
    pub fn range(&self) -> Result<Range, LmlErrorKind> {
        let min = self.range.min.unwrap_or(0.0);
        let max = self.range.max.unwrap_or(100.0);
        let step = self.range.step.unwrap_or(1.0);
        let value = self.range.value.unwrap_or(min);

        if min > max {
            return Err(LmlErrorKind::construction(format!("range min {min} is greater than max {max}")));
        }
        if step <= 0.0 {
            return Err(LmlErrorKind::construction(format!("range step must be positive, got {step}")));
        }
        if !(min..=max).contains(&value) {
            return Err(LmlErrorKind::construction(format!("value {value} is outside {min}..{max}")));
        }
        Ok(Range { min, max, step, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_defaults() {
        let range = ActorBuilder::new().range().unwrap();
        assert_eq!(range, Range { min: 0.0, max: 100.0, step: 1.0, value: 0.0 });
    }

    #[test]
    fn value_defaults_to_min() {
        let mut builder = ActorBuilder::new();
        builder.range.min = Some(5.0);
        assert_eq!(builder.range().unwrap().value, 5.0);
    }

    #[test]
    fn invalid_ranges() {
        let mut builder = ActorBuilder::new();
        builder.range.min = Some(10.0);
        builder.range.max = Some(1.0);
        assert!(matches!(builder.range(), Err(LmlErrorKind::Construction(_))));

        let mut builder = ActorBuilder::new();
        builder.range.step = Some(0.0);
        assert!(builder.range().is_err());

        let mut builder = ActorBuilder::new();
        builder.range.value = Some(101.0);
        assert!(builder.range().is_err());
    }
}
