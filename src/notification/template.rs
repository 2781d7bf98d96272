use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Placeholder name -> substituted text
pub type Substitutions = BTreeMap<&'static str, String>;

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, values: &Substitutions) -> String;
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern compiles"))
}

/// Replaces `{key}` markers; unknown keys are left untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceTemplateRenderer;

impl TemplateRenderer for BraceTemplateRenderer {
    fn render(&self, template: &str, values: &Substitutions) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
