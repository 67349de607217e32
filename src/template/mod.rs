//! Prompt template rendering via minijinja.
//!
//! Rendering is pure: the same template and bindings always produce the same
//! string. A referenced binding that is absent fails the render rather than
//! substituting a blank, since a malformed prompt is worse than a hard stop.

use std::collections::HashMap;

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while rendering a prompt template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template parse error: {0}")]
    Parse(String),
    #[error("Missing template variable: {0}")]
    MissingVariable(String),
    #[error("Template render error: {0}")]
    Render(String),
}

/// Stateless template renderer. Supports variable substitution, conditionals
/// and loops; undefined variables are a hard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    /// Render `template` against `bindings`.
    pub fn render(
        &self,
        template: &str,
        bindings: &HashMap<String, Value>,
    ) -> Result<String, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template("tpl", template)
            .map_err(|e| TemplateError::Parse(e.to_string()))?;
        let tmpl = env
            .get_template("tpl")
            .map_err(|e| TemplateError::Parse(e.to_string()))?;

        // Name the missing binding up front; the strict renderer alone only
        // reports an undefined value at its use site.
        let mut missing: Vec<String> = tmpl
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| !bindings.contains_key(name))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(TemplateError::MissingVariable(missing.join(", ")));
        }

        let ctx = minijinja::Value::from_serialize(bindings);
        tmpl.render(ctx).map_err(|e| match e.kind() {
            minijinja::ErrorKind::UndefinedError => TemplateError::MissingVariable(e.to_string()),
            _ => TemplateError::Render(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_simple() {
        let renderer = Renderer::new();
        let vars = bindings(&[("text", json!("hello world"))]);
        let result = renderer.render("Summarize: {{ text }}", &vars).unwrap();
        assert_eq!(result, "Summarize: hello world");
    }

    #[test]
    fn test_render_with_loop() {
        let renderer = Renderer::new();
        let vars = bindings(&[("domains", json!(["a.com", "b.com"]))]);
        let result = renderer
            .render("{% for d in domains %}{{ d }};{% endfor %}", &vars)
            .unwrap();
        assert_eq!(result, "a.com;b.com;");
    }

    #[test]
    fn test_render_with_conditional() {
        let renderer = Renderer::new();
        let vars = bindings(&[("verbose", json!(false)), ("text", json!("x"))]);
        let result = renderer
            .render("{% if verbose %}long {{ text }}{% else %}short{% endif %}", &vars)
            .unwrap();
        assert_eq!(result, "short");
    }

    #[test]
    fn test_render_missing_variable_fails_fast() {
        let renderer = Renderer::new();
        let err = renderer
            .render("Summarize: {{ text }}", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable(ref name) if name == "text"));
    }

    #[test]
    fn test_render_missing_variables_named_sorted() {
        let renderer = Renderer::new();
        let err = renderer
            .render("{{ b }} {{ a }}", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::MissingVariable(ref names) if names == "a, b"));
    }

    #[test]
    fn test_render_parse_error() {
        let renderer = Renderer::new();
        let err = renderer.render("{{ unclosed", &HashMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn test_render_deterministic() {
        let renderer = Renderer::new();
        let vars = bindings(&[
            ("time_window", json!("past month")),
            ("domains", json!(["producthunt.com"])),
        ]);
        let template =
            "Search {% for d in domains %}{{ d }} {% endfor %}within the {{ time_window }}.";
        let first = renderer.render(template, &vars).unwrap();
        let second = renderer.render(template, &vars).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_nested_object_access() {
        let renderer = Renderer::new();
        let vars = bindings(&[("product", json!({ "name": "Widget", "upvotes": 12 }))]);
        let result = renderer
            .render("{{ product.name }} ({{ product.upvotes }})", &vars)
            .unwrap();
        assert_eq!(result, "Widget (12)");
    }

    #[test]
    fn test_render_empty_template() {
        let renderer = Renderer::new();
        assert_eq!(renderer.render("", &HashMap::new()).unwrap(), "");
    }

    #[test]
    fn test_render_no_variables() {
        let renderer = Renderer::new();
        let result = renderer.render("static prompt", &HashMap::new()).unwrap();
        assert_eq!(result, "static prompt");
    }
}
