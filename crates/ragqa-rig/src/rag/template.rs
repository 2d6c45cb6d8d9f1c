//! Prompt templates.

use std::collections::HashMap;

#[cfg(feature = "config")]
use clap::Args;
use ragqa_core::TemplateRenderer;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Namespace of the retrieval-augmented generation prompts.
pub const RAG_NAMESPACE: &str = "rag";

/// Instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = "system_prompt";

/// One block per retrieved document; receives `doc_num` and `chunk_text`.
pub const DOCUMENT_PROMPT: &str = "document_prompt";

/// Closing block; receives `query`.
pub const FOOTER_PROMPT: &str = "footer_prompt";

const EN_SYSTEM_PROMPT: &str = "\
You are an assistant that answers the user's question using the documents provided with it.
Use only the documents that are relevant to the question and ignore the rest.
If the documents do not contain the answer, say that you cannot answer from them.
Reply in the language of the question and keep the answer short and precise.";

const EN_DOCUMENT_PROMPT: &str = "\
## Document No: {doc_num}
### Content: {chunk_text}";

const EN_FOOTER_PROMPT: &str = "\
Answer the question below using only the documents above.
## Question:
{query}

## Answer:";

/// Template language selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct TemplateConfig {
    /// Preferred template language
    #[cfg_attr(
        feature = "config",
        arg(long = "primary-lang", env = "PRIMARY_LANG", default_value = "en")
    )]
    pub primary_lang: String,

    /// Language used when a template is missing in the preferred one
    #[cfg_attr(
        feature = "config",
        arg(long = "default-lang", env = "DEFAULT_LANG", default_value = "en")
    )]
    pub default_lang: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            primary_lang: "en".to_owned(),
            default_lang: "en".to_owned(),
        }
    }
}

impl TemplateConfig {
    /// Creates a registry with the built-in templates.
    pub fn build(&self) -> TemplateRegistry {
        TemplateRegistry::new(&self.primary_lang, &self.default_lang)
    }
}

/// Language-keyed template store with fallback to a default language.
///
/// Placeholders are written `{name}`. Unknown placeholders are left as they
/// are, and substituted values are never rescanned.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    primary_lang: String,
    default_lang: String,
    templates: HashMap<(String, String, String), String>,
}

impl TemplateRegistry {
    /// Creates a registry holding the built-in English templates.
    pub fn new(primary_lang: impl Into<String>, default_lang: impl Into<String>) -> Self {
        Self::empty(primary_lang, default_lang)
            .with_template("en", RAG_NAMESPACE, SYSTEM_PROMPT, EN_SYSTEM_PROMPT)
            .with_template("en", RAG_NAMESPACE, DOCUMENT_PROMPT, EN_DOCUMENT_PROMPT)
            .with_template("en", RAG_NAMESPACE, FOOTER_PROMPT, EN_FOOTER_PROMPT)
    }

    /// Creates a registry without templates.
    pub fn empty(primary_lang: impl Into<String>, default_lang: impl Into<String>) -> Self {
        Self {
            primary_lang: primary_lang.into(),
            default_lang: default_lang.into(),
            templates: HashMap::new(),
        }
    }

    /// Adds or replaces a template.
    pub fn with_template(
        mut self,
        lang: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.insert(lang, namespace, key, text);
        self
    }

    /// Adds or replaces a template.
    pub fn insert(
        &mut self,
        lang: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.templates
            .insert((lang.into(), namespace.into(), key.into()), text.into());
    }

    /// Returns the raw template, preferring the primary language.
    pub fn lookup(&self, namespace: &str, key: &str) -> Option<&str> {
        [&self.primary_lang, &self.default_lang]
            .into_iter()
            .find_map(|lang| {
                self.templates
                    .get(&(lang.clone(), namespace.to_owned(), key.to_owned()))
            })
            .map(String::as_str)
    }
}

impl TemplateRenderer for TemplateRegistry {
    fn render(
        &self,
        namespace: &str,
        key: &str,
        vars: &[(&str, String)],
    ) -> ragqa_core::Result<String> {
        let template = self.lookup(namespace, key).ok_or_else(|| {
            Error::template(format!(
                "no template {namespace}/{key} in '{}' or '{}'",
                self.primary_lang, self.default_lang
            ))
        })?;

        Ok(substitute(template, vars))
    }
}

fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (value, close))
        });

        match value {
            Some((value, close)) => {
                output.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use ragqa_core::ErrorKind;

    use super::*;

    #[test]
    fn test_substitute() {
        let vars = [("a", "1".to_owned()), ("b", "{a}".to_owned())];
        assert_eq!(substitute("x={a}, y={b}", &vars), "x=1, y={a}");
        assert_eq!(substitute("{missing} {a}", &vars), "{missing} 1");
        assert_eq!(substitute("json: {\"k\": {a}}", &vars), "json: {\"k\": 1}");
        assert_eq!(substitute("unterminated {a", &vars), "unterminated {a");
    }

    #[test]
    fn test_builtin_rag_templates() {
        let registry = TemplateRegistry::new("en", "en");
        let doc = registry
            .render(
                RAG_NAMESPACE,
                DOCUMENT_PROMPT,
                &[("doc_num", "2".to_owned()), ("chunk_text", "Body".to_owned())],
            )
            .unwrap();
        assert_eq!(doc, "## Document No: 2\n### Content: Body");

        let footer = registry
            .render(RAG_NAMESPACE, FOOTER_PROMPT, &[("query", "Why?".to_owned())])
            .unwrap();
        assert!(footer.contains("## Question:\nWhy?"));
        assert!(registry.render(RAG_NAMESPACE, SYSTEM_PROMPT, &[]).is_ok());
    }

    #[test]
    fn test_language_fallback() {
        let registry = TemplateRegistry::new("ar", "en")
            .with_template("ar", RAG_NAMESPACE, FOOTER_PROMPT, "السؤال: {query}");

        let footer = registry
            .render(RAG_NAMESPACE, FOOTER_PROMPT, &[("query", "q".to_owned())])
            .unwrap();
        assert_eq!(footer, "السؤال: q");

        let system = registry.lookup(RAG_NAMESPACE, SYSTEM_PROMPT).unwrap();
        assert_eq!(system, EN_SYSTEM_PROMPT);
    }

    #[test]
    fn test_missing_template() {
        let registry = TemplateRegistry::empty("en", "en");
        let err = registry.render(RAG_NAMESPACE, SYSTEM_PROMPT, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Template);
    }
}
