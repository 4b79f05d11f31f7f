use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use super::types::{ContextSpec, HttpMethod, RequestSpec, ResponseSpec, Template};

/// Named templates available to connectors. Adding a backend family is a data change:
/// insert another [`Template`] (for example from the run configuration).
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, Arc<Template>>,
}

impl TemplateLibrary {
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Library preloaded with the dify, ragflow and openai_compatible families.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        library.insert(dify());
        library.insert(ragflow());
        library.insert(openai_compatible());
        library
    }

    /// Adds or replaces a template under its own name.
    pub fn insert(&mut self, template: Template) {
        if self.templates.contains_key(&template.name) {
            log::debug!("Replacing template {}", template.name);
        }
        self.templates
            .insert(template.name.clone(), Arc::new(template));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn bearer_json_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Authorization".to_string(), "Bearer {api_key}".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ])
}

fn dify() -> Template {
    Template {
        name: "dify".to_string(),
        description: "Dify chat application (blocking chat-messages API)".to_string(),
        required: vec!["api_key".to_string(), "base_url".to_string()],
        defaults: BTreeMap::from([("user_id".to_string(), "rag-evaluator".to_string())]),
        request: RequestSpec {
            method: HttpMethod::Post,
            url: "{base_url}/chat-messages".to_string(),
            headers: bearer_json_headers(),
            body: json!({
                "inputs": {},
                "query": "{question}",
                "response_mode": "blocking",
                "user": "{user_id}"
            }),
        },
        response: ResponseSpec {
            answer: "/answer".to_string(),
            contexts: Some(ContextSpec {
                path: "/metadata/retriever_resources".to_string(),
                field: Some("content".to_string()),
            }),
            metadata: BTreeMap::from([
                ("conversation_id".to_string(), "/conversation_id".to_string()),
                ("message_id".to_string(), "/message_id".to_string()),
            ]),
        },
    }
}

fn ragflow() -> Template {
    Template {
        name: "ragflow".to_string(),
        description: "RAGFlow chat assistant completions".to_string(),
        required: vec![
            "api_key".to_string(),
            "base_url".to_string(),
            "chat_id".to_string(),
        ],
        defaults: BTreeMap::new(),
        request: RequestSpec {
            method: HttpMethod::Post,
            url: "{base_url}/api/v1/chats/{chat_id}/completions".to_string(),
            headers: bearer_json_headers(),
            body: json!({
                "question": "{question}",
                "stream": false
            }),
        },
        response: ResponseSpec {
            answer: "/data/answer".to_string(),
            contexts: Some(ContextSpec {
                path: "/data/reference/chunks".to_string(),
                field: Some("content".to_string()),
            }),
            metadata: BTreeMap::from([
                ("session_id".to_string(), "/data/session_id".to_string()),
                ("code".to_string(), "/code".to_string()),
            ]),
        },
    }
}

fn openai_compatible() -> Template {
    Template {
        name: "openai_compatible".to_string(),
        description: "Any OpenAI-compatible chat completions endpoint".to_string(),
        required: vec![
            "api_key".to_string(),
            "base_url".to_string(),
            "model".to_string(),
        ],
        defaults: BTreeMap::new(),
        request: RequestSpec {
            method: HttpMethod::Post,
            url: "{base_url}/chat/completions".to_string(),
            headers: bearer_json_headers(),
            body: json!({
                "model": "{model}",
                "messages": [{"role": "user", "content": "{question}"}],
                "stream": false
            }),
        },
        response: ResponseSpec {
            answer: "/choices/0/message/content".to_string(),
            contexts: None,
            metadata: BTreeMap::from([
                ("model".to_string(), "/model".to_string()),
                ("usage".to_string(), "/usage".to_string()),
            ]),
        },
    }
}
