use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static LD_JSON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("static selector")
});

/// Author names declared in JSON-LD metadata, in document order.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();

    for script in document.select(&LD_JSON) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(raw.trim()) {
            collect_authors(&json, &mut authors);
        }
    }

    authors
}

fn collect_authors(node: &Value, authors: &mut Vec<String>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_authors(item, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(author) = obj.get("author") {
                push_names(author, authors);
            }
            if let Some(graph) = obj.get("@graph") {
                collect_authors(graph, authors);
            }
        }
        _ => {}
    }
}

fn push_names(author: &Value, authors: &mut Vec<String>) {
    match author {
        Value::Array(arr) => {
            for entry in arr {
                push_names(entry, authors);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(|n| n.as_str()) {
                push_name(name, authors);
            }
        }
        Value::String(s) => push_name(s, authors),
        _ => {}
    }
}

fn push_name(name: &str, authors: &mut Vec<String>) {
    let name = name.trim();
    if !name.is_empty() && !authors.iter().any(|a| a == name) {
        authors.push(name.to_string());
    }
}
