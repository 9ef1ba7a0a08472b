use std::cmp::Ordering;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::jsonld;

/// Paragraphs shorter than this are treated as page furniture.
const MIN_PARAGRAPH_CHARS: usize = 25;
/// Paragraphs whose text is mostly links are navigation, not prose.
const MAX_LINK_DENSITY: f64 = 0.5;

/// Elements whose contents never count as article text.
const CHROME_TAGS: [&str; 9] = [
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "figure",
];

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector("meta[property='og:title']"));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| selector("meta[name='author']"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub text: String,
}

pub fn extract_article(html: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);
    ExtractedArticle {
        title: extract_title(&document),
        authors: extract_authors(&document),
        text: extract_text(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let og = document
        .select(&OG_TITLE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(normalize_whitespace)
        .find(|title| !title.is_empty());

    og.or_else(|| first_text(document, &H1))
        .or_else(|| first_text(document, &TITLE))
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = jsonld::extract_authors(document);
    for meta in document.select(&META_AUTHOR) {
        if let Some(name) = meta.value().attr("content").map(str::trim) {
            if !name.is_empty() && !authors.iter().any(|a| a == name) {
                authors.push(name.to_string());
            }
        }
    }
    authors
}

/// Picks the node holding the most paragraph text and returns its
/// paragraphs joined by blank lines.
fn extract_text(document: &Html) -> String {
    let paragraphs: Vec<(ElementRef<'_>, String)> = document
        .select(&PARAGRAPH)
        .filter(|p| !inside_chrome(p))
        .filter_map(|p| {
            let text = normalize_whitespace(&p.text().collect::<String>());
            is_prose(&p, &text).then_some((p, text))
        })
        .collect();

    if paragraphs.is_empty() {
        return String::new();
    }

    // Parent gets the full score, grandparent half. Candidates stay in
    // document order so ties resolve the same way on every call.
    let mut candidates: Vec<(ElementRef<'_>, f64)> = Vec::new();
    for (p, text) in &paragraphs {
        let words = text.split_whitespace().count() as f64;
        let mut ancestors = p.ancestors().filter_map(ElementRef::wrap);
        if let Some(parent) = ancestors.next() {
            credit(&mut candidates, parent, words);
            if let Some(grandparent) = ancestors.next() {
                credit(&mut candidates, grandparent, words / 2.0);
            }
        }
    }

    // Equal scores go to the node covering more paragraphs, then to the
    // earliest one.
    let mut best = None;
    let mut best_key = (f64::MIN, 0);
    for &(node, score) in &candidates {
        let covered = paragraphs_under(&paragraphs, node).count();
        let better = match score.total_cmp(&best_key.0) {
            Ordering::Greater => true,
            Ordering::Equal => covered > best_key.1,
            Ordering::Less => false,
        };
        if better {
            best = Some(node);
            best_key = (score, covered);
        }
    }

    let selected: Vec<&str> = match best {
        Some(best) => paragraphs_under(&paragraphs, best)
            .map(|(_, text)| text.as_str())
            .collect(),
        None => paragraphs.iter().map(|(_, text)| text.as_str()).collect(),
    };

    selected.join("\n\n")
}

fn credit<'a>(candidates: &mut Vec<(ElementRef<'a>, f64)>, node: ElementRef<'a>, score: f64) {
    match candidates.iter_mut().find(|(seen, _)| seen.id() == node.id()) {
        Some((_, total)) => *total += score,
        None => candidates.push((node, score)),
    }
}

fn paragraphs_under<'p, 'a>(
    paragraphs: &'p [(ElementRef<'a>, String)],
    node: ElementRef<'a>,
) -> impl Iterator<Item = &'p (ElementRef<'a>, String)> {
    paragraphs
        .iter()
        .filter(move |(p, _)| p.ancestors().any(|ancestor| ancestor.id() == node.id()))
}

fn inside_chrome(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| CHROME_TAGS.contains(&ancestor.value().name()))
}

fn is_prose(paragraph: &ElementRef<'_>, text: &str) -> bool {
    let chars = text.chars().count();
    if chars < MIN_PARAGRAPH_CHARS {
        return false;
    }
    let link_chars: usize = paragraph
        .select(&LINK)
        .map(|a| normalize_whitespace(&a.text().collect::<String>()).chars().count())
        .sum();
    (link_chars as f64 / chars as f64) <= MAX_LINK_DENSITY
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = r#"
        <html>
          <head>
            <title>Tides explained | Example News</title>
            <meta property="og:title" content="Why the sea rises twice a day">
            <meta name="author" content="Rachel Carson">
          </head>
          <body>
            <nav><p>Home | World | Science | Culture | Sport | Opinion | More</p></nav>
            <div class="sidebar">
              <p>Sign up for our newsletter to get science stories weekly.</p>
            </div>
            <article>
              <h1>Why the sea rises twice a day</h1>
              <div class="body">
                <p>The Moon pulls on the oceans, raising a bulge of water on the side facing it.</p>
                <p>A second bulge forms on the far side, where the Earth is pulled away from the water.</p>
                <p>As the planet turns through both bulges, most coasts see two high tides daily.</p>
                <p><a href="/a">Related story</a> <a href="/b">Another related story link</a></p>
              </div>
            </article>
            <footer><p>Copyright Example News, all rights reserved, since 1901.</p></footer>
          </body>
        </html>
    "#;

    #[test]
    fn picks_the_article_body() {
        let article = extract_article(STORY);
        let paragraphs: Vec<&str> = article.text.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 3);
        assert!(paragraphs[0].starts_with("The Moon pulls on the oceans"));
        assert!(paragraphs[2].ends_with("two high tides daily."));
        assert!(!article.text.contains("newsletter"));
        assert!(!article.text.contains("Copyright"));
        assert!(!article.text.contains("Related story"));
    }

    #[test]
    fn prefers_og_title_then_h1_then_title() {
        assert_eq!(
            extract_article(STORY).title.as_deref(),
            Some("Why the sea rises twice a day")
        );
        let h1_only = "<html><head><title>Site</title></head><body><h1> Headline </h1></body></html>";
        assert_eq!(extract_article(h1_only).title.as_deref(), Some("Headline"));
        let title_only = "<html><head><title>Just a title</title></head><body></body></html>";
        assert_eq!(
            extract_article(title_only).title.as_deref(),
            Some("Just a title")
        );
    }

    #[test]
    fn collects_meta_authors() {
        assert_eq!(extract_article(STORY).authors, vec!["Rachel Carson"]);
    }

    #[test]
    fn whitespace_inside_paragraphs_is_collapsed() {
        let html = "<div><p>  Several   words\n\n spread over   lines of markup here.</p></div>";
        assert_eq!(
            extract_article(html).text,
            "Several words spread over lines of markup here."
        );
    }

    #[test]
    fn equally_scored_siblings_resolve_to_their_common_parent() {
        let html = "<html><body>\
            <div><p>Alpha carries seven words of plain prose.</p></div>\
            <div><p>Bravo carries seven words of plain prose.</p></div>\
            </body></html>";
        let expected = "Alpha carries seven words of plain prose.\n\n\
                        Bravo carries seven words of plain prose.";
        for _ in 0..200 {
            assert_eq!(extract_article(html).text, expected);
        }
    }

    #[test]
    fn page_without_prose_yields_empty_text() {
        let html = "<html><body><div>Only a div.</div><p>Too short.</p></body></html>";
        let article = extract_article(html);
        assert_eq!(article.text, "");
        assert_eq!(article.title, None);
    }
}
