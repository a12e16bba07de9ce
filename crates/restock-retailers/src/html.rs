//! DOM helpers over `scraper`. The parser is lenient with broken markup, so
//! a single parsed document serves every lookup on a page. Entities are
//! decoded by the parser; none of these helpers see raw source text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("valid selector"));
static ITEMPROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemprop]").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Elements whose text never reaches the shopper.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `content` of the first `<meta>` whose `key_attr` equals `key_value`.
#[must_use]
pub fn find_meta_content(doc: &Html, key_attr: &str, key_value: &str) -> Option<String> {
    doc.select(&META).find_map(|meta| {
        let element = meta.value();
        let key = element.attr(key_attr)?;
        if key.trim().eq_ignore_ascii_case(key_value) {
            non_empty(element.attr("content")?)
        } else {
            None
        }
    })
}

/// First `itemprop="{prop}"` value: the `content` attribute when present,
/// then `href`, else the element's text.
#[must_use]
pub fn find_itemprop(doc: &Html, prop: &str) -> Option<String> {
    doc.select(&ITEMPROP)
        .find(|el| {
            el.value()
                .attr("itemprop")
                .is_some_and(|v| v.split_whitespace().any(|p| p.eq_ignore_ascii_case(prop)))
        })
        .and_then(|el| {
            let element = el.value();
            element
                .attr("content")
                .and_then(non_empty)
                .or_else(|| element.attr("href").and_then(non_empty))
                .or_else(|| non_empty(&visible_text(el)))
        })
}

#[must_use]
pub fn page_title(doc: &Html) -> Option<String> {
    let title = doc.select(&TITLE).next()?;
    non_empty(&collapse_whitespace(&title.text().collect::<String>()))
}

/// Text a shopper would see under `scope`: script and style contents
/// skipped, whitespace collapsed.
#[must_use]
pub fn visible_text(scope: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in scope.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse_whitespace(&out)
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// An `<a href>` element: its target, visible text, and `title` or
/// `aria-label` when the text is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
    pub label: Option<String>,
}

/// Every link under `scope`, in document order.
#[must_use]
pub fn anchors(scope: ElementRef<'_>) -> Vec<Anchor> {
    scope
        .select(&LINK)
        .filter_map(|a| {
            let element = a.value();
            let href = non_empty(element.attr("href")?)?;
            let label = element
                .attr("title")
                .and_then(non_empty)
                .or_else(|| element.attr("aria-label").and_then(non_empty));
            Some(Anchor {
                href,
                text: visible_text(a),
                label,
            })
        })
        .collect()
}

/// Resolves `candidate` against `base_url`.
#[must_use]
pub fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let base = reqwest::Url::parse(base_url).ok()?;
    base.join(candidate.trim()).ok().map(|u| u.to_string())
}

/// Canonical form used for de-duplication: no query, fragment or trailing
/// slash, lowercase host.
#[must_use]
pub fn canonical_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .trim_end_matches('/')
            .to_string(),
    }
}
