//! Candidate locators for a free-text target description.
//!
//! The description is classified into a [`Family`] by an ordered rule table
//! (first match wins). Each family emits its templates from most to least
//! specific, so the resolution loop tries the locator least likely to hit the
//! wrong element of the same kind first.

use super::context::anchor_text;
use super::{css_string, xpath_literal, Locator, LOWER_TEXT};
use std::collections::HashSet;

/// Keyword family a target description falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Email,
    Password,
    Tab,
    Button,
    Link,
    Generic,
}

struct Rule {
    family: Family,
    keywords: &'static [&'static str],
    templates: fn(&Description) -> Vec<Locator>,
}

/// Evaluated top to bottom; anything unmatched is [`Family::Generic`].
const RULES: &[Rule] = &[
    Rule {
        family: Family::Email,
        keywords: &["email", "username", "user"],
        templates: email_templates,
    },
    Rule {
        family: Family::Password,
        keywords: &["password", "pass"],
        templates: password_templates,
    },
    Rule {
        family: Family::Tab,
        keywords: &["tab", "nav"],
        templates: tab_templates,
    },
    Rule {
        family: Family::Button,
        keywords: &["button", "submit", "btn", "click"],
        templates: button_templates,
    },
    Rule {
        family: Family::Link,
        keywords: &["link"],
        templates: link_templates,
    },
];

/// Verbs that name what a button does. Preferred over other words when picking
/// the button keyword.
const ACTION_VERBS: &[&str] = &[
    "complete", "delete", "remove", "edit", "update", "save", "submit", "add", "create",
    "cancel", "confirm", "close", "open", "archive", "finish", "start", "login", "logout",
    "next", "apply", "search", "send", "reset", "undo",
];

const BUTTON_NOISE: &[&str] = &[
    "button", "btn", "click", "on", "the", "of", "a", "an", "for", "in", "task", "to", "and",
    "icon",
];

const TAB_NOISE: &[&str] = &[
    "click", "on", "the", "tab", "tabs", "button", "nav", "navigation", "go", "to", "open",
    "select", "switch", "in", "a", "link",
];

const LINK_NOISE: &[&str] = &["link", "click", "on", "the", "a", "follow", "open"];

const STRUCTURAL: &[&str] = &[
    "h1", "h2", "h3", ".metric", ".stat", ".count", ".value", "div", "span", "p",
];

/// The parts of a target description the templates are built from.
struct Description {
    raw: String,
    anchor: Option<String>,
    /// Words outside quotes, original case.
    words: Vec<String>,
}

impl Description {
    fn new(target: &str) -> Self {
        let unquoted = strip_quoted(target);
        let words = unquoted
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: target.trim().to_string(),
            anchor: anchor_text(target),
            words,
        }
    }

    /// First word (lower-cased) that is not noise and is longer than two characters.
    fn first_word(&self, noise: &[&str]) -> Option<String> {
        self.words
            .iter()
            .map(|w| w.to_lowercase())
            .find(|w| w.len() > 2 && !noise.contains(&w.as_str()))
    }

    fn action_keyword(&self) -> Option<String> {
        self.words
            .iter()
            .map(|w| w.to_lowercase())
            .find(|w| ACTION_VERBS.contains(&w.as_str()))
            .or_else(|| self.first_word(BUTTON_NOISE))
    }
}

/// Drop every quoted run, keeping the rest of the text.
fn strip_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut quote: Option<char> = None;
    for c in s.chars() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => {
                quote = None;
                out.push(' ');
            }
            (Some(_), _) => {}
            (None, c) => out.push(c),
        }
    }
    out
}

/// Which family a description belongs to.
pub fn classify(target: &str) -> Family {
    rule_for(&target.to_lowercase())
        .map(|r| r.family)
        .unwrap_or(Family::Generic)
}

fn rule_for(lower: &str) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
}

/// Ordered, de-duplicated candidate locators for `target`.
///
/// Pure and deterministic. Never empty: the generic family always ends with
/// structural tags.
pub fn generate(target: &str) -> Vec<Locator> {
    let desc = Description::new(target);
    let templates = rule_for(&target.to_lowercase())
        .map(|r| r.templates)
        .unwrap_or(generic_templates);
    dedup(templates(&desc))
}

/// Remove repeats, keeping the first occurrence.
pub fn dedup(locators: Vec<Locator>) -> Vec<Locator> {
    let mut seen = HashSet::new();
    locators
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

fn css(s: impl Into<String>) -> Locator {
    Locator::Css(s.into())
}

fn xpath(s: impl Into<String>) -> Locator {
    Locator::XPath(s.into())
}

fn is_css_ident(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct FieldSpec {
    ids: &'static [&'static str],
    names: &'static [&'static str],
    input_type: Option<&'static str>,
    hints: &'static [&'static str],
    classes: &'static [&'static str],
    test_ids: &'static [&'static str],
}

fn field_templates(field: &FieldSpec) -> Vec<Locator> {
    let mut out: Vec<Locator> = field.ids.iter().map(|id| css(format!("#{id}"))).collect();
    out.extend(field.names.iter().map(|n| css(format!("input[name='{n}']"))));
    if let Some(t) = field.input_type {
        out.push(css(format!("input[type='{t}']")));
    }
    out.extend(
        field.hints
            .iter()
            .map(|h| css(format!("input[placeholder*='{h}' i]"))),
    );
    out.extend(
        field.hints
            .iter()
            .map(|h| css(format!("input[aria-label*='{h}' i]"))),
    );
    out.extend(
        field.test_ids
            .iter()
            .map(|t| css(format!("input[data-testid='{t}']"))),
    );
    out.extend(field.classes.iter().map(|c| css(format!(".{c}"))));
    out.push(css("input"));
    out
}

fn email_templates(_: &Description) -> Vec<Locator> {
    let mut out = field_templates(&FieldSpec {
        ids: &["email", "username", "user", "login-email", "user-email"],
        names: &["email", "username", "user"],
        input_type: Some("email"),
        hints: &["email", "username", "user"],
        classes: &["email-input", "login-email", "user-email", "username-input"],
        test_ids: &["email", "username"],
    });
    // plain text inputs are the usual username box; try them before any input at all
    out.insert(out.len() - 1, css("input[type='text']"));
    out
}

fn password_templates(_: &Description) -> Vec<Locator> {
    field_templates(&FieldSpec {
        ids: &["password", "passwd", "pass", "user-password", "login-password"],
        names: &["password", "passwd", "pass"],
        input_type: Some("password"),
        hints: &["password", "pass"],
        classes: &["password-input", "login-password"],
        test_ids: &["password"],
    })
}

fn tab_templates(desc: &Description) -> Vec<Locator> {
    let name = desc.anchor.clone().or_else(|| {
        desc.words
            .iter()
            .find(|w| !TAB_NOISE.contains(&w.to_lowercase().as_str()))
            .cloned()
    });

    let mut out = Vec::new();
    if let Some(name) = name {
        let lower = name.to_lowercase();
        let lit = xpath_literal(&lower);
        let exact = xpath_literal(&name);

        out.push(xpath(format!("//*[@role='tab'][contains({LOWER_TEXT}, {lit})]")));

        out.push(xpath(format!(
            "//a[contains(@class, 'nav-link')][contains(., {exact})]"
        )));
        out.push(xpath(format!(
            "//a[contains(@class, 'nav-link')][contains({LOWER_TEXT}, {lit})]"
        )));
        out.push(xpath(format!(
            "//li[contains(@class, 'nav-item')]//a[contains({LOWER_TEXT}, {lit})]"
        )));
        out.push(xpath(format!(
            "//*[contains(concat(' ', normalize-space(@class), ' '), ' tab ')][contains({LOWER_TEXT}, {lit})]"
        )));

        let slug = lower.split_whitespace().collect::<Vec<_>>().join("-");
        out.push(css(format!("a[href*={}]", css_string(&format!("filter={slug}")))));
        out.push(css(format!("a[href*={}]", css_string(&slug))));

        out.push(xpath(format!("//a[contains({LOWER_TEXT}, {lit})]")));
        out.push(xpath(format!("//button[contains({LOWER_TEXT}, {lit})]")));
        out.push(Locator::Text(name));
    }

    out.extend(
        ["[role='tab']", ".nav-link", ".nav-item a", ".tab", ".tab-button", "a", "button"]
            .into_iter()
            .map(css),
    );
    out
}

fn button_templates(desc: &Description) -> Vec<Locator> {
    let keyword = desc.action_keyword();
    let mut out = Vec::new();

    match (&desc.anchor, keyword) {
        (Some(anchor), Some(kw)) => {
            let a = xpath_literal(anchor);
            let a_lower = xpath_literal(&anchor.to_lowercase());
            let k = xpath_literal(&kw);
            let button_kw = format!("button[contains({LOWER_TEXT}, {k})]");

            // 1. header naming the entity, its container, the button for this action
            for h in ["h1", "h2", "h3", "h4", "h5", "h6"] {
                out.push(xpath(format!(
                    "//{h}[contains(., {a})]/ancestor::div[1]//{button_kw}"
                )));
            }

            // 2. header, enclosing card or row, any button
            out.push(xpath(format!(
                "//h5[contains(., {a})]/ancestor::div[contains(@class, 'card')][1]//button"
            )));
            out.push(xpath(format!(
                "//h5[contains(., {a})]/ancestor::div[contains(@class, 'row')][1]//button"
            )));
            out.push(xpath(format!(
                "//h4[contains(., {a})]/ancestor::div[contains(@class, 'card')][1]//button"
            )));
            out.push(xpath(format!(
                "//h3[contains(., {a})]/ancestor::div[contains(@class, 'card')][1]//button"
            )));
            out.push(xpath(format!(
                "//h5[contains(., {a})]/ancestor::*[self::div or self::li or self::tr][1]//button"
            )));

            // 3. same, ignoring case of the entity name
            for h in ["h5", "h4"] {
                out.push(xpath(format!(
                    "//{h}[contains({LOWER_TEXT}, {a_lower})]/ancestor::div[1]//button"
                )));
            }

            // 4. any container mentioning the entity
            for container in ["div", "li", "tr"] {
                out.push(xpath(format!(
                    "//{container}[contains(., {a})]//{button_kw}"
                )));
            }
            for class in ["card", "task-item", "item"] {
                out.push(xpath(format!(
                    "//*[contains(concat(' ', normalize-space(@class), ' '), ' {class} ')][contains(., {a})]//{button_kw}"
                )));
            }
            for attr in ["data-task-name", "data-item-name", "data-name"] {
                out.push(css(format!("[{attr}={}] button", css_string(anchor))));
            }
            out.push(xpath(format!("//div[contains(., {a})]//button")));
            out.push(xpath(format!("//li[contains(., {a})]//button")));

            // 5. button text alone; matches this action on every row
            out.push(Locator::Text(title_case(&kw)));
            out.push(xpath(format!("//{button_kw}")));

            // 6. guesses from the keyword
            out.extend(keyword_guesses(&kw));

            // 7. anything clickable
            out.extend(
                ["button[type='button']", "button[type='submit']", "button", ".btn"]
                    .into_iter()
                    .map(css),
            );
        }
        (None, Some(kw)) => {
            if is_css_ident(&kw) {
                out.push(css(format!("#{kw}-btn")));
                out.push(css(format!("#{kw}-button")));
                out.push(css(format!("#{kw}")));
            }
            out.push(Locator::Text(title_case(&kw)));
            out.push(xpath(format!(
                "//button[contains({LOWER_TEXT}, {})]",
                xpath_literal(&kw)
            )));
            out.extend(keyword_guesses(&kw));
            out.extend(["button[type='submit']", "button", ".btn"].into_iter().map(css));
        }
        (Some(anchor), None) => {
            let lit = xpath_literal(&anchor.to_lowercase());
            out.push(Locator::Text(anchor.clone()));
            out.push(xpath(format!("//button[contains({LOWER_TEXT}, {lit})]")));
            out.push(xpath(format!("//*[@role='button'][contains({LOWER_TEXT}, {lit})]")));
            out.push(xpath(format!("//a[contains({LOWER_TEXT}, {lit})]")));
            out.extend(["button[type='submit']", "button", ".btn"].into_iter().map(css));
        }
        (None, None) => {
            out.extend(
                [
                    "button[type='submit']",
                    "input[type='submit']",
                    "button",
                    ".btn",
                    ".button",
                    "a[role='button']",
                ]
                .into_iter()
                .map(css),
            );
        }
    }
    out
}

fn keyword_guesses(kw: &str) -> Vec<Locator> {
    let mut out = Vec::new();
    if is_css_ident(kw) {
        out.push(css(format!("button.{kw}")));
        out.push(css(format!(".btn-{kw}")));
    }
    out.push(css(format!("button[data-action={}]", css_string(kw))));
    out.push(css(format!("button[aria-label*={} i]", css_string(kw))));
    out
}

fn link_templates(desc: &Description) -> Vec<Locator> {
    let text = desc.anchor.clone().unwrap_or_else(|| {
        desc.words
            .iter()
            .filter(|w| !LINK_NOISE.contains(&w.to_lowercase().as_str()))
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    });

    let mut out = Vec::new();
    if !text.is_empty() {
        let lower = text.to_lowercase();
        out.push(Locator::Text(text.clone()));
        out.push(xpath(format!(
            "//a[contains({LOWER_TEXT}, {})]",
            xpath_literal(&lower)
        )));
        let slug = lower.split_whitespace().collect::<Vec<_>>().join("-");
        out.push(css(format!("a[href*={}]", css_string(&slug))));
    }
    out.push(css("a"));
    out.push(css(".link"));
    out
}

fn generic_templates(desc: &Description) -> Vec<Locator> {
    let words: Vec<String> = if desc.words.is_empty() {
        desc.anchor
            .as_deref()
            .unwrap_or_default()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect()
    } else {
        desc.words.iter().map(|w| w.to_lowercase()).collect()
    };

    let mut out = Vec::new();
    if !words.is_empty() {
        let hyphen = words.join("-");
        let under = words.join("_");
        let raw = desc.raw.as_str();

        for ident in [&hyphen, &under] {
            if is_css_ident(ident) {
                out.push(css(format!("#{ident}")));
            }
        }
        out.push(css(format!("[name={}]", css_string(raw))));
        out.push(css(format!("[name={}]", css_string(&hyphen))));

        for ident in [&hyphen, &under] {
            if is_css_ident(ident) {
                out.push(css(format!(".{ident}")));
            }
        }
        out.push(css(format!("[class*={}]", css_string(&hyphen))));
        out.push(css(format!("[class*={}]", css_string(&under))));

        out.push(css(format!("[data-testid={}]", css_string(raw))));
        out.push(css(format!("[data-testid*={}]", css_string(&hyphen))));
        out.push(css(format!("[data-id={}]", css_string(&hyphen))));
        out.push(css(format!("[data-name={}]", css_string(raw))));
    }

    out.extend(STRUCTURAL.iter().copied().map(css));
    out
}
