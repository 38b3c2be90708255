//! Label-anchored field resolution.
//!
//! The detail page lays out each bibliographic field as a caption and a
//! value inside a shared container:
//!
//! ```html
//! <div class="ps-field ps-biblio-field">
//!     <span class="ps-field--label">Publication Number</span>
//!     <span class="ps-field--value">WO/2019/028689</span>
//! </div>
//! ```
//!
//! Fields are found by caption text (case-insensitive substring match), not
//! by position or ids, then read through the label → container → value
//! pivot. Any missing step yields an absent value for that field only.

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Role classes in the target markup.
const LABEL_CLASS: &str = "ps-field--label";
const CONTAINER_CLASS: &str = "ps-field";
const VALUE_CLASS: &str = "ps-field--value";

struct Selectors {
    label: Selector,
    value: Selector,
    person_list: Selector,
    person_entry: Selector,
    person_name: Selector,
    classification: Selector,
    link: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("static selector is valid");
        Selectors {
            label: parse(&format!(".{LABEL_CLASS}")),
            value: parse(&format!(".{VALUE_CLASS}")),
            person_list: parse("ul.biblio-person-list"),
            person_entry: parse("li"),
            person_name: parse(".biblio-person-list--name"),
            classification: parse(".patent-classification"),
            link: parse("a"),
        }
    })
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text content of an element; `None` when empty.
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    let text = normalize_text(&joined);
    (!text.is_empty()).then_some(text)
}

fn label_pattern(label: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(label))
        .case_insensitive(true)
        .build()
        .ok()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// First label element (in document order) whose text contains `label`.
pub fn find_label<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let pattern = label_pattern(label)?;
    document.select(&selectors().label).find(|el| {
        element_text(*el)
            .map(|text| pattern.is_match(&text))
            .unwrap_or(false)
    })
}

/// Nearest ancestor of `label` carrying the field-container role.
pub fn field_container(label: ElementRef<'_>) -> Option<ElementRef<'_>> {
    label
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| has_class(*el, CONTAINER_CLASS))
}

/// The value element of the field captioned `label`.
pub fn field_value<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let label_el = find_label(document, label)?;
    let container = field_container(label_el)?;
    container.select(&selectors().value).next()
}

/// Resolve a scalar field to its normalized text.
pub fn scalar_field(document: &Html, label: &str) -> Option<String> {
    field_value(document, label).and_then(element_text)
}

/// Resolve a person-list field (applicants, inventors, agents) to the names
/// of its entries. Entries with empty names are skipped.
pub fn person_list(document: &Html, label: &str) -> Vec<String> {
    let Some(value) = field_value(document, label) else {
        return Vec::new();
    };
    let sel = selectors();
    let Some(list) = value.select(&sel.person_list).next() else {
        return Vec::new();
    };
    list.select(&sel.person_entry)
        .filter_map(|entry| entry.select(&sel.person_name).next())
        .filter_map(element_text)
        .collect()
}

/// Resolve a classification field (IPC, CPC) to the link text of each
/// classification entry, in document order. Repeats are kept: the same
/// code can appear under different version years.
pub fn classification_codes(document: &Html, label: &str) -> Vec<String> {
    let Some(label_el) = find_label(document, label) else {
        return Vec::new();
    };
    let Some(container) = field_container(label_el) else {
        return Vec::new();
    };
    let sel = selectors();
    container
        .select(&sel.classification)
        .filter_map(|entry| entry.select(&sel.link).next())
        .filter_map(element_text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a \n\t b   c "), "a b c");
        assert_eq!(normalize_text(" \n "), "");
    }

    #[test]
    fn test_scalar_field_pivot() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">Publication Date</span>
            <span class="ps-field--value"> 14.02.2019 </span></div>
        "#);
        assert_eq!(scalar_field(&d, "Publication Date").as_deref(), Some("14.02.2019"));
    }

    #[test]
    fn test_label_match_is_case_insensitive_substring() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">PRIORITY DATA:</span>
            <span class="ps-field--value">20175729 10.08.2017 FI</span></div>
        "#);
        assert_eq!(
            scalar_field(&d, "Priority Data").as_deref(),
            Some("20175729 10.08.2017 FI")
        );
    }

    #[test]
    fn test_label_text_is_literal_not_regex() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">International Application No</span>
            <span class="ps-field--value">PCT/FI2018/050583</span></div>
        "#);
        // "." must not act as a wildcard.
        assert_eq!(scalar_field(&d, "International Application No."), None);
        assert!(scalar_field(&d, "International Application No").is_some());
    }

    #[test]
    fn test_nested_container_resolves_nearest_ancestor() {
        let d = doc(r#"
            <div class="ps-field outer">
              <span class="ps-field--value">outer value</span>
              <div class="ps-field inner">
                <div class="wrapper"><span class="ps-field--label">Title</span></div>
                <span class="ps-field--value">inner value</span>
              </div>
            </div>
        "#);
        assert_eq!(scalar_field(&d, "Title").as_deref(), Some("inner value"));
    }

    #[test]
    fn test_missing_pieces_are_absent() {
        let no_container = doc(r#"<span class="ps-field--label">Title</span><span class="ps-field--value">x</span>"#);
        assert_eq!(scalar_field(&no_container, "Title"), None);

        let no_value = doc(r#"<div class="ps-field"><span class="ps-field--label">Title</span></div>"#);
        assert_eq!(scalar_field(&no_value, "Title"), None);

        let empty_value = doc(r#"<div class="ps-field"><span class="ps-field--label">Title</span><span class="ps-field--value">  </span></div>"#);
        assert_eq!(scalar_field(&empty_value, "Title"), None);

        assert_eq!(scalar_field(&doc(""), "Title"), None);
    }

    #[test]
    fn test_person_list_skips_empty_names() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">Inventors</span>
            <span class="ps-field--value"><ul class="biblio-person-list">
              <li><span class="biblio-person-list--name">A, B</span></li>
              <li><span class="biblio-person-list--name"> </span></li>
              <li><span class="other">no name</span></li>
              <li><span class="biblio-person-list--name">C, D</span></li>
            </ul></span></div>
        "#);
        assert_eq!(person_list(&d, "Inventors"), vec!["A, B", "C, D"]);
    }

    #[test]
    fn test_person_list_without_list_is_empty() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">Applicants</span>
            <span class="ps-field--value">ORION CORPORATION</span></div>
        "#);
        assert!(person_list(&d, "Applicants").is_empty());
        assert!(person_list(&d, "Inventors").is_empty());
    }

    #[test]
    fn test_classification_codes_keep_order_and_repeats() {
        let d = doc(r#"
            <div class="ps-field"><span class="ps-field--label">IPC</span>
            <span class="ps-field--value">
              <div class="patent-classification"><a href="/c">C07D 231/14</a><span>2006.1</span></div>
              <div class="patent-classification"><span>no link</span></div>
              <div class="patent-classification"><a href="/c">A61K 31/415</a></div>
              <div class="patent-classification"><a href="/c">C07D 231/14</a><span>2023.1</span></div>
            </span></div>
        "#);
        assert_eq!(
            classification_codes(&d, "IPC"),
            vec!["C07D 231/14", "A61K 31/415", "C07D 231/14"]
        );
        assert!(classification_codes(&d, "CPC").is_empty());
    }
}
