//! Record assembly from a rendered detail page.

use super::fields::{classification_codes, person_list, scalar_field};
use crate::model::{BiblioFields, BiblioRecord, DocumentIdentifier, RenderedDocument};
use scraper::Html;
use tracing::debug;

/// Field captions as the detail page prints them. Matching is a
/// case-insensitive substring test, so trailing punctuation is tolerated.
pub mod labels {
    pub const PUBLICATION_NUMBER: &str = "Publication Number";
    pub const PUBLICATION_DATE: &str = "Publication Date";
    pub const APPLICATION_NUMBER: &str = "International Application No";
    pub const FILING_DATE: &str = "International Filing Date";
    pub const TITLE: &str = "Title";
    pub const ABSTRACT: &str = "Abstract";
    pub const PRIORITY_DATA: &str = "Priority Data";
    pub const APPLICANTS: &str = "Applicants";
    pub const INVENTORS: &str = "Inventors";
    pub const AGENTS: &str = "Agents";
    pub const IPC: &str = "IPC";
    pub const CPC: &str = "CPC";
}

/// Read every bibliographic field from a parsed page.
pub fn read_fields(document: &Html) -> BiblioFields {
    BiblioFields {
        publication_number: scalar_field(document, labels::PUBLICATION_NUMBER),
        publication_date: scalar_field(document, labels::PUBLICATION_DATE),
        application_number: scalar_field(document, labels::APPLICATION_NUMBER),
        filing_date: scalar_field(document, labels::FILING_DATE),
        title: scalar_field(document, labels::TITLE),
        abstract_text: scalar_field(document, labels::ABSTRACT),
        applicants: person_list(document, labels::APPLICANTS),
        inventors: person_list(document, labels::INVENTORS),
        agents: person_list(document, labels::AGENTS),
        ipc_codes: classification_codes(document, labels::IPC),
        cpc_codes: classification_codes(document, labels::CPC),
        priority_data: scalar_field(document, labels::PRIORITY_DATA),
    }
}

/// Extract a record from raw page HTML fetched for `identifier`.
pub fn extract_html(html: &str, identifier: &DocumentIdentifier) -> BiblioRecord {
    let document = Html::parse_document(html);
    let record = BiblioRecord::new(identifier.clone(), read_fields(&document));
    if !record.extraction_succeeded {
        debug!(
            identifier = %identifier,
            has_publication_number = record.fields.publication_number.is_some(),
            has_title = record.fields.title.is_some(),
            "partial extraction"
        );
    }
    record
}

/// Extract a record from a rendered document. Never fails: unresolved
/// fields are left empty and `extraction_succeeded` reflects whether the
/// publication number and title both resolved.
pub fn extract(doc: &RenderedDocument) -> BiblioRecord {
    extract_html(doc.html(), doc.identifier())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/detail_WO2019028689.html");

    fn id() -> DocumentIdentifier {
        DocumentIdentifier::parse("WO2019028689").unwrap()
    }

    #[test]
    fn test_extract_full_page() {
        let record = extract(&RenderedDocument::new(id(), FIXTURE.to_string()));
        assert!(record.extraction_succeeded);
        assert_eq!(record.source, "WIPO");

        let f = &record.fields;
        assert_eq!(f.publication_number.as_deref(), Some("WO/2019/028689"));
        assert_eq!(f.publication_date.as_deref(), Some("14.02.2019"));
        assert_eq!(f.application_number.as_deref(), Some("PCT/FI2018/050583"));
        assert_eq!(f.filing_date.as_deref(), Some("09.08.2018"));
        assert_eq!(
            f.title.as_deref(),
            Some("(EN) CRYSTALLINE FORMS OF AN ANDROGEN RECEPTOR ANTAGONIST")
        );
        assert!(f
            .abstract_text
            .as_deref()
            .is_some_and(|a| {
                a.starts_with("(EN) The invention relates to crystalline forms of N-((S)-1-")
            }));
        assert_eq!(f.priority_data.as_deref(), Some("20175729 10.08.2017 FI"));
        assert_eq!(
            f.applicants,
            vec!["ORION CORPORATION", "BAYER PHARMA AKTIENGESELLSCHAFT"]
        );
        assert_eq!(f.inventors, vec!["TÖRMÄKANGAS, Olli", "WIKBERG, Tom"]);
        assert_eq!(f.agents, vec!["BERGGREN OY"]);
    }

    #[test]
    fn test_ipc_and_cpc_are_resolved_independently() {
        let record = extract_html(FIXTURE, &id());
        assert_eq!(
            record.fields.ipc_codes,
            vec!["C07D 231/14", "A61K 31/415", "C07D 231/14"]
        );
        assert_eq!(record.fields.cpc_codes, vec!["C07D 231/14", "A61P 35/00"]);
    }

    #[test]
    fn test_partial_page_keeps_other_fields() {
        let html = r#"<html><body>
            <div class="ps-field"><span class="ps-field--label">Publication Date</span>
            <span class="ps-field--value">14.02.2019</span></div>
            <div class="ps-field"><span class="ps-field--label">Applicants</span>
            <span class="ps-field--value"><ul class="biblio-person-list">
              <li><span class="biblio-person-list--name">ORION CORPORATION</span></li>
            </ul></span></div>
        </body></html>"#;
        let record = extract_html(html, &id());
        assert!(!record.extraction_succeeded);
        assert_eq!(record.fields.publication_date.as_deref(), Some("14.02.2019"));
        assert_eq!(record.fields.applicants, vec!["ORION CORPORATION"]);
        assert_eq!(record.fields.publication_number, None);
        assert_eq!(record.fields.title, None);
    }

    #[test]
    fn test_title_alone_is_not_success() {
        let html = r#"<div class="ps-field"><span class="ps-field--label">Title</span>
            <span class="ps-field--value">Something</span></div>"#;
        let record = extract_html(html, &id());
        assert!(!record.extraction_succeeded);
        assert_eq!(record.fields.title.as_deref(), Some("Something"));
    }

    #[test]
    fn test_unrelated_page_yields_empty_record() {
        let record = extract_html("<html><body><p>Service unavailable</p></body></html>", &id());
        assert!(!record.extraction_succeeded);
        assert_eq!(record.fields, BiblioFields::default());
        assert_eq!(record.identifier, id());
    }

    #[test]
    fn test_no_person_lists_still_succeeds() {
        let html = r#"<html><body>
            <div class="ps-field"><span class="ps-field--label">Publication Number</span>
            <span class="ps-field--value">WO/2019/028689</span></div>
            <div class="ps-field"><span class="ps-field--label">Title</span>
            <span class="ps-field--value">A title</span></div>
        </body></html>"#;
        let record = extract_html(html, &id());
        assert!(record.extraction_succeeded);
        assert!(record.fields.applicants.is_empty());
        assert!(record.fields.inventors.is_empty());
        assert!(record.fields.ipc_codes.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let doc = RenderedDocument::new(id(), FIXTURE.to_string());
        assert_eq!(extract(&doc), extract(&doc));
    }
}
