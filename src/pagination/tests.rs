//! Tests for the pagination module

use super::*;
use crate::config::{Config, SignalKey};
use crate::error::Error;
use crate::http::PageRequest;
use crate::response::Dot;
use serde_json::json;
use test_case::test_case;
use url::Url;

fn config() -> Config {
    Config {
        items_path: Dot::new("data.*"),
        page_name: "page".into(),
        first_page: 1,
        page_in_path: None,
        total_pages_key: None,
        total_items_key: None,
        cursor_key: None,
        last_page_key: None,
        offset_key: None,
        has_link_header: false,
        custom: None,
        per_page: None,
        per_page_key: None,
        first_page_items: None,
        concurrency: 3,
        attempts: 3,
        backoff: None,
        rate_limits: Vec::new(),
    }
}

fn pager_with(configure: impl FnOnce(&mut Config), items_per_page: usize) -> Pager {
    let mut config = config();
    configure(&mut config);
    Pager::new(&config, items_per_page)
}

fn template() -> PageRequest {
    PageRequest::get(Url::parse("https://example.com/api/v1/users?embed=profile").unwrap())
}

// ============================================================================
// Strategy Matcher Tests
// ============================================================================

#[test_case(|config: &mut Config| config.total_pages_key = Some("meta.total_pages".into()) => Strategy::TotalPagesAware; "total pages")]
#[test_case(|config: &mut Config| config.total_items_key = Some("meta.total_items".into()) => Strategy::TotalItemsAware; "total items")]
#[test_case(|config: &mut Config| config.last_page_key = Some("meta.last_page".into()) => Strategy::LastPageAware; "last page")]
#[test_case(|config: &mut Config| config.cursor_key = Some("meta.cursor".into()) => Strategy::CursorAware; "cursor")]
#[test_case(|config: &mut Config| config.has_link_header = true => Strategy::LinkHeaderAware; "link header")]
fn matcher_selects_by_signal(configure: fn(&mut Config)) -> Strategy {
    let mut config = config();
    configure(&mut config);
    Strategy::select(&config).unwrap()
}

#[test]
fn matcher_prefers_last_page_over_length_signals() {
    let mut config = config();
    config.total_pages_key = Some("meta.total_pages".into());
    config.total_items_key = Some("meta.total_items".into());
    config.last_page_key = Some("meta.last_page".into());

    assert_eq!(Strategy::select(&config).unwrap(), Strategy::LastPageAware);
}

#[test]
fn matcher_prefers_total_items_over_total_pages() {
    let mut config = config();
    config.total_pages_key = Some("meta.total_pages".into());
    config.total_items_key = Some("meta.total_items".into());

    assert_eq!(Strategy::select(&config).unwrap(), Strategy::TotalItemsAware);
}

#[test]
fn matcher_cursor_requires_no_length_signal() {
    let mut config = config();
    config.cursor_key = Some("meta.cursor".into());
    config.total_pages_key = Some("meta.total_pages".into());

    assert_eq!(Strategy::select(&config).unwrap(), Strategy::TotalPagesAware);
}

#[test]
fn matcher_fails_without_signals() {
    let error = Strategy::select(&config()).unwrap_err();

    match error {
        Error::UnsupportedPagination { config } => {
            assert_eq!(config.page_name, "page");
        }
        other => panic!("expected UnsupportedPagination, got {other:?}"),
    }
}

#[test]
fn matcher_is_idempotent() {
    let mut config = config();
    config.total_pages_key = Some("meta.total_pages".into());

    let first = Strategy::select(&config).unwrap();
    for _ in 0..10 {
        assert_eq!(Strategy::select(&config).unwrap(), first);
    }
}

// ============================================================================
// Page Token Tests
// ============================================================================

#[test]
fn token_of_numbers_and_numeric_strings() {
    let pager = pager_with(|_| {}, 0);

    assert_eq!(pager.token_of(&json!(3), true), Some(PageToken::Number(3)));
    assert_eq!(pager.token_of(&json!("14"), true), Some(PageToken::Number(14)));
    assert_eq!(pager.token_of(&json!(null), true), None);
    assert_eq!(pager.token_of(&json!(""), true), None);
}

#[test]
fn token_of_opaque_strings_depends_on_mode() {
    let pager = pager_with(|_| {}, 0);

    assert_eq!(pager.token_of(&json!("cursor1"), true), None);
    assert_eq!(
        pager.token_of(&json!("cursor1"), false),
        Some(PageToken::Cursor("cursor1".into()))
    );
}

#[test]
fn token_embedded_in_url_query() {
    let pager = pager_with(|_| {}, 0);
    let value = json!("https://example.com/api/v1/users?page=7");

    assert_eq!(pager.token_of(&value, true), Some(PageToken::Number(7)));
}

#[test]
fn cursor_embedded_in_url_query() {
    let pager = pager_with(|_| {}, 0);
    let value = json!("https://example.com/api/v1/users?page=cursor2");

    assert_eq!(
        pager.token_of(&value, false),
        Some(PageToken::Cursor("cursor2".into()))
    );
}

#[test]
fn token_embedded_in_url_path() {
    let pager = pager_with(
        |config| config.page_in_path = Some(regex::Regex::new(r"/page/(\d+)").unwrap()),
        0,
    );
    let value = json!("https://example.com/api/v1/users/page/12");

    assert_eq!(pager.token_of(&value, true), Some(PageToken::Number(12)));
}

#[test]
fn token_missing_from_url_is_none() {
    let pager = pager_with(|_| {}, 0);
    let value = json!("https://example.com/api/v1/users?cursor=abc");

    assert_eq!(pager.token_of(&value, true), None);
}

// ============================================================================
// Request Rewriting Tests
// ============================================================================

#[test]
fn request_for_sets_page_parameter_preserving_others() {
    let pager = pager_with(|_| {}, 0);
    let request = pager
        .request_for(&template(), &PageToken::Number(2))
        .unwrap();

    assert_eq!(
        request.url.as_str(),
        "https://example.com/api/v1/users?embed=profile&page=2"
    );
}

#[test]
fn request_for_replaces_existing_page_parameter() {
    let pager = pager_with(|_| {}, 0);
    let template = PageRequest::get(Url::parse("https://example.com/api/v1/users?page=1").unwrap());

    let request = pager.request_for(&template, &PageToken::Number(3)).unwrap();
    assert_eq!(request.url.as_str(), "https://example.com/api/v1/users?page=3");
}

#[test]
fn request_for_writes_cursor_tokens() {
    let pager = pager_with(|_| {}, 0);
    let request = pager
        .request_for(&template(), &PageToken::Cursor("cursor1".into()))
        .unwrap();

    assert!(request.url.as_str().ends_with("page=cursor1"));
}

#[test]
fn request_for_offset_multiplies_items_per_page() {
    let pager = pager_with(
        |config| {
            config.offset_key = Some("offset".into());
            config.first_page = 0;
        },
        5,
    );

    let request = pager.request_for(&template(), &PageToken::Number(2)).unwrap();
    assert!(request.url.as_str().contains("offset=10"));

    let request = pager.request_for(&template(), &PageToken::Number(1)).unwrap();
    assert!(request.url.as_str().contains("offset=5"));
}

#[test]
fn request_for_splices_page_into_path() {
    let pager = pager_with(
        |config| config.page_in_path = Some(regex::Regex::new(r"/page/(\d+)").unwrap()),
        0,
    );
    let template =
        PageRequest::get(Url::parse("https://example.com/api/v1/users/page/1").unwrap());

    let request = pager.request_for(&template, &PageToken::Number(4)).unwrap();
    assert_eq!(request.url.path(), "/api/v1/users/page/4");
}

#[test]
fn request_for_unmatched_path_pattern_fails() {
    let pager = pager_with(
        |config| config.page_in_path = Some(regex::Regex::new(r"/page/(\d+)").unwrap()),
        0,
    );

    let error = pager
        .request_for(&template(), &PageToken::Number(4))
        .unwrap_err();
    assert!(matches!(error, Error::InvalidPageInPath { .. }));
}

#[test]
fn request_for_stamps_per_page_override() {
    let pager = pager_with(
        |config| {
            config.per_page = Some(50);
            config.per_page_key = Some("per_page".into());
        },
        50,
    );

    let request = pager.request_for(&template(), &PageToken::Number(2)).unwrap();
    assert!(request.url.as_str().contains("per_page=50"));
}

// ============================================================================
// Link Header Tests
// ============================================================================

#[test]
fn link_header_parses_rel_uris() {
    let links = parse_link_header(
        "<https://example.com/api/v1/users?page=2>; rel=\"next\", <https://example.com/api/v1/users?page=9>; rel=\"last\"",
    );

    assert_eq!(
        links.get("next").map(String::as_str),
        Some("https://example.com/api/v1/users?page=2")
    );
    assert_eq!(
        links.get("last").map(String::as_str),
        Some("https://example.com/api/v1/users?page=9")
    );
}

#[test]
fn link_header_tolerates_spacing() {
    let links = parse_link_header("< https://example.com?page=2 >;rel=\" next \"");
    assert!(links.contains_key("next"));
}

#[test]
fn link_header_empty_is_empty() {
    assert!(parse_link_header("").is_empty());
}

// ============================================================================
// Signal Key Tests
// ============================================================================

#[test]
fn signal_keys_accept_callbacks() {
    let mut config = config();
    config.total_pages_key = Some(SignalKey::callback(|response| {
        response.json().ok()?.pointer("/meta/pages").cloned()
    }));

    assert_eq!(Strategy::select(&config).unwrap(), Strategy::TotalPagesAware);
}
