//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to stand in for the catalog site and drive
//! the full crawl end-to-end: pagination, per-record extraction, retry
//! behavior, and the snapshot contract on disk.

use std::path::PathBuf;
use std::time::Duration;

use bookdex::config::{RetryPolicy, Settings};
use bookdex::{BookdexError, Snapshot};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings(base_url: &str, data_path: PathBuf) -> Settings {
    Settings {
        base_url: Url::parse(base_url).unwrap(),
        data_path,
        log_level: "info".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        admin_token: None,
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        },
        detail_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
    }
}

fn listing_html(detail_hrefs: &[&str], next: Option<&str>) -> String {
    let articles: String = detail_hrefs
        .iter()
        .map(|href| {
            format!(r#"<article class="product_pod"><h3><a href="{href}">t</a></h3></article>"#)
        })
        .collect();
    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#))
        .unwrap_or_default();
    format!("<html><body>{articles}{pager}</body></html>")
}

fn detail_html(title: &str) -> String {
    format!(
        r#"<html><body>
            <ul class="breadcrumb">
                <li><a href="/">Home</a></li>
                <li><a href="/books">Books</a></li>
                <li><a href="/books/poetry">Poetry</a></li>
            </ul>
            <div class="thumbnail"><img src="../media/cover.jpg"></div>
            <div class="product_main">
                <h1>{title}</h1>
                <p class="price_color">£53.74</p>
                <p class="star-rating Three"></p>
                <p class="availability">In stock (19 available)</p>
            </div>
        </body></html>"#
    )
}

async fn mount_listing(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, route: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(title)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_three_page_pagination_terminates() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/",
        listing_html(&["b1.html", "b2.html"], Some("page-2.html")),
    )
    .await;
    mount_listing(
        &server,
        "/page-2.html",
        listing_html(&["b3.html", "b4.html"], Some("page-3.html")),
    )
    .await;
    mount_listing(
        &server,
        "/page-3.html",
        listing_html(&["b5.html", "b6.html"], None),
    )
    .await;
    for i in 1..=6 {
        mount_detail(&server, &format!("/b{i}.html"), &format!("Book {i}")).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let count = bookdex::crawler::scrape(settings).await.unwrap();
    assert_eq!(count, 6);

    let snapshot = Snapshot::load(&data_path).unwrap();
    let ids: Vec<u32> = snapshot.books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    let titles: Vec<&str> = snapshot.books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Book 1", "Book 2", "Book 3", "Book 4", "Book 5", "Book 6"]
    );

    // The .expect(1) mocks verify on drop that each page was visited
    // exactly once.
}

#[tokio::test]
async fn test_failing_detail_is_skipped_not_fatal() {
    let server = MockServer::start().await;

    let hrefs: Vec<String> = (1..=10).map(|i| format!("b{i}.html")).collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    mount_listing(&server, "/", listing_html(&href_refs, None)).await;

    for i in 1..=10 {
        if i == 5 {
            Mock::given(method("GET"))
                .and(path("/b5.html"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
        } else {
            mount_detail(&server, &format!("/b{i}.html"), &format!("Book {i}")).await;
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let count = bookdex::crawler::scrape(settings).await.unwrap();
    assert_eq!(count, 9);

    let snapshot = Snapshot::load(&data_path).unwrap();
    let ids: Vec<u32> = snapshot.books.iter().map(|b| b.id).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<u32>>());
    assert!(snapshot.books.iter().all(|b| b.title != "Book 5"));
}

#[tokio::test]
async fn test_first_page_failure_aborts_without_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let err = bookdex::crawler::scrape(settings).await.unwrap_err();
    assert!(matches!(err, BookdexError::FirstPageUnavailable { .. }));
    assert!(!data_path.exists());
}

#[tokio::test]
async fn test_later_page_failure_preserves_partial_results() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        "/",
        listing_html(&["b1.html", "b2.html"], Some("page-2.html")),
    )
    .await;
    mount_detail(&server, "/b1.html", "Book 1").await;
    mount_detail(&server, "/b2.html", "Book 2").await;
    Mock::given(method("GET"))
        .and(path("/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let count = bookdex::crawler::scrape(settings).await.unwrap();
    assert_eq!(count, 2);

    let snapshot = Snapshot::load(&data_path).unwrap();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn test_transient_error_retried_then_succeeds() {
    let server = MockServer::start().await;

    // First two attempts hit a 503, then the real page is served.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_listing(&server, "/", listing_html(&["b1.html"], None)).await;
    mount_detail(&server, "/b1.html", "Book 1").await;

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let count = bookdex::crawler::scrape(settings).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_not_found_detail_is_not_retried() {
    let server = MockServer::start().await;

    mount_listing(&server, "/", listing_html(&["b1.html", "gone.html"], None)).await;
    mount_detail(&server, "/b1.html", "Book 1").await;
    Mock::given(method("GET"))
        .and(path("/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/", server.uri()), data_path.clone());

    let count = bookdex::crawler::scrape(settings).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_records_capture_detail_fields() {
    let server = MockServer::start().await;

    mount_listing(&server, "/catalogue/", listing_html(&["b1.html"], None)).await;
    mount_detail(&server, "/catalogue/b1.html", "A Light in the Attic").await;

    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("books.csv");
    let settings = test_settings(&format!("{}/catalogue/", server.uri()), data_path.clone());

    bookdex::crawler::scrape(settings).await.unwrap();
    let snapshot = Snapshot::load(&data_path).unwrap();
    let book = &snapshot.books[0];

    assert_eq!(book.id, 1);
    assert_eq!(book.title, "A Light in the Attic");
    assert_eq!(book.price, "£53.74");
    assert_eq!(book.price_num(), Some(53.74));
    assert_eq!(book.rating, Some(3));
    assert_eq!(book.availability, "In stock (19 available)");
    assert_eq!(book.category.as_deref(), Some("Poetry"));
    assert_eq!(
        book.image_url.as_deref(),
        Some(format!("{}/media/cover.jpg", server.uri()).as_str())
    );
    assert_eq!(
        book.book_url,
        format!("{}/catalogue/b1.html", server.uri())
    );
}
