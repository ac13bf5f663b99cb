//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock to serve a paginated catalog and run the full
//! fetch/extract/merge cycle against an on-disk database.

use crate::common::{card, empty_page, open_service, page, write_config};
use watchwatcher::crawler::{FetchError, StopReason};
use watchwatcher::model::{BoxStatus, PapersStatus};
use watchwatcher::storage::{get_item, open_store};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, page_no: &str, status: u16, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/all-watches"))
        .and(query_param("orderby", "PriceHighToLow"))
        .and(query_param("pageno", page_no))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_stops_at_first_empty_page() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[
            card(101, "Rolex", "Submariner", "16610", "£7,250"),
            card(102, "Rolex", "Datejust", "16234", "£4,100"),
        ]),
        1,
    )
    .await;
    mount_page(
        &server,
        "2",
        200,
        page(&[card(103, "Omega", "Seamaster", "2254.50", "£1,995")]),
        1,
    )
    .await;
    mount_page(&server, "3", 200, empty_page(), 1).await;
    mount_page(&server, "4", 200, empty_page(), 0).await;

    let (config, _dir) = write_config(&server.uri());
    let service = open_service(&config);

    let report = service.run_crawl(false).await.expect("Crawl task failed");

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.stop_reason, StopReason::EmptyPage { page: 3 });
    assert_eq!(report.observations.len(), 3);
    assert_eq!(report.persisted, 3);
    assert_eq!(report.failed, 0);

    let store = open_store(&config.storage.resolved_path()).expect("Failed to open DB");
    let item = get_item(&store, "101").unwrap().expect("Item 101 missing");
    assert_eq!(item.last_price.price, 7250.0);
    assert_eq!(item.price_history.len(), 1);
    assert_eq!(item.listing.age, 6);
    assert_eq!(item.listing.box_status, BoxStatus::Yes);
    assert_eq!(item.listing.papers, PapersStatus::No);
    assert_eq!(
        item.listing.detail_url,
        format!("{}/Rolex/Submariner/16610/101", server.uri())
    );
}

#[tokio::test]
async fn test_fetch_failure_truncates_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[card(201, "Tudor", "Black Bay", "79230", "£2,400")]),
        1,
    )
    .await;
    mount_page(&server, "2", 500, "Internal Server Error".to_string(), 1).await;
    mount_page(
        &server,
        "3",
        200,
        page(&[card(203, "Tudor", "Pelagos", "25600", "£3,000")]),
        0,
    )
    .await;

    let (config, _dir) = write_config(&server.uri());
    let service = open_service(&config);

    let report = service.run_crawl(false).await.expect("Crawl task failed");

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.observations.len(), 1);
    assert!(matches!(
        report.stop_reason,
        StopReason::FetchFailed {
            page: 2,
            error: FetchError::Status { status: 500, .. }
        }
    ));

    // Items of pages before the failure are kept
    assert_eq!(service.list_keys().unwrap(), vec!["201", "status"]);
}

#[tokio::test]
async fn test_test_mode_fetches_one_page_and_one_item() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[
            card(301, "Rolex", "Daytona", "116500LN", "£25,000"),
            card(302, "Rolex", "Daytona", "116520", "£18,000"),
        ]),
        1,
    )
    .await;
    mount_page(&server, "2", 200, empty_page(), 0).await;

    let (config, _dir) = write_config(&server.uri());
    let service = open_service(&config);

    let report = service.run_crawl(true).await.expect("Crawl task failed");

    assert_eq!(report.stop_reason, StopReason::TestMode);
    assert_eq!(report.observations.len(), 1);
    assert_eq!(report.observations[0].listing.product_id, 301);
    assert_eq!(service.list_keys().unwrap(), vec!["301", "status"]);
}

#[tokio::test]
async fn test_status_summary_written_on_completion() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[
            card(401, "Omega", "Speedmaster", "3570.50", "£3,100"),
            card(402, "Omega", "Speedmaster", "3570.50", "£2,900"),
        ]),
        1,
    )
    .await;
    mount_page(&server, "2", 200, empty_page(), 1).await;

    let (config, _dir) = write_config(&server.uri());
    let service = open_service(&config);
    assert_eq!(service.get_status().unwrap(), None);

    let report = service.run_crawl(false).await.expect("Crawl task failed");

    let status = service.get_status().unwrap().expect("Status not written");
    assert_eq!(status, report.summary());
    assert!(status.starts_with("2 watches watched at "));
}

#[tokio::test]
async fn test_recrawl_appends_history_only_on_price_change() {
    let first_day = MockServer::start().await;
    mount_page(
        &first_day,
        "1",
        200,
        page(&[
            card(501, "Cartier", "Santos", "W2SA0009", "£5,500"),
            card(502, "Cartier", "Tank", "WSTA0041", "£2,600"),
        ]),
        1,
    )
    .await;
    mount_page(&first_day, "2", 200, empty_page(), 1).await;

    let (config, _dir) = write_config(&first_day.uri());
    open_service(&config)
        .run_crawl(false)
        .await
        .expect("Crawl task failed");

    // Second day: Santos dropped in price, Tank unchanged
    let second_day = MockServer::start().await;
    mount_page(
        &second_day,
        "1",
        200,
        page(&[
            card(501, "Cartier", "Santos", "W2SA0009", "£5,250"),
            card(502, "Cartier", "Tank", "WSTA0041", "£2,600"),
        ]),
        1,
    )
    .await;
    mount_page(&second_day, "2", 200, empty_page(), 1).await;

    let mut moved = config.clone();
    moved.catalog.base_url = second_day.uri();
    open_service(&moved)
        .run_crawl(false)
        .await
        .expect("Crawl task failed");

    let store = open_store(&config.storage.resolved_path()).expect("Failed to open DB");

    let santos = get_item(&store, "501").unwrap().unwrap();
    let prices: Vec<f64> = santos.price_history.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![5500.0, 5250.0]);
    assert_eq!(santos.last_price.price, 5250.0);

    let tank = get_item(&store, "502").unwrap().unwrap();
    assert_eq!(tank.price_history.len(), 1);
    assert!(tank.last_price.observed_at > tank.price_history[0].observed_at);
}
