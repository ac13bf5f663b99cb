//! Integration tests for the catalog queries after a crawl

use crate::common::{card, empty_page, open_service, page, write_config};
use watchwatcher::WatchService;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Crawls a two-page catalog of five watches over three brands
async fn crawled_service() -> (WatchService, MockServer, tempfile::TempDir) {
    let server = MockServer::start().await;

    let pages = [
        page(&[
            card(11, "Rolex", "Submariner", "16610", "£9,000"),
            card(12, "Rolex", "Submariner", "16610", "£7,000"),
            card(13, "Rolex", "Datejust", "16234", "£4,000"),
        ]),
        page(&[
            card(14, "Omega", "Seamaster", "2254.50", "£2,000"),
            card(15, "Tudor", "Pelagos", "25600", "£3,000"),
        ]),
        empty_page(),
    ];

    for (i, body) in pages.into_iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/all-watches"))
            .and(query_param("pageno", (i + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
    }

    let (config, dir) = write_config(&server.uri());
    let service = open_service(&config);
    let report = service.run_crawl(false).await.expect("Crawl task failed");
    assert_eq!(report.persisted, 5);

    (service, server, dir)
}

#[tokio::test]
async fn test_brand_counts_exclude_status_entry() {
    let (service, _server, _dir) = crawled_service().await;

    let brands: Vec<(String, u64)> = service
        .list_brands()
        .unwrap()
        .into_iter()
        .map(|b| (b.brand, b.count))
        .collect();

    assert_eq!(
        brands,
        vec![
            ("Omega".to_string(), 1),
            ("Rolex".to_string(), 3),
            ("Tudor".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn test_series_carry_representative_image() {
    let (service, _server, _dir) = crawled_service().await;

    let series = service.list_series("Rolex").unwrap();
    assert_eq!(series.len(), 2);

    assert_eq!(series[0].series, "Datejust");
    assert_eq!(series[0].count, 1);
    assert_eq!(
        series[0].image_url.as_deref(),
        Some("https://img.example.com/13.jpg")
    );

    assert_eq!(series[1].series, "Submariner");
    assert_eq!(series[1].count, 2);
    assert!(series[1].image_url.is_some());

    assert!(service.list_series("Cartier").unwrap().is_empty());
}

#[tokio::test]
async fn test_items_by_model_sorted_by_price() {
    let (service, _server, _dir) = crawled_service().await;

    let items = service.list_items_by_model("Rolex", "16610").unwrap();
    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["11", "12"]);

    let series = service.list_items_by_series("Tudor", "Pelagos").unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].last_price.price, 3000.0);
}
