// Integration tests for the scrape engine, driven by an in-memory fetcher

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use legalscraper::output::{JsonExport, run_inputs};
use legalscraper::{
    CatalogRecord, ConfigBuilder, Gender, PageFetcher, ScrapeEngine, ScrapeError, SiteConfig,
};
use serde_json::Value;

const BASE: &str = "https://www.analvids.com";

#[derive(Default)]
struct MockFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn scene_page(performer_links: &[&str]) -> String {
    let links: String = performer_links
        .iter()
        .map(|href| format!(r#"<a href="{}">performer</a>"#, href))
        .collect();
    format!(
        r#"<html><head><title>Scene XY1234 Highlights - AnalVids</title></head><body>
            <span class="bi-calendar">2023-04-01</span>
            <div class="watch">
                <video data-poster="p.jpg" data-duration="12:34">
                    <source size="720p" src="t.mp4">
                </video>
            </div>
            <a href="{base}/studios/acme">Acme</a>
            <a href="{base}/genre/">All genres</a>
            <a href="{base}/genre/b">B</a>
            <a href="{base}/genre/c">C</a>
            {links}
        </body></html>"#,
        base = BASE,
        links = links
    )
}

fn profile_page(name: &str, gender: Option<&str>) -> String {
    let primary = gender
        .map(|g| {
            format!(
                r#"<div class="text-primary"><a href="{}/models/sex/{}/nationality/czech">{}</a></div>"#,
                BASE, g, g
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{} - AnalVids</title></head><body>{}
            <table><tr><td>Age:</td><td>30</td></tr></table></body></html>"#,
        name, primary
    )
}

fn engine(fetcher: MockFetcher) -> ScrapeEngine<MockFetcher> {
    ScrapeEngine::new(SiteConfig::default(), fetcher).unwrap()
}

#[tokio::test]
async fn test_scrape_direct_url_end_to_end() {
    let scene_url = format!("{}/watch/1/scene", BASE);
    let amy = format!("{}/model/1/amy", BASE);
    let bob = format!("{}/model/2/bob", BASE);
    let cat = format!("{}/model/3/cat", BASE);
    let dee = format!("{}/model/4/dee", BASE);

    let fetcher = MockFetcher::default()
        .with_page(&scene_url, &scene_page(&[&dee, &amy, &cat, &bob]))
        .with_page(&amy, &profile_page("Amy", Some("female")))
        .with_page(&bob, &profile_page("Bob", Some("male")))
        .with_page(&cat, &profile_page("Cat", Some("tx")))
        .with_page(&dee, &profile_page("Dee", None));

    let engine = engine(fetcher);
    let record = engine.scrape(&scene_url).await.unwrap();

    assert_eq!(record.title(), "Scene XY1234 Highlights");
    assert_eq!(record.code(), Some("XY1234"));
    assert_eq!(record.date(), Some("2023-04-01"));
    assert_eq!(record.runtime(), Some("12:34"));
    assert_eq!(record.poster(), Some("p.jpg"));
    assert_eq!(record.studio(), Some("Acme"));
    assert_eq!(record.tags(), Some(&["B".to_string(), "C".to_string()][..]));

    let trailers = record.trailers().unwrap();
    assert_eq!(trailers.len(), 1);
    assert_eq!(trailers.get("720p"), Some("t.mp4"));

    let performers = record.performers();
    assert_eq!(performers.gender_of(Some("Amy")), Some(Gender::Female));
    assert_eq!(performers.gender_of(Some("Bob")), Some(Gender::Male));
    assert_eq!(performers.gender_of(Some("Cat")), Some(Gender::Tx));
    assert_eq!(performers.gender_of(Some("Dee")), Some(Gender::Unknown));
    assert_eq!(performers.bucket(Gender::Female).get(Some("Amy")).unwrap().age, Some(30));

    // Profiles are fetched one by one in sorted order after the scene page.
    let requests = engine.fetcher().requests();
    assert_eq!(requests, vec![scene_url, amy, bob, cat, dee]);
}

#[tokio::test]
async fn test_bucket_union_matches_resolved_names() {
    let scene_url = format!("{}/watch/2/scene", BASE);
    let names = ["Ann", "Ben", "Cid", "Dot", "Eve"];
    let genders = [Some("female"), Some("male"), Some("female"), Some("couple"), None];

    let hrefs: Vec<String> = names
        .iter()
        .map(|n| format!("{}/model/{}", BASE, n.to_lowercase()))
        .collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();

    let mut fetcher = MockFetcher::default().with_page(&scene_url, &scene_page(&href_refs));
    for ((name, gender), href) in names.iter().zip(genders).zip(&hrefs) {
        fetcher = fetcher.with_page(href, &profile_page(name, gender));
    }

    let record = engine(fetcher).scrape(&scene_url).await.unwrap();
    let performers = record.performers();

    let mut seen = BTreeSet::new();
    let mut total = 0;
    for gender in [Gender::Female, Gender::Male, Gender::Tx, Gender::Unknown] {
        for name in performers.bucket(gender).names() {
            total += 1;
            seen.insert(name.map(str::to_string));
        }
    }

    let expected: BTreeSet<Option<String>> = names.iter().map(|n| Some(n.to_string())).collect();
    assert_eq!(seen, expected);
    assert_eq!(total, names.len());
    assert_eq!(performers.gender_of(Some("Dot")), Some(Gender::Unknown));
}

#[tokio::test]
async fn test_profile_fetch_failure_aborts_input() {
    let scene_url = format!("{}/watch/3/scene", BASE);
    let ok = format!("{}/model/1/ok", BASE);
    let missing = format!("{}/model/2/missing", BASE);

    let fetcher = MockFetcher::default()
        .with_page(&scene_url, &scene_page(&[&ok, &missing]))
        .with_page(&ok, &profile_page("Ok", Some("female")));

    let err = engine(fetcher).scrape(&scene_url).await.unwrap_err();
    assert_eq!(err.kind(), "TransportError");
    assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_free_text_resolves_through_search() {
    let scene_url = format!("{}/watch/4/scene", BASE);
    let search = format!("{}/api/autocomplete/search?q=scene%20name%202023", BASE);
    let response = format!(r#"{{"terms": [{{"url": "{}"}}, {{"url": "{}/other"}}]}}"#, scene_url, BASE);

    let fetcher = MockFetcher::default()
        .with_page(&search, &response)
        .with_page(&scene_url, &scene_page(&[]));

    let engine = engine(fetcher);
    let record = engine.scrape("scene-name.2023").await.unwrap();

    assert_eq!(record.title(), "Scene XY1234 Highlights");
    assert!(record.performers().is_empty());
    assert_eq!(engine.fetcher().requests(), vec![search, scene_url]);
}

#[tokio::test]
async fn test_empty_search_results_is_resolution_error() {
    let search = format!("{}/api/autocomplete/search?q=scene%20name%202023", BASE);
    let fetcher = MockFetcher::default().with_page(&search, r#"{"terms": []}"#);

    let engine = engine(fetcher);
    let err = engine.scrape("scene_name_2023").await.unwrap_err();

    assert!(matches!(err, ScrapeError::Resolution(ref input) if input == "scene_name_2023"));
    assert_eq!(err.kind(), "ResolutionError");
    assert_eq!(engine.fetcher().requests(), vec![search]);
}

#[tokio::test]
async fn test_malformed_search_response_is_decode_error() {
    let search = format!("{}/api/autocomplete/search?q=broken", BASE);
    let fetcher = MockFetcher::default().with_page(&search, "<html>not json</html>");

    let err = engine(fetcher).scrape("broken").await.unwrap_err();
    assert_eq!(err.kind(), "DecodeError");
}

#[tokio::test]
async fn test_strict_date_rejects_undated_page() {
    let scene_url = format!("{}/watch/5/scene", BASE);
    let html = "<html><head><title>Undated - AnalVids</title></head><body></body></html>";
    let config = ConfigBuilder::new().require_date(true).build().unwrap();
    let fetcher = MockFetcher::default().with_page(&scene_url, html);

    let engine = ScrapeEngine::new(config, fetcher).unwrap();
    let err = engine.scrape(&scene_url).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Validation("Date")));
}

#[tokio::test]
async fn test_record_json_round_trip() {
    let scene_url = format!("{}/watch/6/scene", BASE);
    let amy = format!("{}/model/1/amy", BASE);
    let fetcher = MockFetcher::default()
        .with_page(&scene_url, &scene_page(&[&amy]))
        .with_page(&amy, "<html><body></body></html>");

    let record = engine(fetcher).scrape(&scene_url).await.unwrap();
    let json = serde_json::to_string_pretty(&record).unwrap();
    let parsed: CatalogRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, record);
    assert!(record.performers().unknown.contains(None));
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["UnknownModels"]["null"]["Age"], Value::Null);
}

#[tokio::test]
async fn test_relative_search_result_is_joined_to_base() {
    let scene_url = format!("{}/watch/7/scene", BASE);
    let search = format!("{}/api/autocomplete/search?q=relative%20scene", BASE);

    let fetcher = MockFetcher::default()
        .with_page(&search, r#"{"terms": [{"url": "/watch/7/scene"}]}"#)
        .with_page(&scene_url, &scene_page(&[]));

    let engine = engine(fetcher);
    engine.scrape("relative_scene").await.unwrap();
    assert_eq!(engine.fetcher().requests(), vec![search, scene_url]);
}

fn two_scene_fetcher() -> (MockFetcher, String, String) {
    let first = format!("{}/watch/10/first", BASE);
    let second = format!("{}/watch/11/second", BASE);
    let fetcher = MockFetcher::default()
        .with_page(&first, &scene_page(&[]))
        .with_page(&second, &scene_page(&[]));
    (fetcher, first, second)
}

fn read_json(path: &std::path::Path) -> serde_json::Map<String, Value> {
    let text = std::fs::read_to_string(path).unwrap();
    match serde_json::from_str(&text).unwrap() {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

#[tokio::test]
async fn test_run_inputs_saves_every_record_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let (fetcher, first, second) = two_scene_fetcher();

    // Second page listed first, to show the file follows input order.
    let inputs = vec![second.clone(), first.clone()];
    let export = JsonExport::new(path.clone(), dir.path().join("fallback.json"));
    let mut stdout = Vec::new();

    let count = run_inputs(&engine(fetcher), &inputs, Some(export), false, &mut stdout)
        .await
        .unwrap();

    assert_eq!(count, 2);
    let keys: Vec<String> = read_json(&path).keys().cloned().collect();
    assert_eq!(keys, vec![second, first]);
    assert_eq!(String::from_utf8(stdout).unwrap().matches("\"Title\"").count(), 2);
}

#[tokio::test]
async fn test_run_inputs_keeps_earlier_records_when_a_later_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let (fetcher, first, _) = two_scene_fetcher();
    let search = format!("{}/api/autocomplete/search?q=nothing%20here", BASE);
    let fetcher = fetcher.with_page(&search, r#"{"terms": []}"#);

    let inputs = vec![first.clone(), "nothing here".to_string()];
    let export = JsonExport::new(path.clone(), dir.path().join("fallback.json"));

    let err = run_inputs(&engine(fetcher), &inputs, Some(export), false, &mut Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "ResolutionError");
    let saved = read_json(&path);
    assert_eq!(saved.keys().cloned().collect::<Vec<_>>(), vec![first]);
}

#[tokio::test]
async fn test_run_inputs_writes_nothing_when_first_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let fallback = dir.path().join("fallback.json");
    let search = format!("{}/api/autocomplete/search?q=nothing", BASE);
    let fetcher = MockFetcher::default().with_page(&search, r#"{"terms": []}"#);

    let inputs = vec!["nothing".to_string()];
    let export = JsonExport::new(path.clone(), fallback.clone());

    let err = run_inputs(&engine(fetcher), &inputs, Some(export), false, &mut Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "ResolutionError");
    assert!(!path.exists());
    assert!(!fallback.exists());
}

#[tokio::test]
async fn test_run_inputs_falls_back_when_output_is_unwritable() {
    let dir = tempfile::tempdir().unwrap();
    let unwritable = dir.path().join("gone").join("out.json");
    let fallback = dir.path().join("fallback.json");
    let (fetcher, first, second) = two_scene_fetcher();

    let inputs = vec![first.clone(), second.clone()];
    let export = JsonExport::new(unwritable.clone(), fallback.clone());

    run_inputs(&engine(fetcher), &inputs, Some(export), true, &mut Vec::new())
        .await
        .unwrap();

    assert!(!unwritable.exists());
    let saved = read_json(&fallback);
    assert_eq!(saved.keys().cloned().collect::<Vec<_>>(), vec![first, second]);
}
