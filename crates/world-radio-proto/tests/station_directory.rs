//! StationDirectoryClient against a mock radio-browser mirror.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use world_radio_proto::config::DirectoryConfig;
use world_radio_proto::directory::{StationDirectory, StationDirectoryClient};

fn client_for(server: &MockServer) -> StationDirectoryClient {
    let config = DirectoryConfig {
        base_url: format!("{}/json/", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    };
    StationDirectoryClient::new(&config).unwrap()
}

fn station_json(uuid: &str, resolved: &str, votes: u64) -> serde_json::Value {
    json!({
        "stationuuid": uuid,
        "name": format!("Station {uuid}"),
        "url": "http://example.invalid/listen.pls",
        "url_resolved": resolved,
        "homepage": "https://example.invalid",
        "favicon": "",
        "tags": "jazz,chanson",
        "country": "France",
        "countrycode": "FR",
        "state": "Paris",
        "language": "french",
        "votes": votes,
        "codec": "MP3",
        "bitrate": 128
    })
}

#[tokio::test]
async fn queries_by_exact_code_ordered_by_votes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/bycountrycodeexact/FR"))
        .and(query_param("limit", "50"))
        .and(query_param("order", "votes"))
        .and(query_param("reverse", "true"))
        .and(query_param("hidebroken", "true"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            station_json("a", "https://fip.example/live", 900),
            station_json("b", "http://inter.example/stream", 500),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let stations = client_for(&server).list_stations("FR").await;

    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].id, "a");
    assert_eq!(stations[0].tags, vec!["jazz", "chanson"]);
    assert_eq!(stations[0].region, "Paris");
    assert_eq!(stations[1].url_resolved, "http://inter.example/stream");
}

#[tokio::test]
async fn every_returned_station_has_an_http_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/stations/bycountrycodeexact/DE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            station_json("ok", "https://ok.example/a", 10),
            station_json("blank", "", 9),
            station_json("ftp", "ftp://old.example/a", 8),
            station_json("bare", "https://", 7),
            station_json("plain", "http://plain.example/b", 6),
        ])))
        .mount(&server)
        .await;

    let stations = client_for(&server).list_stations("DE").await;

    let ids: Vec<_> = stations.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["ok", "plain"]);
    assert!(stations.iter().all(|s| s.url_resolved.starts_with("http")));
}

#[tokio::test]
async fn server_error_yields_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client_for(&server).list_stations("IT").await.is_empty());
}

#[tokio::test]
async fn malformed_body_yields_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    assert!(client_for(&server).list_stations("IT").await.is_empty());
}

#[tokio::test]
async fn unreachable_directory_yields_empty_list() {
    let config = DirectoryConfig {
        // reserved port, nothing listens there
        base_url: "http://127.0.0.1:9/json".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let client = StationDirectoryClient::new(&config).unwrap();
    assert!(client.list_stations("FR").await.is_empty());
}

#[tokio::test]
async fn blank_code_does_not_hit_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    assert!(client_for(&server).list_stations("  ").await.is_empty());
}
