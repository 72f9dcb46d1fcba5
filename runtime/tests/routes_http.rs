//! Route-map and schedule client against a mock HTTP server.

use chrono::NaiveDate;
use gowild_scout::errors::ScoutError;
use gowild_scout::routes::available_destinations;
use gowild_scout::routes::client::RouteClient;
use gowild_scout::routes::ScheduleSource;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn client(server: &MockServer) -> RouteClient {
    let base = Url::parse(&server.uri()).unwrap();
    RouteClient::new(
        base.join("/Resource/GetRouteMap").unwrap(),
        base.join("/Flight/RetrieveSchedule").unwrap(),
    )
}

async fn mount_route_map(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/Resource/GetRouteMap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "markets": [
                {"fromStation": "JFK", "toStations": ["ATL", "DEN", "MIA"]},
                {"fromStation": "DEN", "toStations": ["JFK"]}
            ],
            "marketDetails": [
                {"stationCode": "JFK", "cityAndCode": "New York, NY (JFK)"},
                {"stationCode": "ATL", "cityAndCode": "Atlanta, GA (ATL)"},
                {"stationCode": "DEN", "cityAndCode": "Denver, CO (DEN)"}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_schedule(server: &MockServer, destination: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/Flight/RetrieveSchedule"))
        .and(query_param("calendarSelectableDays.Origin", "JFK"))
        .and(query_param("calendarSelectableDays.Destination", destination))
        .respond_with(template)
        .mount(server)
        .await;
}

fn schedule(last: &str, disabled: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "calendarSelectableDays": {
            "disabledDates": disabled,
            "lastAvailableDate": last
        }
    }))
}

#[tokio::test]
async fn test_load_reference_data() {
    let server = MockServer::start().await;
    mount_route_map(&server).await;

    let (routes, names) = client(&server).load_reference_data().await.unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(
        routes.destinations("JFK"),
        &["ATL".to_string(), "DEN".to_string(), "MIA".to_string()]
    );
    assert_eq!(names.display("ATL"), "Atlanta, GA (ATL)");
    assert_eq!(names.display("MIA"), "MIA");
}

#[tokio::test]
async fn test_check_gowild_on_date() {
    let server = MockServer::start().await;
    mount_schedule(
        &server,
        "ATL",
        schedule("2025-07-20 00:00:00", &["2025-07-04 00:00:00"]),
    )
    .await;
    let client = client(&server);

    assert!(client.check_gowild_on_date("JFK", "ATL", date("2025-07-15")).await.unwrap());
    assert!(client.check_gowild_on_date("JFK", "ATL", date("2025-07-20")).await.unwrap());
    assert!(!client.check_gowild_on_date("JFK", "ATL", date("2025-07-04")).await.unwrap());
    assert!(!client.check_gowild_on_date("JFK", "ATL", date("2025-07-21")).await.unwrap());
}

#[tokio::test]
async fn test_server_error_surfaces_as_http_error() {
    let server = MockServer::start().await;
    mount_schedule(&server, "ATL", ResponseTemplate::new(503)).await;
    let err = client(&server)
        .fetch_schedule("JFK", "ATL")
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Http(_)));
}

#[tokio::test]
async fn test_malformed_schedule_is_json_error() {
    let server = MockServer::start().await;
    mount_schedule(
        &server,
        "ATL",
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;
    let err = client(&server)
        .fetch_schedule("JFK", "ATL")
        .await
        .unwrap_err();
    assert!(matches!(err, ScoutError::Json(_)));
}

#[tokio::test]
async fn test_available_destinations_end_to_end() {
    let server = MockServer::start().await;
    mount_route_map(&server).await;
    mount_schedule(&server, "ATL", schedule("2025-08-01", &[])).await;
    mount_schedule(&server, "DEN", schedule("2025-07-10", &[])).await;
    mount_schedule(&server, "MIA", ResponseTemplate::new(500)).await;

    let client = client(&server);
    let (routes, names) = client.load_reference_data().await.unwrap();
    let available =
        available_destinations(&client, &routes, &names, "JFK", date("2025-07-15")).await;
    assert_eq!(available, vec!["Atlanta, GA (ATL)".to_string()]);
}
