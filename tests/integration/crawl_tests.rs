//! End-to-end crawl tests against a mock remote API

use serde_json::json;
use user_harvest::config::Config;
use user_harvest::crawler::{Coordinator, CrawlStop, Sleeper};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a config pointing at the mock server with every delay disabled
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.crawler.request_timeout = 5;
    config.crawler.connect_backoff_base = 0;
    config.crawler.missing_quota_delay = 0;
    config.crawler.server_error_delay = 0;
    config.crawler.too_many_requests_delay = 0;
    config
}

/// A 200 response carrying a comfortable remaining quota
fn ok_json(body: serde_json::Value) -> ResponseTemplate {
    let reset = chrono::Utc::now().timestamp() + 3600;
    ResponseTemplate::new(200)
        .set_body_json(body)
        .insert_header("X-RateLimit-Remaining", "4999")
        .insert_header("X-RateLimit-Reset", reset.to_string().as_str())
}

fn detail_body(login: &str, id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "login": login,
        "created_at": "2016-05-04T03:02:01Z",
        "avatar_url": format!("https://avatars.example.com/u/{}", id),
        "bio": format!("I am {}", login),
    })
}

fn listing_body(logins: &[&str]) -> serde_json::Value {
    json!(logins.iter().map(|l| json!({ "login": l })).collect::<Vec<_>>())
}

async fn mount_listing(server: &MockServer, since: u64, per_page: u32, logins: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("since", since.to_string().as_str()))
        .and(query_param("per_page", per_page.to_string().as_str()))
        .respond_with(ok_json(listing_body(logins)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, login: &str, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{}", login)))
        .respond_with(ok_json(detail_body(login, id)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_five_users_in_discovery_order() {
    let server = MockServer::start().await;
    let logins = ["ada", "brian", "carla", "dmitri", "eve"];

    mount_listing(&server, 1000, 5, &logins).await;
    for (i, login) in logins.iter().enumerate() {
        mount_detail(&server, login, 1001 + i as u64).await;
    }

    let config = create_test_config(&server.uri());
    let mut coordinator = Coordinator::new(&config).expect("Failed to create coordinator");
    let result = coordinator.crawl(5, 1000).await;

    let found: Vec<&str> = result.users.iter().map(|u| u.login.as_str()).collect();
    assert_eq!(found, logins);
    assert_eq!(result.cursor, 1005);
    assert_eq!(result.failed_pages, 0);
    assert_eq!(result.failed_users, 0);
    assert_eq!(result.stop, CrawlStop::Completed);
    assert_eq!(result.users[2].bio.as_deref(), Some("I am carla"));
}

#[tokio::test]
async fn test_pages_follow_the_cursor() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 2, &["u1", "u2"]).await;
    mount_listing(&server, 1002, 2, &["u3", "u4"]).await;
    mount_listing(&server, 1004, 1, &["u5"]).await;
    for i in 1..=5u64 {
        mount_detail(&server, &format!("u{}", i), 1000 + i).await;
    }

    let mut config = create_test_config(&server.uri());
    config.crawler.max_page_size = 2;

    let mut coordinator = Coordinator::new(&config).unwrap();
    let result = coordinator.crawl(5, 1000).await;

    let ids: Vec<u64> = result.users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1001, 1002, 1003, 1004, 1005]);
    assert_eq!(result.cursor, 1005);
    // listing expectations are verified when the server drops
}

#[tokio::test]
async fn test_missing_user_is_counted_and_keeps_cursor() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 3, &["first", "ghost", "third"]).await;
    mount_detail(&server, "first", 1001).await;
    mount_detail(&server, "third", 1003).await;
    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(3, 1000).await;

    assert_eq!(result.users.len(), 2);
    assert_eq!(result.failed_users, 1);
    assert_eq!(result.failed_pages, 0);
    assert_eq!(result.cursor, 1003);
    assert!(result.stop.is_completed());
}

#[tokio::test]
async fn test_not_found_alone_does_not_move_cursor() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 1, &["ghost"]).await;
    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(1, 1000).await;

    assert!(result.users.is_empty());
    assert_eq!(result.failed_users, 1);
    assert_eq!(result.cursor, 1000);
}

#[tokio::test]
async fn test_missing_page_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("per_page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 1000, 1, &["solo"]).await;
    mount_detail(&server, "solo", 1001).await;

    let mut config = create_test_config(&server.uri());
    config.crawler.max_page_size = 2;

    let result = Coordinator::new(&config).unwrap().crawl(3, 1000).await;

    assert_eq!(result.failed_pages, 1);
    assert_eq!(result.users.len(), 1);
    assert_eq!(result.cursor, 1001);
}

#[tokio::test]
async fn test_bad_token_stops_with_partial_results() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 3, &["kept", "blocked", "never"]).await;
    mount_detail(&server, "kept", 1001).await;
    Mock::given(method("GET"))
        .and(path("/users/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/never"))
        .respond_with(ok_json(detail_body("never", 1003)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(3, 1000).await;

    assert_eq!(result.stop, CrawlStop::Fatal { status: 403 });
    assert_eq!(result.users.len(), 1);
    assert_eq!(result.users[0].login, "kept");
    assert_eq!(result.cursor, 1001);
}

#[tokio::test]
async fn test_unexpected_listing_status_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(250, 0).await;

    assert_eq!(result.stop, CrawlStop::Fatal { status: 401 });
    assert!(result.users.is_empty());
    assert_eq!(result.cursor, 0);
}

#[tokio::test]
async fn test_too_many_requests_retries_same_detail() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 1, &["busy"]).await;
    // mounted first, so it answers the first request only
    Mock::given(method("GET"))
        .and(path("/users/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/busy"))
        .respond_with(ok_json(detail_body("busy", 1001)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(1, 1000).await;

    assert_eq!(result.users.len(), 1);
    assert_eq!(result.failed_users, 0);
    assert!(result.stop.is_completed());
}

#[tokio::test]
async fn test_server_error_retries_same_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(&server, 1000, 2, &["a", "b"]).await;
    mount_detail(&server, "a", 1001).await;
    mount_detail(&server, "b", 1002).await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(2, 1000).await;

    assert_eq!(result.users.len(), 2);
    assert_eq!(result.failed_pages, 0);
    assert_eq!(result.cursor, 1002);
}

#[tokio::test]
async fn test_quota_forbidden_waits_and_retries() {
    let server = MockServer::start().await;
    let reset = (chrono::Utc::now().timestamp() - 1).to_string();

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", reset.as_str()),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 1000, 1, &["patient"]).await;
    mount_detail(&server, "patient", 1001).await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(1, 1000).await;

    assert_eq!(result.users.len(), 1);
    assert!(result.stop.is_completed());
}

#[tokio::test]
async fn test_malformed_detail_counts_as_failed_user() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 2, &["broken", "fine"]).await;
    Mock::given(method("GET"))
        .and(path("/users/broken"))
        .respond_with(ok_json(json!({ "id": 1001, "login": "broken" })))
        .mount(&server)
        .await;
    mount_detail(&server, "fine", 1002).await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(2, 1000).await;

    assert_eq!(result.failed_users, 1);
    assert_eq!(result.users.len(), 1);
    assert_eq!(result.cursor, 1002);
}

#[tokio::test]
async fn test_malformed_listing_counts_as_failed_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ok_json(json!({ "message": "not a list" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let result = Coordinator::new(&config).unwrap().crawl(10, 1000).await;

    assert_eq!(result.failed_pages, 1);
    assert!(result.users.is_empty());
    assert!(result.stop.is_completed());
}

#[tokio::test]
async fn test_token_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("authorization", "token s3cret"))
        .respond_with(ok_json(listing_body(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.api.token = Some("s3cret".to_string());

    let result = Coordinator::new(&config).unwrap().crawl(1, 0).await;
    assert!(result.stop.is_completed());
    assert!(result.users.is_empty());
}

#[tokio::test]
async fn test_unreachable_host_with_reconnect_cap() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = create_test_config(&format!("http://127.0.0.1:{}", port));
    config.crawler.max_connect_attempts = 1;
    config.crawler.max_reconnects = Some(2);

    let result = Coordinator::new(&config).unwrap().crawl(5, 1000).await;

    assert!(matches!(result.stop, CrawlStop::ExhaustedRetries { .. }));
    assert!(result.users.is_empty());
    assert_eq!(result.cursor, 1000);
}

/// A response that spends the last request of the quota window
fn quota_spent(status: u16, reset_in: i64) -> ResponseTemplate {
    let reset = chrono::Utc::now().timestamp() + reset_in;
    ResponseTemplate::new(status)
        .insert_header("X-RateLimit-Remaining", "0")
        .insert_header("X-RateLimit-Reset", reset.to_string().as_str())
}

#[tokio::test]
async fn test_quota_wait_is_paid_after_not_found_and_fatal() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 2, &["ghost", "locked"]).await;
    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(quota_spent(404, 120))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/locked"))
        .respond_with(quota_spent(401, 120))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let sleeper = Sleeper::recording();
    let result = Coordinator::with_sleeper(&config, sleeper.clone())
        .unwrap()
        .crawl(2, 1000)
        .await;

    assert_eq!(result.failed_users, 1);
    assert_eq!(result.stop, CrawlStop::Fatal { status: 401 });

    let waits = sleeper.recorded();
    assert_eq!(waits.len(), 2);
    for wait in waits {
        assert!((115..=120).contains(&wait), "waited {}s", wait);
    }
}

#[tokio::test]
async fn test_missing_quota_headers_fall_back_to_sixty_seconds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["quiet"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/quiet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body("quiet", 1001)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.crawler.missing_quota_delay = 60;

    let sleeper = Sleeper::recording();
    let result = Coordinator::with_sleeper(&config, sleeper.clone())
        .unwrap()
        .crawl(1, 1000)
        .await;

    assert_eq!(result.users.len(), 1);
    assert!(result.stop.is_completed());
    // one fallback wait for the listing, one for the detail
    assert_eq!(sleeper.recorded(), vec![60, 60]);
}

#[tokio::test]
async fn test_too_many_requests_waits_its_fixed_delay() {
    let server = MockServer::start().await;

    mount_listing(&server, 1000, 1, &["eager"]).await;
    Mock::given(method("GET"))
        .and(path("/users/eager"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_detail(&server, "eager", 1001).await;

    let mut config = create_test_config(&server.uri());
    config.crawler.too_many_requests_delay = 5;

    let sleeper = Sleeper::recording();
    let result = Coordinator::with_sleeper(&config, sleeper.clone())
        .unwrap()
        .crawl(1, 1000)
        .await;

    assert_eq!(result.users.len(), 1);
    assert_eq!(sleeper.recorded(), vec![5]);
}

#[tokio::test]
async fn test_unreachable_host_backs_off_between_attempts() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config = create_test_config(&format!("http://127.0.0.1:{}", port));
    config.crawler.max_connect_attempts = 3;
    config.crawler.connect_backoff_base = 5;
    config.crawler.max_reconnects = Some(0);

    let sleeper = Sleeper::recording();
    let result = Coordinator::with_sleeper(&config, sleeper.clone())
        .unwrap()
        .crawl(5, 1000)
        .await;

    assert!(matches!(result.stop, CrawlStop::ExhaustedRetries { .. }));
    assert_eq!(sleeper.recorded(), vec![5, 10, 15]);
}
