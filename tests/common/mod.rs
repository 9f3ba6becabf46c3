//! Shared mock speed-test server for integration tests

#![allow(dead_code)]

use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Body served for every download; large enough to span several reads
pub const DOWNLOAD_BODY_BYTES: usize = 512 * 1024;

/// Mount a complete, well-behaved speed-test server
pub async fn start_speed_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("server-timing", "cfRequestDuration;dur=1.25")
                .set_body_bytes(vec![b'0'; DOWNLOAD_BODY_BYTES]),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/__up"))
        .respond_with(ResponseTemplate::new(200).insert_header("server-timing", "cfRequestDuration;dur=8"))
        .mount(&server)
        .await;

    mount_metadata(&server).await;
    server
}

/// Mount only the location listing and the client trace
pub async fn mount_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"iata":"AMS","city":"Amsterdam"},{"iata":"FRA","city":"Frankfurt"}]"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cdn-cgi/trace"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "fl=1f1\nh=localhost\nip=198.51.100.23\nloc=NL\ncolo=AMS\n",
        ))
        .mount(server)
        .await;
}
