//! Mock course portal shared by the integration tests.

#![allow(dead_code)]

use chrono::Local;
use course_sync::portal::term_descriptor;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_TICKET: &str = "LT-42-integration";

pub fn login_form_page() -> String {
    format!(
        r#"<html><body>
        <form id="fm1" action="/cas/login" method="post">
          <input id="username" name="username" type="text" value="" />
          <input id="password" name="password" type="password" value="" />
          <input type="hidden" name="lt" value="{LOGIN_TICKET}" />
          <input type="hidden" name="execution" value="e1s1" />
        </form>
        </body></html>"#
    )
}

/// Title of a site that belongs to the current term.
pub fn current_site_title(name: &str) -> String {
    format!("[{}月1]{name}", term_descriptor(Local::now().date_naive()))
}

/// Mounts the liveness check, login entry, and an accepting SSO endpoint.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sakai-login-tool/container"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_form_page()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cas/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Welcome</body></html>"),
        )
        .mount(server)
        .await;
}

/// Mounts a site listing with one current-term site `S1` and one stale site.
pub async fn mount_sites(server: &MockServer) {
    let body = serde_json::json!({
        "site_collection": [
            { "id": "S1", "title": current_site_title("Statistical Physics") },
            { "id": "OLD", "title": "[2001前期月1]Archived Course" }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/direct/site.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// One catalog entry as the portal serves it.
pub fn entry(server: &MockServer, title: &str, mime: &str, size: u64, modified: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "type": mime,
        "size": size,
        "url": format!("{}/access/content/group/S1/{title}", server.uri()),
        "modifiedDate": modified,
    })
}

/// Mounts the resource listing of site `S1`.
pub async fn mount_catalog(server: &MockServer, entries: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/direct/content/site/S1.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "content_collection": entries })),
        )
        .mount(server)
        .await;
}

/// Mounts a plain `200` body for a resource of site `S1`.
pub async fn mount_resource(server: &MockServer, title: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/access/content/group/S1/{title}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}
