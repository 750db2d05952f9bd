//! Webhook delivery against the live mock receiver.
//!
//! # Design
//! Starts the mock server on a random port, then drives feeds through
//! `WebhooksAddOn` with the real `ureq` transport. Assertions read what the
//! receiver recorded, so both request building and the transport's wire
//! behavior are checked end-to-end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use mock_server::{Inbox, ReceivedRequest};
use serde_json::{json, Value};
use webhooks_core::{
    DispatchOutcome, Entry, Feed, FeedErrorLog, FeedMeta, FeedOutcome, Form, FormField, HostServices, Hooks,
    MapEntry, RequestBodyType, RequestFormat, SiteConfig, UreqTransport, WebhookError, WebhooksAddOn,
};

#[derive(Default)]
struct RecordingErrors(Mutex<Vec<String>>);

impl RecordingErrors {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl FeedErrorLog for RecordingErrors {
    fn add_feed_error(&self, message: &str, _feed: &Feed, _entry: &Entry, _form: &Form) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Start the receiver on its own runtime thread.
fn start_receiver() -> (SocketAddr, Inbox) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let inbox = Inbox::default();
    let server_inbox = inbox.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, server_inbox).await
        })
        .unwrap();
    });

    (addr, inbox)
}

fn received(inbox: &Inbox) -> Vec<ReceivedRequest> {
    inbox.blocking_read().clone()
}

fn add_on(hooks: Hooks) -> (WebhooksAddOn, Arc<RecordingErrors>) {
    let errors = Arc::new(RecordingErrors::default());
    let services = HostServices::standalone(Arc::new(UreqTransport::new())).with_feed_errors(errors.clone());
    let config = SiteConfig::from_toml_str(r#"site_url = "https://forms.example.com""#).unwrap();
    (WebhooksAddOn::new(config, hooks, services), errors)
}

fn form() -> Form {
    Form {
        id: 7,
        title: "Signup".to_string(),
        fields: vec![
            FormField {
                id: "1".to_string(),
                label: "Name".to_string(),
                field_type: "text".to_string(),
            },
            FormField {
                id: "2".to_string(),
                label: "Email".to_string(),
                field_type: "email".to_string(),
            },
        ],
    }
}

fn entry() -> Entry {
    Entry::new()
        .with("id", 42)
        .with("form_id", 7)
        .with("1", "Ada Lovelace")
        .with("2", "ada@example.com")
}

fn feed(url: String, method: &str, format: RequestFormat) -> Feed {
    Feed {
        id: 3,
        form_id: 7,
        is_active: true,
        meta: FeedMeta {
            feed_name: "Signup hook".to_string(),
            request_url: url,
            request_method: method.to_string(),
            request_format: format,
            request_headers: vec![
                MapEntry::custom("X-Form", "{form_title}"),
                MapEntry::custom("X-Site", "{rest_api_url}"),
            ],
            request_body_type: RequestBodyType::SelectFields,
            field_values: vec![MapEntry::new("name", "1"), MapEntry::new("email", "2")],
            feed_condition: None,
        },
    }
}

fn sent(outcome: FeedOutcome) -> u16 {
    match outcome {
        FeedOutcome::Processed(DispatchOutcome::Sent(response)) => response.status,
        other => panic!("expected a sent request, got {other:?}"),
    }
}

#[test]
fn post_json_delivers_mapped_fields() {
    let (addr, inbox) = start_receiver();
    let (add_on, errors) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/hooks/signup"), "post", RequestFormat::Json);

    let status = sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false));

    assert_eq!(status, 200);
    assert!(errors.messages().is_empty());
    let received = received(&inbox);
    assert_eq!(received.len(), 1);
    let request = &received[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/hooks/signup");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-site"), Some("https://forms.example.com/wp-json/"));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!({ "name": "Ada Lovelace", "email": "ada@example.com" }));
}

#[test]
fn get_sends_payload_as_query_string() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/hooks?source=form"), "GET", RequestFormat::Json);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let received = received(&inbox);
    assert_eq!(received[0].method, "GET");
    assert_eq!(
        received[0].query.as_deref(),
        Some("source=form&name=Ada%20Lovelace&email=ada%40example.com")
    );
    assert!(received[0].body.is_empty());
    assert_eq!(received[0].header("content-type"), None);
}

#[test]
fn put_form_sends_urlencoded_body() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/hooks"), "PUT", RequestFormat::Form);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.method, "PUT");
    assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(request.body, "name=Ada%20Lovelace&email=ada%40example.com");
}

#[test]
fn url_merge_tags_resolve_from_entry() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/entries/{{id}}"), "DELETE", RequestFormat::Form);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, "/entries/42");
}

#[test]
fn error_status_is_not_a_feed_error() {
    let (addr, inbox) = start_receiver();
    let (add_on, errors) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/status/500"), "POST", RequestFormat::Json);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 500);

    assert!(errors.messages().is_empty());
    assert_eq!(received(&inbox).len(), 1);
}

#[test]
fn hooks_reshape_the_request_on_the_wire() {
    let (addr, inbox) = start_receiver();
    let mut hooks = Hooks::new();
    hooks.request_headers.add(|mut headers, _| {
        headers.push(("Authorization".to_string(), "Bearer secret".to_string()));
        headers
    });
    hooks.request_data.add_for_form(7, |mut data, ctx| {
        data.insert("entry_id".to_string(), json!(ctx.entry.id()));
        data
    });
    let (add_on, _) = add_on(hooks);
    let feed = feed(format!("http://{addr}/hooks"), "POST", RequestFormat::Json);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.header("authorization"), Some("Bearer secret"));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["entry_id"], 42);
}

#[test]
fn connection_failure_records_feed_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (add_on, errors) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/hooks"), "POST", RequestFormat::Json);

    let outcome = add_on.maybe_process_feed(&feed, &entry(), &form(), false);

    assert!(matches!(outcome, FeedOutcome::Processed(DispatchOutcome::Failed(_))));
    let messages = errors.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Webhook was not successfully executed."));
    assert!(messages[0].ends_with("(http_request_failed)"));
}

#[test]
fn blank_url_sends_nothing() {
    let (_, inbox) = start_receiver();
    let (add_on, errors) = add_on(Hooks::new());
    let feed = feed("  ".to_string(), "POST", RequestFormat::Json);

    let outcome = add_on.maybe_process_feed(&feed, &entry(), &form(), false);

    assert!(matches!(
        outcome,
        FeedOutcome::Processed(DispatchOutcome::Aborted(WebhookError::EmptyRequestUrl))
    ));
    assert_eq!(
        errors.messages(),
        vec!["Webhook was not processed because request URL was empty.".to_string()]
    );
    assert!(received(&inbox).is_empty());
}

#[test]
fn uncommon_method_is_sent_as_is() {
    let (addr, inbox) = start_receiver();
    let (add_on, errors) = add_on(Hooks::new());
    let mut feed = feed(format!("http://{addr}/hooks"), "options", RequestFormat::Json);
    feed.meta.field_values.clear();

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    assert!(errors.messages().is_empty());
    let received = received(&inbox);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "OPTIONS");
    assert_eq!(received[0].path, "/hooks");
}

#[test]
fn repeated_header_names_are_all_sent() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let mut feed = feed(format!("http://{addr}/hooks"), "POST", RequestFormat::Json);
    feed.meta.request_headers = vec![MapEntry::new("X-Tag", "one"), MapEntry::new("X-Tag", "two")];

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.header_values("x-tag"), vec!["one", "two"]);
}

#[test]
fn patch_sends_form_body_even_for_json_feeds() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let feed = feed(format!("http://{addr}/people/{{id}}"), "patch", RequestFormat::Json);

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.path, "/people/42");
    assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(request.body, "name=Ada%20Lovelace&email=ada%40example.com");
}

#[test]
fn configured_content_type_wins_for_form_bodies() {
    let (addr, inbox) = start_receiver();
    let (add_on, _) = add_on(Hooks::new());
    let mut feed = feed(format!("http://{addr}/hooks"), "POST", RequestFormat::Form);
    feed.meta.request_headers = vec![MapEntry::new("Content-Type", "text/plain")];

    assert_eq!(sent(add_on.maybe_process_feed(&feed, &entry(), &form(), false)), 200);

    let request = &received(&inbox)[0];
    assert_eq!(request.header_values("content-type"), vec!["text/plain"]);
    assert_eq!(request.body, "name=Ada%20Lovelace&email=ada%40example.com");
}
