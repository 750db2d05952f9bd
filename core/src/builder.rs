//! Stateless webhook request builder.
//!
//! # Design
//! `RequestBuilder` borrows its collaborators and carries no mutable state,
//! so building twice from the same feed, entry and form yields the same
//! `RequestArgs`. It only produces the request; executing it is the
//! dispatcher's job.
//!
//! Pipeline: method → headers → payload → URL → method-specific shaping →
//! TLS flag → args filter. Every stage passes through its extension point
//! before the value is used.

use serde_json::Value;

use crate::error::WebhookError;
use crate::field_map::{header_value, FieldMapResolver};
use crate::hooks::{HookContext, Hooks};
use crate::http::{Headers, HttpMethod, Payload, RequestArgs, RequestBody};
use crate::merge_tags::{ReplaceOptions, VariableReplacer};
use crate::query;
use crate::types::{Entry, Feed, Form, RequestBodyType, RequestFormat};

const CONTENT_TYPE: &str = "Content-Type";

/// Turns a feed plus one submission into `RequestArgs`.
#[derive(Clone, Copy)]
pub struct RequestBuilder<'a> {
    merge_tags: &'a dyn VariableReplacer,
    field_map: &'a dyn FieldMapResolver,
    hooks: &'a Hooks,
    ssl_verify: bool,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        merge_tags: &'a dyn VariableReplacer,
        field_map: &'a dyn FieldMapResolver,
        hooks: &'a Hooks,
    ) -> Self {
        Self {
            merge_tags,
            field_map,
            hooks,
            ssl_verify: true,
        }
    }

    /// Starting value for the TLS verification flag, before filters run.
    pub fn with_ssl_verify(mut self, ssl_verify: bool) -> Self {
        self.ssl_verify = ssl_verify;
        self
    }

    pub fn build(&self, feed: &Feed, entry: &Entry, form: &Form) -> Result<RequestArgs, WebhookError> {
        let ctx = HookContext::new(feed, entry, form);

        let method = self.request_method(&ctx);
        let mut headers = self.request_headers(&ctx);
        let data = self.request_data(feed, entry, form);
        let mut url = self.request_url(&ctx);

        if url.trim().is_empty() {
            return Err(WebhookError::EmptyRequestUrl);
        }

        let body = if method.uses_query_string() {
            url = query::add_query_args(&url, &data);
            None
        } else if method.accepts_json_body() && feed.meta.request_format == RequestFormat::Json {
            set_header(&mut headers, CONTENT_TYPE, "application/json");
            Some(RequestBody::Json(serde_json::to_string(&data)?))
        } else {
            Some(RequestBody::Form(data))
        };

        let ssl_verify = self.hooks.apply_ssl_verify(self.ssl_verify, &url);
        let args = RequestArgs {
            method,
            url,
            headers,
            body,
            ssl_verify,
        };
        Ok(self.hooks.request_args.apply(args, &ctx))
    }

    /// Payload before method shaping: the whole entry for `all_fields`,
    /// otherwise only the mapped field values.
    pub fn request_data(&self, feed: &Feed, entry: &Entry, form: &Form) -> Payload {
        let data = match feed.meta.request_body_type {
            RequestBodyType::AllFields => entry.fields().clone(),
            RequestBodyType::SelectFields => self
                .field_map
                .generic_map_fields(feed, "fieldValues", form, entry)
                .into_iter()
                .collect(),
        };
        self.hooks.request_data.apply(data, &HookContext::new(feed, entry, form))
    }

    fn request_method(&self, ctx: &HookContext<'_>) -> HttpMethod {
        let raw = self
            .hooks
            .request_method
            .apply(ctx.feed.meta.request_method.clone(), ctx);
        HttpMethod::parse(&raw)
    }

    fn request_headers(&self, ctx: &HookContext<'_>) -> Headers {
        let headers: Headers = self
            .field_map
            .generic_map_fields(ctx.feed, "requestHeaders", ctx.form, ctx.entry)
            .into_iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value): (String, Value)| (name, header_value(&value)))
            .collect();
        self.hooks.request_headers.apply(headers, ctx)
    }

    fn request_url(&self, ctx: &HookContext<'_>) -> String {
        let url = self.merge_tags.replace_variables(
            &ctx.feed.meta.request_url,
            Some(ctx.form),
            Some(ctx.entry),
            &ReplaceOptions::text(),
        );
        self.hooks.request_url.apply(url, ctx)
    }
}

/// Replace every header named `name` (case-insensitively) with one value.
fn set_header(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_map::GenericMapResolver;
    use crate::merge_tags::MergeTagEngine;
    use crate::types::{FeedMeta, FormField, MapEntry};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        merge_tags: Arc<MergeTagEngine>,
        field_map: GenericMapResolver,
        hooks: Hooks,
    }

    impl Fixture {
        fn new() -> Self {
            let merge_tags = Arc::new(MergeTagEngine::default());
            Self {
                field_map: GenericMapResolver::new(merge_tags.clone()),
                merge_tags,
                hooks: Hooks::new(),
            }
        }

        fn builder(&self) -> RequestBuilder<'_> {
            RequestBuilder::new(self.merge_tags.as_ref(), &self.field_map, &self.hooks)
        }
    }

    fn feed(method: &str, format: RequestFormat, body_type: RequestBodyType) -> Feed {
        Feed {
            id: 1,
            form_id: 1,
            is_active: true,
            meta: FeedMeta {
                feed_name: "Test".to_string(),
                request_url: "https://x.test/hook".to_string(),
                request_method: method.to_string(),
                request_format: format,
                request_headers: Vec::new(),
                request_body_type: body_type,
                field_values: Vec::new(),
                feed_condition: None,
            },
        }
    }

    fn form() -> Form {
        Form {
            id: 1,
            title: "Contact".to_string(),
            fields: vec![FormField {
                id: "Email".to_string(),
                label: "Email".to_string(),
                field_type: "email".to_string(),
            }],
        }
    }

    #[test]
    fn post_json_select_fields_scenario() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Json, RequestBodyType::SelectFields);
        feed.meta.field_values = vec![MapEntry::new("email", "{Email}")];
        let entry = Entry::new().with("Email", "a@b.com");

        let args = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(args.method, HttpMethod::Post);
        assert_eq!(args.body, Some(RequestBody::Json(r#"{"email":"a@b.com"}"#.to_string())));
        assert_eq!(args.header("Content-Type"), Some("application/json"));
        assert!(args.ssl_verify);
    }

    #[test]
    fn get_all_fields_scenario() {
        let fx = Fixture::new();
        let feed = feed("GET", RequestFormat::Json, RequestBodyType::AllFields);
        let entry = Entry::new().with("name", "Jo Smith");

        let args = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(args.url, "https://x.test/hook?name=Jo%20Smith");
        assert!(args.body.is_none());
        assert!(args.header("Content-Type").is_none());
    }

    #[test]
    fn delete_with_empty_payload_keeps_url() {
        let fx = Fixture::new();
        let feed = feed("delete", RequestFormat::Form, RequestBodyType::SelectFields);
        let args = fx.builder().build(&feed, &Entry::new(), &form()).unwrap();
        assert_eq!(args.method, HttpMethod::Delete);
        assert_eq!(args.url, "https://x.test/hook");
        assert!(args.body.is_none());
    }

    #[test]
    fn put_form_keeps_payload_map() {
        let fx = Fixture::new();
        let feed = feed("put", RequestFormat::Form, RequestBodyType::AllFields);
        let entry = Entry::new().with("1", "one").with("2", json!(2));

        let args = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(args.method, HttpMethod::Put);
        assert_eq!(args.body, Some(RequestBody::Form(entry.fields().clone())));
        assert!(args.header("Content-Type").is_none());
    }

    #[test]
    fn patch_json_is_not_json_encoded() {
        let fx = Fixture::new();
        let feed = feed("PATCH", RequestFormat::Json, RequestBodyType::AllFields);
        let entry = Entry::new().with("1", "one");

        let args = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(args.body, Some(RequestBody::Form(entry.fields().clone())));
    }

    #[test]
    fn json_content_type_replaces_configured_one() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Json, RequestBodyType::AllFields);
        feed.meta.request_headers = vec![
            MapEntry::new("content-type", "text/plain"),
            MapEntry::new("Authorization", "Bearer t"),
        ];

        let args = fx.builder().build(&feed, &Entry::new(), &form()).unwrap();
        assert_eq!(
            args.headers,
            vec![
                ("Authorization".to_string(), "Bearer t".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn headers_with_empty_names_are_dropped_and_duplicates_kept() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Form, RequestBodyType::AllFields);
        feed.meta.request_headers = vec![
            MapEntry::new("X-Tag", "one"),
            MapEntry::custom("", "orphan"),
            MapEntry::new("X-Tag", "two"),
        ];

        let args = fx.builder().build(&feed, &Entry::new(), &form()).unwrap();
        assert_eq!(
            args.headers,
            vec![
                ("X-Tag".to_string(), "one".to_string()),
                ("X-Tag".to_string(), "two".to_string()),
            ]
        );
    }

    #[test]
    fn only_exactly_empty_header_names_are_dropped() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Form, RequestBodyType::AllFields);
        feed.meta.request_headers = vec![MapEntry::custom(" ", "spaced"), MapEntry::custom("", "orphan")];

        let args = fx.builder().build(&feed, &Entry::new(), &form()).unwrap();
        assert_eq!(args.headers, vec![(" ".to_string(), "spaced".to_string())]);
    }

    #[test]
    fn select_fields_excludes_unlisted_entry_fields() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Form, RequestBodyType::SelectFields);
        feed.meta.field_values = vec![MapEntry::new("mail", "Email")];
        let entry = Entry::new().with("Email", "a@b.com").with("Phone", "555");

        let data = fx.builder().request_data(&feed, &entry, &form());
        assert_eq!(data.len(), 1);
        assert_eq!(data["mail"], json!("a@b.com"));
    }

    #[test]
    fn all_fields_payload_is_the_entry() {
        let fx = Fixture::new();
        let feed = feed("POST", RequestFormat::Json, RequestBodyType::AllFields);
        let entry = Entry::new().with("id", 5).with("1", "x").with("form_id", 1);
        assert_eq!(&fx.builder().request_data(&feed, &entry, &form()), entry.fields());
    }

    #[test]
    fn blank_url_is_rejected() {
        let fx = Fixture::new();
        let mut feed = feed("GET", RequestFormat::Json, RequestBodyType::AllFields);
        feed.meta.request_url = "{Missing:99}".to_string();
        let entry = Entry::new().with("99", "  ").with("name", "Jo");

        let err = fx.builder().build(&feed, &entry, &form()).unwrap_err();
        assert!(matches!(err, WebhookError::EmptyRequestUrl));
    }

    #[test]
    fn url_template_is_resolved_as_plain_text() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Json, RequestBodyType::SelectFields);
        feed.meta.request_url = "https://x.test/users/{Email}?a=1&b=2".to_string();
        let entry = Entry::new().with("Email", "a&b@c.com");

        let args = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(args.url, "https://x.test/users/a&b@c.com?a=1&b=2");
    }

    #[test]
    fn filters_shape_every_stage() {
        let mut fx = Fixture::new();
        fx.hooks.request_method.add(|_, _| "get".to_string());
        fx.hooks.request_headers.add(|mut headers, _| {
            headers.push(("X-Filtered".to_string(), "yes".to_string()));
            headers
        });
        fx.hooks.request_data.add_for_form(1, |mut data, _| {
            data.insert("extra".to_string(), json!("1"));
            data
        });
        fx.hooks.request_url.add(|url, _| format!("{url}/v2"));
        fx.hooks.add_ssl_verify_filter(|_, _| false);
        fx.hooks.request_args.add(|mut args, _| {
            args.headers.push(("X-Args".to_string(), "seen".to_string()));
            args
        });

        let feed = feed("POST", RequestFormat::Json, RequestBodyType::SelectFields);
        let args = fx.builder().build(&feed, &Entry::new(), &form()).unwrap();
        assert_eq!(args.method, HttpMethod::Get);
        assert_eq!(args.url, "https://x.test/hook/v2?extra=1");
        assert!(args.body.is_none());
        assert!(!args.ssl_verify);
        assert_eq!(args.header("X-Filtered"), Some("yes"));
        assert_eq!(args.header("X-Args"), Some("seen"));
    }

    #[test]
    fn url_filter_can_blank_the_url() {
        let mut fx = Fixture::new();
        fx.hooks.request_url.add(|_, _| String::new());
        let feed = feed("POST", RequestFormat::Json, RequestBodyType::AllFields);
        assert!(matches!(
            fx.builder().build(&feed, &Entry::new(), &form()),
            Err(WebhookError::EmptyRequestUrl)
        ));
    }

    #[test]
    fn ssl_verify_default_comes_from_builder() {
        let fx = Fixture::new();
        let feed = feed("POST", RequestFormat::Json, RequestBodyType::AllFields);
        let args = fx
            .builder()
            .with_ssl_verify(false)
            .build(&feed, &Entry::new(), &form())
            .unwrap();
        assert!(!args.ssl_verify);
    }

    #[test]
    fn building_twice_is_identical() {
        let fx = Fixture::new();
        let mut feed = feed("POST", RequestFormat::Json, RequestBodyType::SelectFields);
        feed.meta.field_values = vec![MapEntry::new("email", "{Email}")];
        feed.meta.request_headers = vec![MapEntry::custom("X-Email", "{Email}")];
        let entry = Entry::new().with("Email", "a@b.com");

        let first = fx.builder().build(&feed, &entry, &form()).unwrap();
        let second = fx.builder().build(&feed, &entry, &form()).unwrap();
        assert_eq!(first, second);
    }
}
