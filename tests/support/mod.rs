//! Shared harness: routers over the in-process store with a manual clock.

#![allow(dead_code)]

use std::{num::NonZeroU64, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use postboard::{
    application::repos::{
        CreateGroupParams, CreatePostParams, CreateUserParams, Repositories,
    },
    config::{AuthSettings, UploadSettings},
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        cache::{ManualClock, PageCache},
        http::{ApplicationStates, SESSION_COOKIE, build_admin_router, build_router},
        memory::MemoryRepositories,
        uploads::UploadStorage,
    },
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const HOME_TTL: Duration = Duration::from_secs(20);
const BOUNDARY: &str = "postboard-test-boundary";

/// 1x1 transparent GIF.
pub const TINY_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// A file field for `post_multipart_with_files`.
pub struct FilePart<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub fn image(filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "image",
            filename,
            content_type: "image/gif",
            data,
        }
    }
}

pub struct TestApp {
    pub repos: Repositories,
    pub clock: ManualClock,
    pub cache: PageCache,
    pub states: ApplicationStates,
    public: Router,
    admin: Router,
    media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("media dir");
        let repos = Repositories::from_store(Arc::new(MemoryRepositories::new()));
        let clock = ManualClock::new();
        let cache = PageCache::new(HOME_TTL, Arc::new(clock.clone()));
        let storage = UploadStorage::new(media.path().to_path_buf()).expect("upload storage");

        let auth = AuthSettings {
            session_ttl: Duration::from_secs(60 * 60),
            secure_cookies: false,
        };
        let uploads = UploadSettings {
            directory: media.path().to_path_buf(),
            max_request_bytes: NonZeroU64::new(1024 * 1024).expect("non-zero"),
        };
        let states = ApplicationStates::new(
            &repos,
            Arc::new(storage),
            Some(cache.clone()),
            &auth,
            &uploads,
        );

        Self {
            public: build_router(states.http.clone()),
            admin: build_admin_router(states.admin.clone()),
            repos,
            clock,
            cache,
            states,
            media,
        }
    }

    /// A user that can only be signed in through `session_cookie`.
    pub async fn user(&self, username: &str) -> UserRecord {
        self.repos
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                password_hash: "!".to_string(),
            })
            .await
            .expect("create user")
    }

    pub async fn session_cookie(&self, user: &UserRecord) -> String {
        let session = self
            .states
            .http
            .accounts
            .issue_session(user)
            .await
            .expect("issue session");
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.repos
            .groups
            .create_group(CreateGroupParams {
                title: title.to_string(),
                slug: slug.to_string(),
                description: None,
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<Uuid>) -> PostRecord {
        self.repos
            .posts_write
            .create_post(CreatePostParams {
                author_id: author.id,
                group_id: group,
                text: text.to_string(),
                image_path: None,
            })
            .await
            .expect("create post")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    /// Submit text fields as `multipart/form-data`.
    pub async fn post_multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        self.post_multipart_with_files(uri, fields, &[], cookie)
            .await
    }

    /// Submit text fields and file parts as `multipart/form-data`.
    pub async fn post_multipart_with_files(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for file in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    file.name, file.filename, file.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(file.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    /// Absolute location of a stored upload inside the temporary media root.
    pub fn media_file(&self, stored_path: &str) -> PathBuf {
        self.media.path().join(stored_path)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.public
            .clone()
            .oneshot(request)
            .await
            .expect("public router is infallible")
    }

    pub async fn admin(&self, method: &str, uri: &str, json: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.admin
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("admin router is infallible")
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Number of rendered post cards on a listing page.
pub fn card_count(html: &str) -> usize {
    html.matches("class=\"post-card\"").count()
}
