// Shared setup for the HTTP level tests.
#![allow(dead_code)]

use std::{io::Cursor, str::FromStr, sync::Arc};

use bytes::Bytes;
use chrono::Duration;
use image::{DynamicImage, ImageFormat};
use recipe_api::{
    app,
    authentication::jwt::TokenSigner,
    database::{
        memory::MemoryStore,
        schema::{Recipe, User},
        store::{RecipeDraft, RecipeStore},
    },
    services::{
        media::MediaStorage,
        users::{create_user, ExtraFields},
    },
    state::AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use warp::{http::Response, test::RequestBuilder};

pub const BOUNDARY: &str = "recipe-test-boundary";

pub struct TestApp {
    pub state: AppState,
    pub media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("Failed to create media dir");
        let tokens = TokenSigner::new(b"test-secret", Duration::hours(1))
            .expect("Failed to create token signer");
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            tokens,
            MediaStorage::new(media.path()),
        );

        Self { state, media }
    }

    pub async fn send(&self, request: RequestBuilder) -> Response<Bytes> {
        request.reply(&app(self.state.clone())).await
    }

    /// Serves the app on a local port and posts `body` with chunked transfer
    /// encoding, so no `content-length` is sent. Returns the raw response.
    pub async fn post_chunked(&self, path: &str, body: &[u8]) -> String {
        let (addr, server) =
            warp::serve(app(self.state.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
        let server = tokio::spawn(server);

        let mut request = format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
             Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
        )
        .into_bytes();
        for chunk in body.chunks(16 * 1024) {
            request.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            request.extend_from_slice(chunk);
            request.extend_from_slice(b"\r\n");
        }
        request.extend_from_slice(b"0\r\n\r\n");

        let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
        // The server may answer and close before the whole body is written.
        let _ = stream.write_all(&request).await;
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response).await;

        server.abort();
        String::from_utf8_lossy(&response).into_owned()
    }

    pub async fn create_user(&self, email: &str, password: &str) -> User {
        let extra = ExtraFields {
            name: String::from("Test Name"),
            ..Default::default()
        };
        create_user(&*self.state.store, email, password, extra)
            .await
            .expect("Failed to create user")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.tokens.generate(user).expect("Failed to sign token")
    }

    /// A new user with a valid token.
    pub async fn login(&self, email: &str) -> (User, String) {
        let user = self.create_user(email, "testpass123").await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn create_recipe(&self, user: &User, title: &str) -> Recipe {
        self.create_recipe_with(user, title, &[], &[]).await
    }

    pub async fn create_recipe_with(
        &self,
        user: &User,
        title: &str,
        tags: &[&str],
        ingredients: &[&str],
    ) -> Recipe {
        let draft = RecipeDraft {
            title: title.to_string(),
            description: String::from("Sample description"),
            time_minutes: 22,
            price: Decimal::from_str("5.25").expect("valid decimal"),
            link: String::from("http://example.com/recipe.pdf"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: ingredients.iter().map(|i| i.to_string()).collect(),
        };
        self.state
            .store
            .create_recipe(user.id, draft)
            .await
            .expect("Failed to create recipe")
    }
}

pub fn authed(method: &str, path: &str, token: &str) -> RequestBuilder {
    warp::test::request()
        .method(method)
        .path(path)
        .header("authorization", format!("Token {token}"))
}

pub fn json_body(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("Response body is not JSON")
}

pub fn png_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(10, 10)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode png");
    buf
}

/// Single part `multipart/form-data` body.
pub fn multipart_body(field: &str, filename: Option<&str>, data: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(filename) => format!("form-data; name=\"{field}\"; filename=\"{filename}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    if filename.is_some() {
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload(path: &str, token: &str, body: Vec<u8>) -> RequestBuilder {
    authed("POST", path, token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
}
