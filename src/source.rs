/// Where course data comes from, and how it is fetched and validated
use chrono::Local;
use js_sys::{Reflect, Uint8Array};
use serde_json::Value;
use url::Url;
use wasm_bindgen::prelude::*;

use crate::artifact::{latest_artifact, unpack_courses};
use crate::error::{self, SiaError};
use crate::model::{CourseSnapshot, ingest_courses, ingest_courses_in};
use crate::settings::Settings;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

const GITHUB_API_HOST: &str = "api.github.com";

/// Makes the contents endpoint return the file itself instead of a base64 envelope
pub const GITHUB_RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// Hosts that refuse anonymous requests
const TOKEN_HOSTS: [&str; 1] = [GITHUB_API_HOST];

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn fetchBytes(
        url: &str,
        token: Option<String>,
        accept: Option<String>,
    ) -> Result<JsValue, JsValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CourseSource {
    /// Same-origin style API exposing `/api/courses`
    Api(Url),
    /// A JSON document fetched verbatim (static host or single course file)
    Document(Url),
    /// `api.github.com/repos/{owner}/{repo}/contents/{path}`
    GitHubContents(Url),
    /// `api.github.com/repos/{owner}/{repo}/actions/artifacts[?name=...]`;
    /// the newest artifact is a zip of per-course JSON files
    Artifacts(Url),
}

impl CourseSource {
    pub fn from_settings(settings: &Settings) -> error::Result<CourseSource> {
        let base = settings.api_base_url().unwrap_or(DEFAULT_API_BASE_URL);
        let invalid = || SiaError::InvalidUrl(base.to_string());
        let url = Url::parse(base).map_err(|_| invalid())?;

        if url.host_str() == Some(GITHUB_API_HOST) {
            let path = url.path().trim_end_matches('/');
            if path.ends_with("/actions/artifacts") {
                return Ok(CourseSource::Artifacts(url));
            }
            if path.contains("/contents/") {
                return Ok(CourseSource::GitHubContents(url));
            }
        }

        if url.path().to_lowercase().ends_with(".json") {
            return Ok(CourseSource::Document(url));
        }

        let courses = format!("{}/api/courses", base.trim_end_matches('/'));
        Url::parse(&courses)
            .map(CourseSource::Api)
            .map_err(|_| invalid())
    }

    pub fn url(&self) -> &Url {
        match self {
            CourseSource::Api(url)
            | CourseSource::Document(url)
            | CourseSource::GitHubContents(url)
            | CourseSource::Artifacts(url) => url,
        }
    }

    /// Identity used to key the cache
    pub fn id(&self) -> &str {
        self.url().as_str()
    }

    pub fn requires_token(&self) -> bool {
        self.url()
            .host_str()
            .is_some_and(|host| TOKEN_HOSTS.contains(&host))
    }
}

/// An HTTP GET, optionally authenticated with a bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub token: Option<String>,
    /// Overrides the `Accept` header
    pub accept: Option<&'static str>,
}

impl FetchRequest {
    pub fn new(url: &str, token: Option<&str>) -> Self {
        FetchRequest {
            url: url.to_string(),
            token: token.map(str::to_string),
            accept: None,
        }
    }

    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn get(&self, request: &FetchRequest) -> error::Result<FetchResponse>;
}

/// `fetch()` through the JS bridge, always bypassing the HTTP cache
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserFetcher;

impl Fetcher for BrowserFetcher {
    async fn get(&self, request: &FetchRequest) -> error::Result<FetchResponse> {
        let response_js = fetchBytes(
            &request.url,
            request.token.clone(),
            request.accept.map(str::to_string),
        )
        .await
        .map_err(|e| SiaError::Network(format!("{:?}", e)))?;

        let field = |name: &str| {
            Reflect::get(&response_js, &JsValue::from_str(name))
                .map_err(|e| SiaError::Network(format!("Unexpected fetch result: {:?}", e)))
        };

        let status = field("status")?
            .as_f64()
            .ok_or_else(|| SiaError::Network("Fetch result has no status".to_string()))?;
        let body = Uint8Array::new(&field("body")?).to_vec();

        Ok(FetchResponse {
            status: status as u16,
            body,
        })
    }
}

async fn get_ok<F: Fetcher>(fetcher: &F, request: FetchRequest) -> error::Result<Vec<u8>> {
    let response = fetcher.get(&request).await?;
    if !response.is_success() {
        return Err(SiaError::Status(response.status));
    }
    Ok(response.body)
}

/// List the artifacts, download the newest live one and merge every course
/// file it contains
async fn fetch_artifact_courses<F: Fetcher>(
    fetcher: &F,
    list_url: &Url,
    token: Option<&str>,
) -> error::Result<Vec<CourseSnapshot>> {
    let list = get_ok(fetcher, FetchRequest::new(list_url.as_str(), token)).await?;
    let artifact = latest_artifact(&list)?;
    log::info!("Downloading artifact {} ({})", artifact.name, artifact.id);

    let archive = get_ok(
        fetcher,
        FetchRequest::new(&artifact.archive_download_url, token),
    )
    .await?;
    ingest_courses_in(Value::Array(unpack_courses(&archive)?), &Local)
}

/// Fetch and validate the course list. Never touches the cache.
pub async fn fetch_courses<F: Fetcher>(
    fetcher: &F,
    source: &CourseSource,
    settings: &Settings,
) -> error::Result<Vec<CourseSnapshot>> {
    let token = settings.token();
    if source.requires_token() && token.is_none() {
        return Err(SiaError::MissingSetting("access token"));
    }

    log::info!("Fetching course data from {}", source.id());
    let courses = match source {
        CourseSource::Artifacts(list_url) => {
            fetch_artifact_courses(fetcher, list_url, token).await?
        }
        CourseSource::GitHubContents(url) => {
            let request = FetchRequest::new(url.as_str(), token).accept(GITHUB_RAW_MEDIA_TYPE);
            ingest_courses(&get_ok(fetcher, request).await?)?
        }
        CourseSource::Api(url) | CourseSource::Document(url) => {
            ingest_courses(&get_ok(fetcher, FetchRequest::new(url.as_str(), token)).await?)?
        }
    };

    log::info!("Loaded {} courses", courses.len());
    Ok(courses)
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Serves canned responses by URL and records the requests it saw.
    /// URLs without a route get the fallback response.
    pub struct FakeFetcher {
        pub fallback: error::Result<FetchResponse>,
        pub routes: Vec<(String, FetchResponse)>,
        pub requests: RefCell<Vec<FetchRequest>>,
    }

    impl FakeFetcher {
        pub fn ok(body: &str) -> Self {
            Self::respond(200, body)
        }

        pub fn respond(status: u16, body: &str) -> Self {
            FakeFetcher {
                fallback: Ok(FetchResponse {
                    status,
                    body: body.as_bytes().to_vec(),
                }),
                routes: Vec::new(),
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn failing(err: SiaError) -> Self {
            FakeFetcher {
                fallback: Err(err),
                routes: Vec::new(),
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn route(mut self, url: &str, status: u16, body: Vec<u8>) -> Self {
            self.routes
                .push((url.to_string(), FetchResponse { status, body }));
            self
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(|request| request.url.clone())
                .collect()
        }
    }

    impl Fetcher for FakeFetcher {
        async fn get(&self, request: &FetchRequest) -> error::Result<FetchResponse> {
            self.requests.borrow_mut().push(request.clone());
            match self.routes.iter().find(|(url, _)| *url == request.url) {
                Some((_, response)) => Ok(response.clone()),
                None => self.fallback.clone(),
            }
        }
    }
}
