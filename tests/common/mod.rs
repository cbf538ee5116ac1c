//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tower::ServiceExt;

use pagetree::client::{ElementsTransport, FetchError, FetchRequest};
use pagetree::config::SiteConfig;
use pagetree::elements::{
    encode_file_path, Elements, ElementsCodec, JsonCodec, ELEMENTS_FILE_EXTENSION, SKIP_HEADER,
};
use pagetree::Site;

/// Pages directory used by every integration test.
pub fn write_pages(dir: &Path) {
    let files = [
        ("_root.html", "<div id=\"app\"><!--children--></div>"),
        ("_layout.html", "<nav>site</nav><main><!--children--></main>"),
        ("index.html", "<h1>Home</h1>"),
        ("about.html", "<h1>About</h1>"),
        ("v1_.html", "<h1>Version one</h1>"),
        ("404.html", "<h1>Not Found</h1>"),
        ("app.html", "<div>client only</div>"),
        ("time.html", "<p>query={{query}}</p>"),
        ("broken.html", "<p>{{nope}}</p>"),
        ("blog/_layout.html", "<article><!--children--></article>"),
        ("blog/[slug].html", "<h2>{{slug}}</h2>"),
        ("_partials/footer.html", "<footer></footer>"),
    ];
    for (name, contents) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

pub fn site_config(pages_dir: &Path, out_dir: &Path) -> SiteConfig {
    let mut config: SiteConfig = toml::from_str(
        r#"
        [pages]
        dynamic = ["/time", "/broken"]
        no_ssr = ["/app"]

        [pages.static_paths]
        "/blog/[slug]" = [["hello"], ["world"]]

        [document]
        head = "<title>fixture</title>"
        client_script = "/client.js"
        "#,
    )
    .unwrap();
    config.pages.dir = pages_dir.to_path_buf();
    config.build.out_dir = out_dir.to_path_buf();
    config
}

/// A loaded site over a temporary pages directory.
pub struct Fixture {
    pub dir: TempDir,
    pub site: Site,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        write_pages(&pages);
        let site = Site::load(site_config(&pages, &dir.path().join("dist"))).unwrap();
        Self { dir, site }
    }

    pub fn router(&self) -> Router {
        self.site.server().router()
    }

    pub fn out_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("dist")
    }
}

/// GET `uri` through the router in-process.
pub async fn get(router: &Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, HeaderMap, String) {
    let mut request = Request::builder().uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

/// Transport that answers through the router in-process and counts calls.
pub struct InProcessTransport {
    router: Router,
    pub calls: AtomicUsize,
    pub skips: Mutex<Vec<Vec<String>>>,
}

impl InProcessTransport {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            calls: AtomicUsize::new(0),
            skips: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_skip(&self) -> Vec<String> {
        self.skips.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl ElementsTransport for InProcessTransport {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Elements, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.skips.lock().unwrap().push(request.skip.clone());
        let router = self.router.clone();
        Box::pin(async move {
            let file = encode_file_path(&request.route_key, ELEMENTS_FILE_EXTENSION);
            let mut uri = format!("/_elements/{}", file);
            if !request.query.is_empty() {
                uri.push('?');
                uri.push_str(&request.query);
            }
            let skip = serde_json::to_string(&request.skip).unwrap();
            let (status, _, body) = get(&router, &uri, &[(SKIP_HEADER, skip.as_str())]).await;
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            Ok(JsonCodec.decode(body.as_bytes())?)
        })
    }
}
