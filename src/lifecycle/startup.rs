//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the page registry from the pages directory and configuration
//! - Lock the registry and derive route configs, renderer and handlers
//! - Hand out the request handler, HTTP server and site builder
//!
//! # Design Decisions
//! - Fail fast: any registration or route config error is fatal
//! - Route configs are computed eagerly so errors surface before traffic
//! - One `Site` per process; nothing is global

use std::sync::Arc;

use thiserror::Error;

use crate::build::SiteBuilder;
use crate::config::{ConfigError, SiteConfig};
use crate::elements::{EntriesManager, JsonCodec};
use crate::http::{HttpServer, RequestHandler};
use crate::render::{HtmlRenderer, Renderer, TemplateLoader};
use crate::routing::fs::{FileRouteError, FileRouteOptions, FileRoutes};
use crate::routing::{PageRegistry, PageRouter, RouteConfigError, RouteConfigManager};

/// Errors that stop the process before it serves or builds.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load pages: {0}")]
    Pages(#[from] FileRouteError),

    #[error("Invalid route configuration: {0}")]
    Routes(#[from] RouteConfigError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything derived from one configured registry.
pub struct Site {
    config: SiteConfig,
    router: Arc<PageRouter>,
    entries: EntriesManager,
    renderer: Arc<dyn Renderer>,
}

impl Site {
    /// Scan `config.pages.dir` and register every file route.
    pub fn load(config: SiteConfig) -> Result<Self, StartupError> {
        let routes = FileRoutes::scan(&config.pages.dir)?;
        let options = FileRouteOptions {
            dynamic: config.pages.dynamic.iter().cloned().collect(),
            no_ssr: config.pages.no_ssr.iter().cloned().collect(),
            static_paths: config.pages.static_paths.clone(),
        };
        let loader = TemplateLoader::new(&config.pages.dir);

        let mut registry = PageRegistry::new();
        routes.register(&mut registry, &loader, &options)?;
        tracing::info!(
            dir = %config.pages.dir.display(),
            files = routes.entries().len(),
            "Pages loaded"
        );
        Self::from_registry(config, registry)
    }

    /// Lock `registry` and derive the rest.
    pub fn from_registry(config: SiteConfig, mut registry: PageRegistry) -> Result<Self, StartupError> {
        if !registry.is_configured() {
            registry.mark_configured();
        }
        let router = Arc::new(PageRouter::new(Arc::new(registry)));
        let routes = Arc::new(RouteConfigManager::new(router.clone()));
        let route_count = routes.configs()?.len();

        let mut renderer = HtmlRenderer::new(Arc::new(JsonCodec)).with_head(config.document.head.clone());
        if let Some(src) = &config.document.client_script {
            renderer = renderer.with_client_script(src.clone());
        }

        tracing::info!(routes = route_count, has_404 = routes.has_404()?, "Site ready");
        Ok(Self {
            entries: EntriesManager::new(routes, router.clone()),
            router,
            renderer: Arc::new(renderer),
            config,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn router(&self) -> &Arc<PageRouter> {
        &self.router
    }

    pub fn entries(&self) -> &EntriesManager {
        &self.entries
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn handler(&self) -> RequestHandler {
        RequestHandler::new(self.entries.clone(), self.renderer.clone())
    }

    pub fn server(&self) -> HttpServer {
        HttpServer::new(self.handler(), &self.config.server, &self.config.build.routes_dir)
    }

    pub fn builder(&self) -> SiteBuilder {
        SiteBuilder::new(
            self.entries.clone(),
            self.renderer.clone(),
            self.config.build.out_dir.clone(),
        )
        .with_routes_dir(self.config.build.routes_dir.clone())
        .with_write_concurrency(self.config.build.write_concurrency)
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("config", &self.config)
            .field("entries", &self.entries)
            .finish()
    }
}
