//! Local endpoints served by the gateway itself: the main page, the
//! favicon and the small JSON API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::BundleConfig;
use crate::frontend::{BundleAsset, StaticBundle};
use crate::http::response::{GatewayError, NormalizedResponse};
use crate::http::server::AppState;

/// Files served outside the checklist mount.
#[derive(Debug, Clone)]
pub struct PageFiles {
    templates: StaticBundle,
    static_files: StaticBundle,
    favicon: String,
}

impl PageFiles {
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            templates: StaticBundle::new(&config.template_dir, &config.main_page),
            static_files: StaticBundle::new(&config.static_dir, &config.index_document),
            favicon: config.favicon.clone(),
        }
    }

    pub async fn main_page(&self) -> Option<BundleAsset> {
        self.templates.index().await
    }

    pub async fn favicon(&self) -> Option<BundleAsset> {
        self.static_files.get(&self.favicon).await
    }
}

/// One entry of the branch catalog.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Branch {
    #[serde(rename = "sigla")]
    pub code: &'static str,
    #[serde(rename = "nome")]
    pub name: &'static str,
    #[serde(rename = "cor")]
    pub color: &'static str,
}

pub static BRANCHES: [Branch; 7] = [
    Branch { code: "GYN", name: "Goiânia - GO", color: "#F58B00" },
    Branch { code: "SPO", name: "São Paulo - SP", color: "#7B1FA2" },
    Branch { code: "DCX", name: "Rio de Janeiro - RJ", color: "#080808" },
    Branch { code: "BSB", name: "Brasília - DF", color: "#FF0000" },
    Branch { code: "APS", name: "Anápolis - GO", color: "#1976D2" },
    Branch { code: "VIX", name: "Serra - ES", color: "#F8F400" },
    Branch { code: "ATM", name: "Altamira - PA", color: "#388E3C" },
];

#[derive(Debug, Deserialize)]
pub struct BranchQuery {
    sigla: Option<String>,
}

fn now() -> String {
    chrono::Local::now().to_rfc3339()
}

pub async fn main_page(State(state): State<AppState>) -> Result<NormalizedResponse, GatewayError> {
    tracing::info!("Main page requested");
    let page = state.pages.main_page().await.ok_or_else(|| {
        tracing::error!(dir = %state.pages.templates.root().display(), "Main page missing");
        GatewayError::BundleUnavailable { path: "/".to_owned() }
    })?;
    Ok(NormalizedResponse::asset(page.body, page.content_type))
}

pub async fn favicon(State(state): State<AppState>) -> Result<NormalizedResponse, GatewayError> {
    let icon = state.pages.favicon().await.ok_or_else(|| GatewayError::NotFound {
        path: "/favicon.ico".to_owned(),
    })?;
    Ok(NormalizedResponse::asset(icon.body, icon.content_type))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": now(),
        "version": state.api.version,
    }))
}

pub async fn config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "API_URL": state.api.api_url,
        "VERSION": state.api.version,
    }))
}

pub async fn live_status(State(state): State<AppState>) -> Json<Value> {
    tracing::info!("Live status requested");
    Json(json!({
        "message": format!("API v{} funcionando!", state.api.version),
        "version": state.api.version,
    }))
}

pub async fn branches() -> Json<&'static [Branch]> {
    tracing::debug!("Listing branches");
    Json(&BRANCHES[..])
}

pub async fn current_branch(Query(query): Query<BranchQuery>) -> Result<Json<Value>, GatewayError> {
    let code = query
        .sigla
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::BadRequest("branch code (sigla) not provided".to_owned()))?;

    tracing::info!(branch = %code, "Branch selected");
    Ok(Json(json!({ "sigla": code, "timestamp": now() })))
}
