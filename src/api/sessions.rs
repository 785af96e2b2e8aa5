use crate::api::{ApiResponse, AppState};
use crate::error::AppError;
use crate::models::{CatalogProduct, PurchaseOrder, PurchaseTotals, SavedOrder, ScannedEntry};
use crate::service::reconcile::{ReconcileError, ReconciliationSession};
use crate::service::scan::ScanError;
use axum::extract::{Json, Path, Query, State};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bigdecimal::BigDecimal;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// 会话闲置超过该时长后, 在下一次新建会话时清除
pub const SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Clone)]
struct StoredSession {
    session: ReconciliationSession,
    touched: Instant,
}

/// 进货对账会话存储
///
/// 每次操作以新会话整体替换旧值; 保存或取消后删除.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<Uuid, StoredSession>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, session: ReconciliationSession) -> Uuid {
        self.evict_idle();
        let id = Uuid::new_v4();
        self.restore(id, session);
        id
    }

    /// 按原 id 放回 (保存失败时)
    pub fn restore(&self, id: Uuid, session: ReconciliationSession) {
        self.inner.insert(
            id,
            StoredSession {
                session,
                touched: Instant::now(),
            },
        );
    }

    pub fn get(&self, id: &Uuid) -> Option<ReconciliationSession> {
        self.inner.get(id).map(|s| s.session.clone())
    }

    /// 取出会话; 同一会话只有一个调用方能取到
    pub fn remove(&self, id: &Uuid) -> Option<ReconciliationSession> {
        self.inner.remove(id).map(|(_, s)| s.session)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 在条目锁内计算新会话并替换; 失败时保持原值
    pub fn apply<F>(&self, id: &Uuid, f: F) -> Result<ReconciliationSession, AppError>
    where
        F: FnOnce(&ReconciliationSession) -> Result<ReconciliationSession, ReconcileError>,
    {
        let mut entry = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("purchase session {id}")))?;
        let next = f(&entry.session)?;
        entry.session = next.clone();
        entry.touched = Instant::now();
        Ok(next)
    }

    fn evict_idle(&self) {
        let before = self.inner.len();
        let ttl = self.ttl;
        self.inner.retain(|_, s| s.touched.elapsed() < ttl);
        let evicted = before.saturating_sub(self.inner.len());
        if evicted > 0 {
            tracing::info!("清除 {} 个闲置进货会话", evicted);
        }
    }
}

/// 会话视图 (含实时合计)
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub session: ReconciliationSession,
    pub totals: PurchaseTotals,
}

impl SessionView {
    fn new(session_id: Uuid, session: ReconciliationSession) -> Self {
        let totals = session.totals();
        Self {
            session_id,
            session,
            totals,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub supplier: Option<String>,
    pub entries: Vec<ScannedEntry>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let session = state.purchase.start_session(req.supplier, &req.entries).await?;
    let id = state.sessions.insert(session.clone());
    tracing::info!("进货会话 {} 已创建 ({} 条录入)", id, req.entries.len());
    Ok(ApiResponse::ok("session created", SessionView::new(id, session)))
}

#[derive(Debug, Deserialize)]
pub struct ScanSessionRequest {
    #[serde(default)]
    pub supplier: Option<String>,
    pub image_base64: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}

/// 上传进货单图片 -> AI 识别 -> 对账
pub async fn scan_session(
    State(state): State<AppState>,
    Json(req): Json<ScanSessionRequest>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let scanner = state.scanner.as_ref().ok_or(ScanError::NotConfigured)?;
    let image = STANDARD
        .decode(req.image_base64.trim())
        .map_err(|e| AppError::Validation(format!("image_base64 is not valid base64: {e}")))?;
    if image.is_empty() {
        return Err(AppError::Validation("image is empty".to_string()));
    }

    let catalog = state.purchase.catalog().await?;
    let known_names: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();
    let entries = scanner.scan(&image, &req.mime_type, &known_names).await?;

    let session = ReconciliationSession::reconcile(req.supplier, &entries, &catalog);
    let id = state.sessions.insert(session.clone());
    tracing::info!("进货会话 {} 由扫描创建 ({} 条识别)", id, entries.len());
    Ok(ApiResponse::ok("receipt scanned", SessionView::new(id, session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("purchase session {id}")))?;
    Ok(ApiResponse::ok("session", SessionView::new(id, session)))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("purchase session {id}")))?;
    tracing::info!("进货会话 {} 已取消", id);
    Ok(ApiResponse::ok("session cancelled", id))
}

/// 会话操作
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    SelectMatch {
        index: usize,
        product_id: i64,
    },
    Skip {
        index: usize,
    },
    AddManual {
        product_id: i64,
        box_count: BigDecimal,
        units_per_box: i64,
        unit_price: BigDecimal,
    },
    SetUnitsPerBox {
        index: usize,
        value: i64,
    },
    SetTotalUnits {
        index: usize,
        value: BigDecimal,
    },
}

pub async fn session_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(action): Json<SessionAction>,
) -> Result<Json<ApiResponse<SessionView>>, AppError> {
    let current = state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("purchase session {id}")))?;

    // 需要商品的操作先在锁外查好商品
    let product = match &action {
        SessionAction::SelectMatch { index, product_id } => {
            let suggested = current
                .unmatched
                .get(*index)
                .and_then(|u| u.suggestions.iter().find(|p| p.id == *product_id).cloned());
            match suggested {
                Some(p) => Some(p),
                None => Some(lookup_product(&state, *product_id).await?),
            }
        }
        SessionAction::AddManual { product_id, .. } => Some(lookup_product(&state, *product_id).await?),
        _ => None,
    };

    let session = state.sessions.apply(&id, |session| match (&action, &product) {
        (SessionAction::SelectMatch { index, .. }, Some(p)) => session.select_match(*index, p),
        (SessionAction::Skip { index }, _) => session.skip_unmatched(*index),
        (
            SessionAction::AddManual {
                box_count,
                units_per_box,
                unit_price,
                ..
            },
            Some(p),
        ) => Ok(session.add_manual_line_item(p, box_count.clone(), *units_per_box, unit_price.clone())),
        (SessionAction::SetUnitsPerBox { index, value }, _) => {
            session.update_units_per_box(*index, *value)
        }
        (SessionAction::SetTotalUnits { index, value }, _) => {
            session.update_total_units(*index, value)
        }
        (SessionAction::SelectMatch { product_id, .. }, None)
        | (SessionAction::AddManual { product_id, .. }, None) => {
            Err(ReconcileError::ProductNotFound(*product_id))
        }
    })?;

    Ok(ApiResponse::ok("session updated", SessionView::new(id, session)))
}

async fn lookup_product(state: &AppState, product_id: i64) -> Result<CatalogProduct, AppError> {
    state
        .purchase
        .catalog()
        .await?
        .into_iter()
        .find(|p| p.id == product_id)
        .ok_or(AppError::Reconcile(ReconcileError::ProductNotFound(product_id)))
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub confirm_unmatched: bool,
}

/// 保存进货单; 成功后会话删除, 失败时按原 id 放回
pub async fn save_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveSessionRequest>,
) -> Result<Json<ApiResponse<SavedOrder>>, AppError> {
    // 先取出会话, 并发的重复保存会得到 NotFound
    let session = state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("purchase session {id}")))?;

    let saved = match state.purchase.save(&session, req.confirm_unmatched).await {
        Ok(saved) => saved,
        Err(e) => {
            state.sessions.restore(id, session);
            return Err(e);
        }
    };

    Ok(ApiResponse::ok(
        format!("purchase order {} saved", saved.order_id),
        saved,
    ))
}

#[derive(Debug, Deserialize)]
pub struct RecentOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn recent_orders(
    State(state): State<AppState>,
    Query(query): Query<RecentOrdersQuery>,
) -> Result<Json<ApiResponse<Vec<PurchaseOrder>>>, AppError> {
    let orders = state.purchase.recent_orders(query.limit.clamp(1, 500)).await?;
    Ok(ApiResponse::ok(format!("{} orders", orders.len()), orders))
}
