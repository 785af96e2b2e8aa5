use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use winkel_pos::api::{self, AppState};
use winkel_pos::service::AiReceiptScanner;
use winkel_pos::{create_pool, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let scanner = AiReceiptScanner::from_config(&config.scan)?;
    if scanner.is_none() {
        warn!("未配置 scan.api_key, 进货单图片识别不可用");
    }

    let state = AppState::new(pool, scanner, config.pricing.clone());
    let app = api::router(state).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = config.listen_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET    /api/products                       - 商品目录 (含当前价格)");
    info!("  POST   /api/products                       - 新建商品");
    info!("  POST   /api/products/:id/prices            - 记录价格");
    info!("  POST   /api/products/:id/stock             - 调整库存");
    info!("  DELETE /api/products/:id                   - 下架商品");
    info!("  POST   /api/pricing/calculate              - 定价计算");
    info!("  GET    /api/pricing/break-even             - 保本点");
    info!("  GET    /api/purchase/orders                - 最近进货单");
    info!("  POST   /api/purchase/sessions              - 手工录入对账");
    info!("  POST   /api/purchase/sessions/scan         - 图片识别对账");
    info!("  GET    /api/purchase/sessions/:id          - 查看会话");
    info!("  POST   /api/purchase/sessions/:id/actions  - 会话操作");
    info!("  POST   /api/purchase/sessions/:id/save     - 保存进货单");
    info!("  DELETE /api/purchase/sessions/:id          - 取消会话");
    info!("  POST   /api/checkout                       - 收银");
    info!("  GET    /api/reports/sales                  - 每日销售");
    info!("  GET    /api/reports/products[.csv]         - 单品利润");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
