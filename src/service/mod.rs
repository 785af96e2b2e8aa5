pub mod catalog;
pub mod checkout;
pub mod matcher;
pub mod pricing;
pub mod purchase;
pub mod reconcile;
pub mod reports;
pub mod scan;

pub use catalog::CatalogService;
pub use checkout::{Cart, CheckoutService};
pub use pricing::PricingCalculator;
pub use purchase::PurchaseService;
pub use reconcile::ReconciliationSession;
pub use reports::ReportService;
pub use scan::AiReceiptScanner;
