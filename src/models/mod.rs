pub mod money;
pub mod pricing;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;

pub use money::round2;
pub use pricing::{BreakEven, CostStructure, FixedCost, PricingInputs, PricingResult};
pub use product::{
    CatalogProduct, NewPrice, NewProduct, ProductPrice, ProductRow, ProductWithPrice,
    StockAdjustment, Unit,
};
pub use purchase::{
    purchase_tax_rate, LineItem, PurchaseOrder, PurchaseTotals, SavedOrder, ScannedEntry,
    UnmatchedEntry,
};
pub use report::{ProductProfit, ReportRange, ReportTotals, SalesDay};
pub use sale::{CheckoutLine, CheckoutReceipt, CheckoutRequest, Receipt, ReceiptLine, SaleType};
