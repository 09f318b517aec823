//! Sales analytics over the persisted offer dataset: product rollups, goal
//! tracking and advisor statistics. Every report is a pure function of an
//! [`OfferIndex`] and its parameters.

pub mod advisors;
pub mod cache;
pub mod filters;
pub mod goals;
pub mod index;
pub mod ingest;
pub mod labels;
pub mod offers;
pub mod products;
pub mod store;

pub use advisors::{
    advisor_products, is_known_advisor, months_to_count, AdvisorCustomerStats, AdvisorMonthRow,
    AdvisorMonthTable, AdvisorSalesSeries, SalesCell,
};
pub use cache::{Clock, SystemClock, TtlCache};
pub use filters::{CompanySegment, OfferFilter, UnknownSegment};
pub use goals::{GoalComparison, GoalPoint, SalesGoals};
pub use index::{IndexedOffer, OfferIndex, OfferOutcome};
pub use ingest::{naersikring_offer, OfferSources, SourceFileKind};
pub use labels::{advisor_code, product_label, ADVISOR_ROSTER, OTHER_ADVISORS};
pub use offers::{Company, OfferDataset, OfferRecord};
pub use products::{hit_rate, ProductReport, ProductRow, ProductSort, ProductTotals};
pub use store::{DatasetStore, ReportData, StoreError};
