pub mod cart;
pub mod dashboard;
pub mod database;
pub mod jwt;
pub mod order;
pub mod pricing;
pub mod queue;

pub use cart::{CartOwner, CartService};
pub use dashboard::{DashboardService, RevenueBucket, SalesTotals, TopProduct};
pub use database::StoreDb;
pub use jwt::{Claims, JwtService};
pub use order::{CreateOrder, OrderService, SelectedLine};
pub use pricing::{OrderTotals, PricingPolicy};
pub use queue::EmailQueue;
