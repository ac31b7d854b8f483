pub mod categories;
pub mod inventory_transactions;
pub mod orders;
pub mod products;
pub mod reservations;
pub mod stock;
pub mod warehouses;

pub use categories::CategoryService;
pub use inventory_transactions::InventoryTransactionService;
pub use orders::OrderService;
pub use products::ProductService;
pub use reservations::ReservationService;
pub use stock::StockService;
pub use warehouses::WarehouseService;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// All services wired onto a shared connection pool.
///
/// The pool handle is injected explicitly; there is no ambient global
/// connection. Pass an `EventSender` to receive domain events, or `None`
/// to run without them.
#[derive(Clone)]
pub struct Services {
    pub categories: CategoryService,
    pub products: ProductService,
    pub warehouses: WarehouseService,
    pub stock: StockService,
    pub reservations: ReservationService,
    pub inventory_transactions: InventoryTransactionService,
    pub orders: OrderService,
}

impl Services {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        let reservations = ReservationService::new(db_pool.clone(), event_sender.clone());
        let inventory_transactions =
            InventoryTransactionService::new(db_pool.clone(), event_sender.clone());

        Self {
            categories: CategoryService::new(db_pool.clone()),
            products: ProductService::new(db_pool.clone()),
            warehouses: WarehouseService::new(db_pool.clone()),
            stock: StockService::new(db_pool.clone(), event_sender.clone()),
            orders: OrderService::new(
                db_pool,
                reservations.clone(),
                inventory_transactions.clone(),
                event_sender,
            ),
            reservations,
            inventory_transactions,
        }
    }
}
