pub mod model;
pub mod pool;

pub use model::PendingTx;
pub use pool::TxPool;
