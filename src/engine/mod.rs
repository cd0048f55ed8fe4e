//! 批次编排核心：容量校验、买方分摊、顺序执行与结果汇总。

pub mod capacity;
mod error;
pub mod executor;
pub mod fanout;
mod kind;
pub mod plan;
mod types;

pub use capacity::CapacityTable;
pub use error::{EngineError, EngineResult};
pub use executor::SequentialExecutor;
pub use fanout::{BuyerConfig, SellerConfig, allocate, expand_rotations};
pub use kind::{Direction, OperationKind, Protocol};
pub use plan::BatchPlan;
pub use types::{
    Batch, BatchReport, FailureStage, OperationParams, OperationResult, TokenMetadata, UnitOfWork,
};
