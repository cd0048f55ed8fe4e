use thiserror::Error;

use super::kind::OperationKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("配置缺失或非法: {0}")]
    InvalidConfig(String),
    #[error("操作类型 {0} 未注册适配器")]
    MissingAdapter(OperationKind),
    #[error("操作类型 {0} 未配置容量上限")]
    MissingCapacity(OperationKind),
    #[error("批次组 {0} 仍在运行，需等待完成后再启动")]
    BatchInProgress(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
