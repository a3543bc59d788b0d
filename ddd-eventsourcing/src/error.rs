//! 分发引擎统一错误定义
//!
//! - `ConfigurationError`：无需具体事件即可发现的结构性问题（重复处理器、歧义等），
//!   在检查期或首次选择时产生，并随类分析一起缓存；
//! - `HandlerError`：一次分发中产生的错误，包括参数无法解析与处理器方法体的失败。
//!
use thiserror::Error;

/// 实体类配置错误（可克隆，便于缓存后多次返回）
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error(
        "duplicate handler: entity={entity}, payload={payload}, methods=[{first}, {second}]"
    )]
    DuplicateHandler {
        entity: &'static str,
        payload: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[error("duplicate handler method: entity={entity}, method={method}")]
    DuplicateMethod {
        entity: &'static str,
        method: &'static str,
    },
    #[error(
        "missing payload type: entity={entity}, method={method}; first parameter must be a payload or the payload type must be declared"
    )]
    MissingPayloadType {
        entity: &'static str,
        method: &'static str,
    },
    #[error(
        "incompatible payload parameter: entity={entity}, method={method}, accepts={accepts}, parameter={parameter}"
    )]
    IncompatiblePayloadParameter {
        entity: &'static str,
        method: &'static str,
        accepts: &'static str,
        parameter: &'static str,
    },
    #[error("multiple ancestors declared: entity={entity}")]
    MultipleAncestors { entity: &'static str },
    #[error("ambiguous handler: entity={entity}, payload={payload}, candidates={candidates:?}")]
    AmbiguousHandler {
        entity: &'static str,
        payload: &'static str,
        candidates: Vec<&'static str>,
    },
    #[error("analysis cache type mismatch: expected={expected}")]
    CacheTypeMismatch { expected: &'static str },
}

/// 分发错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(
        "unresolvable parameter: entity={entity}, method={method}, index={index}, slot={slot}"
    )]
    UnresolvableParameter {
        entity: &'static str,
        method: &'static str,
        index: usize,
        slot: String,
    },

    #[error("parameter resolution failed: resolver={resolver}, reason={reason}")]
    Resolution { resolver: String, reason: String },

    #[error("missing metadata: key={key}")]
    MissingMetadata { key: &'static str },

    #[error("metadata decode failed: key={key}, source={source}")]
    MetadataDecode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("argument count mismatch: expected={expected}, actual={actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// 处理器方法体返回的错误，原样透传
    #[error(transparent)]
    Handler(anyhow::Error),

    #[error("{} entities failed", .0.len())]
    EntityFailures(Vec<EntityFailure>),
}

impl HandlerError {
    pub fn resolution(resolver: impl Into<String>, reason: impl Into<String>) -> Self {
        HandlerError::Resolution {
            resolver: resolver.into(),
            reason: reason.into(),
        }
    }

    /// 处理器方法体的原始错误（若是）
    pub fn handler_source(&self) -> Option<&anyhow::Error> {
        match self {
            HandlerError::Handler(source) => Some(source),
            _ => None,
        }
    }
}

/// 遍历中单个实体的失败记录
#[derive(Debug)]
pub struct EntityFailure {
    pub path: String,
    pub entity: &'static str,
    pub error: HandlerError,
}

/// 统一 Result 类型别名
pub type HandlerResult<T> = Result<T, HandlerError>;
