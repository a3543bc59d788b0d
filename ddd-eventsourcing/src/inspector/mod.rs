//! 处理器检查器（HandlerInspector）
//!
//! 按实体类型（`TypeId`）缓存类分析结果：
//! - 首次请求时调用 `describe` 并校验，结果（包括配置错误）缓存到检查器生命周期结束；
//! - 并发的首次请求阻塞在同一个 `OnceLock` 上，最终拿到同一个 `Arc`；
//! - 全局检查器在进程内唯一。
//!
mod analysis;

pub use analysis::{EntityClassAnalysis, HandlerCall, HandlerSignature};
pub(crate) use analysis::erase_call;

use crate::entity::{EntityClass, EventSourcedEntity};
use crate::error::ConfigurationError;
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::sync::{Arc, LazyLock, OnceLock};

type Analysis<E> = Result<Arc<EntityClassAnalysis<E>>, ConfigurationError>;
type AnalysisCell<E> = OnceLock<Analysis<E>>;

static GLOBAL: LazyLock<Arc<HandlerInspector>> =
    LazyLock::new(|| Arc::new(HandlerInspector::new()));

/// 实体类分析缓存
#[derive(Default)]
pub struct HandlerInspector {
    cache: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl HandlerInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程内共享的检查器
    pub fn global() -> Arc<HandlerInspector> {
        Arc::clone(&GLOBAL)
    }

    /// 分析实体类 `E`；同一检查器上重复调用返回同一个 `Arc`
    pub fn analyze<E: EventSourcedEntity>(
        &self,
    ) -> Result<Arc<EntityClassAnalysis<E>>, ConfigurationError> {
        let cell = self.cell_for::<E>()?;
        cell.get_or_init(|| Self::build::<E>()).clone()
    }

    /// `E` 是否已分析过（无论成功与否）
    pub fn is_analyzed<E: EventSourcedEntity>(&self) -> bool {
        self.cache
            .get(&TypeId::of::<E>())
            .and_then(|entry| {
                entry
                    .value()
                    .downcast_ref::<AnalysisCell<E>>()
                    .map(|cell| cell.get().is_some())
            })
            .unwrap_or(false)
    }

    /// 已缓存的实体类数量
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn cell_for<E: EventSourcedEntity>(&self) -> Result<Arc<AnalysisCell<E>>, ConfigurationError> {
        // 只在插入时短暂持有分片锁，分析本身在锁外的 OnceLock 中进行
        let erased = self
            .cache
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Arc::new(AnalysisCell::<E>::new()) as Arc<dyn Any + Send + Sync>)
            .value()
            .clone();
        erased
            .downcast::<AnalysisCell<E>>()
            .map_err(|_| ConfigurationError::CacheTypeMismatch {
                expected: type_name::<E>(),
            })
    }

    fn build<E: EventSourcedEntity>() -> Analysis<E> {
        let entity = E::entity_name();
        let mut class = EntityClass::<E>::new();
        E::describe(&mut class);

        match class.finish() {
            Ok(table) => {
                tracing::debug!(
                    entity,
                    handlers = table.handlers.len(),
                    children = table.children.len(),
                    "entity class analyzed"
                );
                Ok(Arc::new(EntityClassAnalysis::new(
                    entity,
                    table.handlers,
                    table.children,
                )))
            }
            Err(error) => {
                tracing::warn!(entity, %error, "entity class rejected");
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for HandlerInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerInspector")
            .field("classes", &self.cache.len())
            .finish()
    }
}

/// 使用全局检查器分析实体类 `E`
pub fn inspect<E: EventSourcedEntity>() -> Result<Arc<EntityClassAnalysis<E>>, ConfigurationError> {
    GLOBAL.analyze::<E>()
}
