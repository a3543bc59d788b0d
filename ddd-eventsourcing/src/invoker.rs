//! 处理器调用器（HandlerInvoker）
//!
//! 把一个实体类的分析结果与一条解析链绑定：选出最具体的处理器，按参数顺序
//! 通过解析链取得全部实参，然后调用处理器。任一参数无法解析时方法体不会执行。
//!
use crate::entity::EventSourcedEntity;
use crate::error::{HandlerError, HandlerResult};
use crate::inspector::EntityClassAnalysis;
use crate::message::EventMessage;
use crate::resolver::ResolverChain;
use std::fmt;
use std::sync::Arc;

/// 单个实体处理一条事件的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// 由 `method` 处理
    Handled { method: &'static str },
    /// 没有处理器接收该载荷类型，不算错误
    Unhandled,
}

impl HandleOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, HandleOutcome::Handled { .. })
    }

    pub fn method(&self) -> Option<&'static str> {
        match self {
            HandleOutcome::Handled { method } => Some(*method),
            HandleOutcome::Unhandled => None,
        }
    }
}

/// 绑定了解析链的处理器调用器
pub struct HandlerInvoker<E> {
    analysis: Arc<EntityClassAnalysis<E>>,
    chain: Arc<ResolverChain>,
}

impl<E> HandlerInvoker<E> {
    pub fn new(analysis: Arc<EntityClassAnalysis<E>>, chain: Arc<ResolverChain>) -> Self {
        Self { analysis, chain }
    }

    pub fn analysis(&self) -> &Arc<EntityClassAnalysis<E>> {
        &self.analysis
    }

    pub fn chain(&self) -> &Arc<ResolverChain> {
        &self.chain
    }

    pub fn is_bound_to(&self, chain: &Arc<ResolverChain>) -> bool {
        Arc::ptr_eq(&self.chain, chain)
    }
}

impl<E: EventSourcedEntity> HandlerInvoker<E> {
    /// 用最具体的处理器处理事件
    pub fn invoke(&self, entity: &mut E, event: &EventMessage) -> HandlerResult<HandleOutcome> {
        let runtime = event.payload_type();
        let Some(handler) = self.analysis.select(&runtime)? else {
            return Ok(HandleOutcome::Unhandled);
        };

        let mut args = Vec::with_capacity(handler.slots().len());
        for (index, slot) in handler.slots().iter().enumerate() {
            let resolver = self.chain.resolver_for(slot).ok_or_else(|| {
                HandlerError::UnresolvableParameter {
                    entity: self.analysis.entity_name(),
                    method: handler.method(),
                    index,
                    slot: slot.to_string(),
                }
            })?;
            args.push(resolver.resolve(slot, event)?);
        }

        tracing::trace!(
            entity = self.analysis.entity_name(),
            method = handler.method(),
            payload = runtime.name(),
            "invoking handler"
        );
        handler.call(entity, args)?;
        Ok(HandleOutcome::Handled {
            method: handler.method(),
        })
    }
}

impl<E> fmt::Debug for HandlerInvoker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInvoker")
            .field("entity", &self.analysis.entity_name())
            .field("chain", &self.chain)
            .finish()
    }
}
