//! 参数解析（ParameterResolver）与解析链（ResolverChain）
//!
//! 每个解析器只回答两个问题：能否为某个参数槽提供值（`accepts`），以及从事件消息
//! 中产出该值（`resolve`，仅在 `accepts` 为真时调用）。解析链按顺序组合解析器，
//! 对外暴露同样的契约，由第一个接受该槽的成员负责解析。
//!
//! 顺序属于配置而非运行时协商：宽泛的解析器放在前面会遮蔽后面更专用的解析器，
//! 因此推荐的顺序是"载荷/元数据/消息属性"等专用解析器在前，依赖查找等宽泛解析器在后。
//!
mod builtin;
mod chain;
mod dependency;
mod scope;

pub use builtin::{MessagePropertyResolver, MetadataResolver, PayloadResolver};
pub use chain::{ResolverChain, ResolverChainBuilder, build_resolver_chain};
pub use dependency::{DependencyResolver, DependencyResolverBuilder};
pub use scope::{ChainScope, ResolverScope};

use crate::error::HandlerResult;
use crate::handler::{ParameterSlot, ResolvedValue};
use crate::message::EventMessage;
use std::sync::Arc;

/// 参数解析器
pub trait ParameterResolver: Send + Sync {
    /// 解析器名称（用于日志与错误）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 被发现的解析器在链中的排序优先级，越大越靠前
    fn priority(&self) -> i32 {
        0
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool;

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue>;

    /// 若自身是解析链则返回之，用于构建时展开嵌套链
    fn as_chain(&self) -> Option<&ResolverChain> {
        None
    }
}

impl<T> ParameterResolver for Arc<T>
where
    T: ParameterResolver + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        (**self).accepts(slot)
    }

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue> {
        (**self).resolve(slot, event)
    }

    fn as_chain(&self) -> Option<&ResolverChain> {
        (**self).as_chain()
    }
}
