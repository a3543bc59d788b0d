//! 事件溯源实体（EventSourcedEntity）
//!
//! 实体类型通过 `describe` 一次性声明自己的"元数据表"：
//! - 事件处理器方法（可显式指定接收的载荷类型）；
//! - 子实体访问器（单个字段、`Option` 或集合）；
//! - 至多一个祖先（组合式继承），祖先的处理器与访问器经投影提升到派生类型上。
//!
//! 该声明可由 `#[event_sourced]` 宏生成，也可以手写；检查器只在首次分析时调用它。
//!
mod children;
mod class;

pub use children::{AccessorKind, ChildAccessor, ChildEntities, ChildPosition, ChildSink};
pub use class::{EntityClass, HandlerDeclaration};

use crate::invoker::HandlerInvoker;
use crate::resolver::ResolverChain;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// 事件溯源实体
///
/// ```rust
/// use ddd_eventsourcing::entity::{EntityClass, EventSourcedEntity};
/// use ddd_eventsourcing::handler::Payload;
/// use ddd_eventsourcing::payload::{PayloadKind, PayloadType};
///
/// #[derive(Debug)]
/// struct Renamed { name: String }
/// impl PayloadKind for Renamed {
///     fn kind() -> PayloadType {
///         PayloadType::new::<Self>(Vec::new)
///     }
/// }
///
/// #[derive(Default)]
/// struct Profile { name: String }
///
/// impl Profile {
///     fn on_renamed(&mut self, event: Payload<Renamed>) {
///         self.name = event.name.clone();
///     }
/// }
///
/// impl EventSourcedEntity for Profile {
///     fn describe(class: &mut EntityClass<Self>) {
///         class.handler("on_renamed", Self::on_renamed);
///     }
/// }
/// ```
pub trait EventSourcedEntity: Sized + 'static {
    /// 声明处理器、子实体与祖先
    fn describe(class: &mut EntityClass<Self>);

    /// 用于日志与错误信息的实体名
    fn entity_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 实例上缓存调用器的位置；返回 `None` 时每次分发都从检查器缓存重新组装
    fn invoker_slot(&self) -> Option<&InvokerSlot<Self>> {
        None
    }
}

/// 实例级的调用器缓存
///
/// 属于瞬态状态：序列化时应跳过（`#[serde(skip)]`），克隆得到空槽，
/// 反序列化或克隆后的实例在下一次分发时惰性重建。
pub struct InvokerSlot<E> {
    cell: OnceLock<Arc<HandlerInvoker<E>>>,
}

impl<E> InvokerSlot<E> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&Arc<HandlerInvoker<E>>> {
        self.cell.get()
    }

    /// 缓存的调用器是否绑定在 `chain` 上
    pub fn is_bound_to(&self, chain: &Arc<ResolverChain>) -> bool {
        self.get().is_some_and(|invoker| invoker.is_bound_to(chain))
    }

    /// 首次写入生效；已缓存时返回 `false`
    pub(crate) fn store(&self, invoker: Arc<HandlerInvoker<E>>) -> bool {
        self.cell.set(invoker).is_ok()
    }
}

impl<E> Default for InvokerSlot<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for InvokerSlot<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for InvokerSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokerSlot")
            .field("initialized", &self.cell.get().is_some())
            .finish()
    }
}

impl<E> PartialEq for InvokerSlot<E> {
    /// 缓存不参与实体相等性比较
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<E> Eq for InvokerSlot<E> {}
