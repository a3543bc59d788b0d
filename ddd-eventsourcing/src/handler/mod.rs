//! 处理器方法（handler）
//!
//! 处理器就是普通的 Rust 函数 `Fn(&mut E, A1, .., An)`，每个参数 `Ai` 都是一个
//! `Param`：它声明自己需要的参数槽（`ParameterSlot`），并负责把解析器给出的值
//! 还原为具体类型。处理器本身不知道参数来自哪个解析器。

mod handler_fn;
mod param;
mod slot;

pub use handler_fn::{Handler, HandlerOutput};
pub use param::{
    AggregateId, Dep, DynPayload, EventId, MetaValue, MetadataKey, Named, OptionalMetaValue,
    Param, Payload, Qualifier, SequenceNumber, Timestamp,
};
pub use slot::{ParameterSlot, ResolvedValue, SlotKind, TypeKey};
