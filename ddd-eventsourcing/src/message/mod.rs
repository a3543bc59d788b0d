//! 事件消息（EventMessage）
//!
//! 分发的输入单元：运行时载荷 + 与载荷类型无关的元数据，以及标识、时间戳、
//! 所属聚合与序号等消息属性。消息不可变，在整棵实体树的分发过程中按引用传递。

mod event_message;
mod metadata;

pub use event_message::EventMessage;
pub use metadata::Metadata;
