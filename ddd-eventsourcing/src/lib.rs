//! 事件溯源实体的事件处理器分发库（ddd-eventsourcing）
//!
//! 把一条事件路由到聚合树中每个实体上"最具体"的处理器方法，并通过可插拔、
//! 有序的参数解析链为处理器提供实参：
//! - 载荷类型格（`payload`）：载荷及其声明的超类型，决定处理器的适用范围；
//! - 事件消息（`message`）：载荷、元数据与消息属性；
//! - 处理器与参数（`handler`）：普通函数作为处理器，每个参数声明自己的参数槽；
//! - 参数解析（`resolver`）：解析器与解析链，链中第一个接受参数槽的解析器负责取值；
//! - 实体声明（`entity`）与检查器（`inspector`）：每个实体类只分析一次并缓存；
//! - 调用器（`invoker`）与分发器（`dispatcher`）：选择处理器、解析参数、遍历实体树。
//!
//! 本 crate 不关心事件何时重放、如何序列化以及事务边界，这些由宿主环境决定。
//!
//! 典型用法：
//! 1. 用 `#[derive(EventPayload)]` 定义载荷及其超类型；
//! 2. 用 `#[event_sourced]` 与 `#[event_handler]` 声明实体的处理器与子实体；
//! 3. 构建一次解析链（`ResolverChain::builder()`），在作用域内共享；
//! 4. 通过 `Dispatcher::apply` 或 `dispatch` 把事件应用到聚合根。
//!
pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod handler;
pub mod inspector;
pub mod invoker;
pub mod message;
pub mod payload;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use config::{DispatcherConfig, TraversalPolicy};
pub use dispatcher::{DispatchReport, DispatchTarget, Dispatcher, EntityOutcome, dispatch};
pub use entity::{EntityClass, EventSourcedEntity, InvokerSlot};
pub use error::{ConfigurationError, HandlerError, HandlerResult};
pub use inspector::{HandlerInspector, inspect};
pub use invoker::{HandleOutcome, HandlerInvoker};
pub use message::{EventMessage, Metadata};
pub use resolver::{ParameterResolver, ResolverChain, build_resolver_chain};

// 允许在本 crate 内部通过 ::ddd_eventsourcing 进行自引用，
// 以便过程宏在本 crate 的单元测试与文档测试中也能解析到 ::ddd_eventsourcing 路径。
extern crate self as ddd_eventsourcing;
