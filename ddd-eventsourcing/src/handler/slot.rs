use crate::payload::PayloadType;
use std::any::{Any, TypeId};
use std::fmt;

/// 解析器产出的参数值（类型擦除）
pub type ResolvedValue = Box<dyn Any + Send>;

/// 参数声明类型的标识
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 参数槽的限定信息：告诉解析器"想要什么"
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// 事件载荷本身，声明类型须能接收运行时载荷
    Payload(PayloadType),
    /// 完整元数据
    Metadata,
    /// 单个元数据值
    MetadataValue { key: &'static str, required: bool },
    EventIdentifier,
    Timestamp,
    SequenceNumber,
    AggregateIdentifier,
    /// 整个事件消息
    Message,
    /// 外部依赖，可按名称限定
    Dependency { name: Option<&'static str> },
    /// 自定义解析器使用的标签
    Custom(&'static str),
}

/// 处理器的一个参数槽：声明类型 + 限定信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSlot {
    declared: TypeKey,
    kind: SlotKind,
}

impl ParameterSlot {
    pub fn new(declared: TypeKey, kind: SlotKind) -> Self {
        Self { declared, kind }
    }

    pub fn of<T: ?Sized + 'static>(kind: SlotKind) -> Self {
        Self::new(TypeKey::of::<T>(), kind)
    }

    pub fn declared(&self) -> TypeKey {
        self.declared
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// 载荷槽的声明载荷类型
    pub fn payload_type(&self) -> Option<PayloadType> {
        match self.kind {
            SlotKind::Payload(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_payload(&self) -> bool {
        matches!(self.kind, SlotKind::Payload(_))
    }
}

impl fmt::Display for ParameterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SlotKind::Payload(ty) => write!(f, "payload<{}>", ty.name()),
            SlotKind::Metadata => f.write_str("metadata"),
            SlotKind::MetadataValue { key, .. } => write!(f, "metadata[{key}]: {}", self.declared.name()),
            SlotKind::EventIdentifier => f.write_str("event-identifier"),
            SlotKind::Timestamp => f.write_str("timestamp"),
            SlotKind::SequenceNumber => f.write_str("sequence-number"),
            SlotKind::AggregateIdentifier => f.write_str("aggregate-identifier"),
            SlotKind::Message => f.write_str("message"),
            SlotKind::Dependency { name: Some(name) } => {
                write!(f, "dependency[{name}]: {}", self.declared.name())
            }
            SlotKind::Dependency { name: None } => write!(f, "dependency: {}", self.declared.name()),
            SlotKind::Custom(tag) => write!(f, "{tag}: {}", self.declared.name()),
        }
    }
}
