use super::slot::{ParameterSlot, ResolvedValue, SlotKind};
use crate::error::{HandlerError, HandlerResult};
use crate::message::{EventMessage, Metadata};
use crate::payload::{AnyPayload, EventPayload, PayloadKind, PayloadType, downcast_payload};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// 处理器参数：声明参数槽，并把解析结果还原为自身
pub trait Param: Sized + Send + 'static {
    fn slot() -> ParameterSlot;

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self>;
}

fn take<T: 'static>(value: ResolvedValue) -> HandlerResult<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| HandlerError::TypeMismatch {
            expected: type_name::<T>(),
            found: "unknown",
        })
}

// ---- payload ----

/// 具体类型的事件载荷
///
/// 声明为抽象超类型（不可实例化的标记类型）时无法向下转型，应改用 `DynPayload`。
#[derive(Debug)]
pub struct Payload<P>(pub Arc<P>);

impl<P> Deref for Payload<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.0
    }
}

impl<P: EventPayload + PayloadKind> Param for Payload<P> {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<P>(SlotKind::Payload(P::kind()))
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        let shared: Arc<dyn EventPayload> = take(value)?;
        let found = shared.runtime_type().name();
        downcast_payload::<P>(shared)
            .map(Payload)
            .map_err(|_| HandlerError::TypeMismatch {
                expected: type_name::<P>(),
                found,
            })
    }
}

/// 未向下转型的共享载荷，适用于声明为超类型的处理器
#[derive(Debug, Clone)]
pub struct DynPayload(pub Arc<dyn EventPayload>);

impl DynPayload {
    pub fn payload_type(&self) -> PayloadType {
        self.0.runtime_type()
    }

    pub fn downcast_ref<P: EventPayload>(&self) -> Option<&P> {
        self.0.downcast_ref::<P>()
    }
}

impl Param for DynPayload {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<dyn EventPayload>(SlotKind::Payload(AnyPayload::kind()))
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        take::<Arc<dyn EventPayload>>(value).map(DynPayload)
    }
}

// ---- metadata ----

impl Param for Metadata {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<Metadata>(SlotKind::Metadata)
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        take(value)
    }
}

/// 元数据键：键名与值类型
pub trait MetadataKey: 'static {
    const KEY: &'static str;
    type Value: DeserializeOwned + Send + 'static;
}

/// 必需的单个元数据值，缺失时解析失败
pub struct MetaValue<K: MetadataKey>(pub K::Value);

impl<K: MetadataKey> Deref for MetaValue<K> {
    type Target = K::Value;

    fn deref(&self) -> &K::Value {
        &self.0
    }
}

impl<K: MetadataKey> Param for MetaValue<K> {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<K::Value>(SlotKind::MetadataValue {
            key: K::KEY,
            required: true,
        })
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        let raw = take::<Option<Value>>(value)?
            .ok_or(HandlerError::MissingMetadata { key: K::KEY })?;
        decode::<K>(raw).map(MetaValue)
    }
}

/// 可选的单个元数据值
pub struct OptionalMetaValue<K: MetadataKey>(pub Option<K::Value>);

impl<K: MetadataKey> Param for OptionalMetaValue<K> {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<K::Value>(SlotKind::MetadataValue {
            key: K::KEY,
            required: false,
        })
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        match take::<Option<Value>>(value)? {
            Some(raw) => decode::<K>(raw).map(|v| OptionalMetaValue(Some(v))),
            None => Ok(OptionalMetaValue(None)),
        }
    }
}

fn decode<K: MetadataKey>(raw: Value) -> HandlerResult<K::Value> {
    serde_json::from_value(raw).map_err(|source| HandlerError::MetadataDecode {
        key: K::KEY,
        source,
    })
}

// ---- message properties ----

macro_rules! message_property {
    ($(#[$doc:meta])* $name:ident($inner:ty) => $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(pub $inner);

        impl Param for $name {
            fn slot() -> ParameterSlot {
                ParameterSlot::of::<$inner>(SlotKind::$kind)
            }

            fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
                take::<$inner>(value).map($name)
            }
        }
    };
}

message_property!(
    /// 事件标识
    EventId(String) => EventIdentifier
);
message_property!(
    /// 事件时间戳
    Timestamp(DateTime<Utc>) => Timestamp
);
message_property!(
    /// 事件在聚合流中的序号
    SequenceNumber(u64) => SequenceNumber
);
message_property!(AggregateId(String) => AggregateIdentifier);

impl Param for EventMessage {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<EventMessage>(SlotKind::Message)
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        take(value)
    }
}

// ---- dependencies ----

fn take_shared<T: Any + Send + Sync>(value: ResolvedValue) -> HandlerResult<Arc<T>> {
    take::<Arc<dyn Any + Send + Sync>>(value)?
        .downcast::<T>()
        .map_err(|_| HandlerError::TypeMismatch {
            expected: type_name::<T>(),
            found: "unknown",
        })
}

/// 按类型查找的外部依赖
pub struct Dep<T>(pub Arc<T>);

impl<T> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Any + Send + Sync> Param for Dep<T> {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<T>(SlotKind::Dependency { name: None })
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        take_shared::<T>(value).map(Dep)
    }
}

/// 依赖限定名
pub trait Qualifier: 'static {
    const NAME: &'static str;
}

/// 按类型与限定名查找的外部依赖
pub struct Named<T, Q>(pub Arc<T>, PhantomData<fn() -> Q>);

impl<T, Q> Named<T, Q> {
    pub fn new(value: Arc<T>) -> Self {
        Named(value, PhantomData)
    }
}

impl<T, Q> Deref for Named<T, Q> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Any + Send + Sync, Q: Qualifier> Param for Named<T, Q> {
    fn slot() -> ParameterSlot {
        ParameterSlot::of::<T>(SlotKind::Dependency {
            name: Some(Q::NAME),
        })
    }

    fn from_resolved(value: ResolvedValue) -> HandlerResult<Self> {
        take_shared::<T>(value).map(Named::new)
    }
}
