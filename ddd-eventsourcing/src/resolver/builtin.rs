//! 内置的专用解析器
use super::ParameterResolver;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{ParameterSlot, ResolvedValue, SlotKind};
use crate::message::EventMessage;
use std::sync::Arc;

/// 提供事件载荷本身
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadResolver;

impl ParameterResolver for PayloadResolver {
    fn name(&self) -> &str {
        "payload"
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        slot.is_payload()
    }

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue> {
        let runtime = event.payload_type();
        match slot.payload_type() {
            Some(declared) if declared.is_assignable_from(&runtime) => {
                Ok(Box::new(Arc::clone(event.payload())))
            }
            Some(declared) => Err(HandlerError::TypeMismatch {
                expected: declared.name(),
                found: runtime.name(),
            }),
            None => Err(HandlerError::resolution(self.name(), format!("not a payload slot: {slot}"))),
        }
    }
}

/// 提供完整元数据或单个元数据值
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataResolver;

impl ParameterResolver for MetadataResolver {
    fn name(&self) -> &str {
        "metadata"
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        matches!(slot.kind(), SlotKind::Metadata | SlotKind::MetadataValue { .. })
    }

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue> {
        match slot.kind() {
            SlotKind::Metadata => Ok(Box::new(event.metadata().clone())),
            SlotKind::MetadataValue { key, required } => {
                let value = event.metadata().get(key).cloned();
                if required && value.is_none() {
                    return Err(HandlerError::MissingMetadata { key });
                }
                Ok(Box::new(value))
            }
            _ => Err(HandlerError::resolution(self.name(), format!("not a metadata slot: {slot}"))),
        }
    }
}

/// 提供消息属性：标识、时间戳、聚合标识、序号与整个消息
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePropertyResolver;

impl ParameterResolver for MessagePropertyResolver {
    fn name(&self) -> &str {
        "message-property"
    }

    fn accepts(&self, slot: &ParameterSlot) -> bool {
        matches!(
            slot.kind(),
            SlotKind::EventIdentifier
                | SlotKind::Timestamp
                | SlotKind::SequenceNumber
                | SlotKind::AggregateIdentifier
                | SlotKind::Message
        )
    }

    fn resolve(&self, slot: &ParameterSlot, event: &EventMessage) -> HandlerResult<ResolvedValue> {
        match slot.kind() {
            SlotKind::EventIdentifier => Ok(Box::new(event.identifier().to_string())),
            SlotKind::Timestamp => Ok(Box::new(*event.timestamp())),
            SlotKind::SequenceNumber => event
                .sequence_number()
                .map(|seq| Box::new(seq) as ResolvedValue)
                .ok_or_else(|| {
                    HandlerError::resolution(self.name(), "event carries no sequence number")
                }),
            SlotKind::AggregateIdentifier => event
                .aggregate_id()
                .map(|id| Box::new(id.to_string()) as ResolvedValue)
                .ok_or_else(|| {
                    HandlerError::resolution(self.name(), "event carries no aggregate identifier")
                }),
            SlotKind::Message => Ok(Box::new(event.clone())),
            _ => Err(HandlerError::resolution(self.name(), format!("not a message slot: {slot}"))),
        }
    }
}
