use super::metadata::Metadata;
use crate::payload::{EventPayload, PayloadType};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// 事件消息：运行时载荷、元数据与消息属性
#[derive(Debug, Clone)]
pub struct EventMessage {
    identifier: String,
    payload: Arc<dyn EventPayload>,
    metadata: Metadata,
    timestamp: DateTime<Utc>,
    aggregate_id: Option<String>,
    sequence_number: Option<u64>,
}

impl EventMessage {
    /// 以新的标识与当前时间包装载荷
    pub fn new<P: EventPayload>(payload: P) -> Self {
        Self::from_shared(Arc::new(payload))
    }

    pub fn from_shared(payload: Arc<dyn EventPayload>) -> Self {
        Self {
            identifier: Uuid::new_v4().to_string(),
            payload,
            metadata: Metadata::default(),
            timestamp: Utc::now(),
            aggregate_id: None,
            sequence_number: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 标记为领域事件：所属聚合及其在聚合流中的序号
    pub fn with_aggregate(mut self, aggregate_id: impl Into<String>, sequence_number: u64) -> Self {
        self.aggregate_id = Some(aggregate_id.into());
        self.sequence_number = Some(sequence_number);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn payload(&self) -> &Arc<dyn EventPayload> {
        &self.payload
    }

    /// 载荷的运行时类型
    pub fn payload_type(&self) -> PayloadType {
        self.payload.runtime_type()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn aggregate_id(&self) -> Option<&str> {
        self.aggregate_id.as_deref()
    }

    pub fn sequence_number(&self) -> Option<u64> {
        self.sequence_number
    }
}
