//! 单元测试共用的载荷
use crate::payload::{PayloadKind, PayloadType};

#[derive(Debug)]
pub(crate) struct Noop;

impl PayloadKind for Noop {
    fn kind() -> PayloadType {
        PayloadType::new::<Self>(Vec::new)
    }
}

pub(crate) enum LedgerEvent {}

impl PayloadKind for LedgerEvent {
    fn kind() -> PayloadType {
        PayloadType::new::<Self>(Vec::new)
    }
}

#[derive(Debug)]
pub(crate) struct Posted {
    pub(crate) amount: i64,
}

impl PayloadKind for Posted {
    fn kind() -> PayloadType {
        PayloadType::new::<Self>(|| vec![LedgerEvent::kind()])
    }
}

#[derive(Debug)]
pub(crate) struct Reversed {
    pub(crate) amount: i64,
}

impl PayloadKind for Reversed {
    fn kind() -> PayloadType {
        PayloadType::new::<Self>(|| vec![LedgerEvent::kind()])
    }
}
