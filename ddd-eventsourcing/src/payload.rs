//! 事件载荷类型（Payload）与类型格（type lattice）
//!
//! Rust 没有类继承，这里用显式声明的"超类型"列表表达载荷之间的子类型关系：
//! - 具体载荷（struct/enum）实现 `PayloadKind`，并声明自己的直接超类型；
//! - 抽象超类型通常是不可实例化的空枚举（如 `enum AccountEvent {}`），同样实现 `PayloadKind`；
//! - `AnyPayload` 是整个类型格的顶端，任何载荷都可赋值给它。
//!
//! 处理器选择只依赖 `PayloadType::is_assignable_from`，因此该关系必须自反且可传递。
//!
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 载荷类型描述：类型标识、名称与直接超类型
#[derive(Clone, Copy)]
pub struct PayloadType {
    type_id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<PayloadType>,
}

impl PayloadType {
    /// 为类型 `T` 创建描述，`supertypes` 返回其直接超类型
    pub fn new<T: ?Sized + 'static>(supertypes: fn() -> Vec<PayloadType>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            supertypes,
        }
    }

    /// 读取 `P` 的载荷类型
    pub fn of<P: PayloadKind>() -> Self {
        P::kind()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 直接超类型
    pub fn supertypes(&self) -> Vec<PayloadType> {
        (self.supertypes)()
    }

    pub fn is_top(&self) -> bool {
        self.type_id == TypeId::of::<AnyPayload>()
    }

    /// `other` 的值能否交给声明为 `self` 的处理器（`self` 是 `other` 的超类型或同一类型）
    pub fn is_assignable_from(&self, other: &PayloadType) -> bool {
        if self.is_top() || self == other {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|parent| self.is_assignable_from(parent))
    }

    /// `self` 是 `other` 的严格超类型
    pub fn is_strict_supertype_of(&self, other: &PayloadType) -> bool {
        self != other && self.is_assignable_from(other)
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for PayloadType {}

impl Hash for PayloadType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 静态侧的载荷声明：给出类型在类型格中的位置
///
/// 通常由 `#[derive(EventPayload)]` 生成，也可以手写：
///
/// ```rust
/// use ddd_eventsourcing::payload::{PayloadKind, PayloadType};
///
/// pub enum AccountEvent {}
/// impl PayloadKind for AccountEvent {
///     fn kind() -> PayloadType {
///         PayloadType::new::<Self>(Vec::new)
///     }
/// }
///
/// #[derive(Debug)]
/// pub struct Deposited { pub amount: i64 }
/// impl PayloadKind for Deposited {
///     fn kind() -> PayloadType {
///         PayloadType::new::<Self>(|| vec![AccountEvent::kind()])
///     }
/// }
///
/// assert!(AccountEvent::kind().is_assignable_from(&Deposited::kind()));
/// ```
pub trait PayloadKind: 'static {
    fn kind() -> PayloadType;
}

/// 类型格顶端：接受任意载荷
#[derive(Debug)]
pub enum AnyPayload {}

impl PayloadKind for AnyPayload {
    fn kind() -> PayloadType {
        PayloadType::new::<Self>(Vec::new)
    }
}

/// 将 `Arc<Self>` 擦除为 `Arc<dyn Any>`，供参数提取时向下转型
pub trait AsAnyArc: Any + Send + Sync {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn as_any_ref(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn as_any_ref(&self) -> &dyn Any {
        self
    }
}

/// 运行时载荷：事件消息中携带的对象安全视图
pub trait EventPayload: AsAnyArc + fmt::Debug {
    /// 运行时类型，驱动处理器选择
    fn runtime_type(&self) -> PayloadType;
}

impl<T> EventPayload for T
where
    T: PayloadKind + fmt::Debug + Send + Sync,
{
    fn runtime_type(&self) -> PayloadType {
        T::kind()
    }
}

impl dyn EventPayload {
    /// 按具体类型借用载荷
    pub fn downcast_ref<P: EventPayload>(&self) -> Option<&P> {
        AsAnyArc::as_any_ref(self).downcast_ref::<P>()
    }

    pub fn is<P: EventPayload>(&self) -> bool {
        AsAnyArc::as_any_ref(self).is::<P>()
    }
}

/// 将共享载荷转为具体类型的 `Arc`
pub fn downcast_payload<P: EventPayload>(
    payload: Arc<dyn EventPayload>,
) -> Result<Arc<P>, Arc<dyn Any + Send + Sync>> {
    AsAnyArc::as_any_arc(payload).downcast::<P>()
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Shape {}
    impl PayloadKind for Shape {
        fn kind() -> PayloadType {
            PayloadType::new::<Self>(Vec::new)
        }
    }

    enum Polygon {}
    impl PayloadKind for Polygon {
        fn kind() -> PayloadType {
            PayloadType::new::<Self>(|| vec![Shape::kind()])
        }
    }

    enum Labelled {}
    impl PayloadKind for Labelled {
        fn kind() -> PayloadType {
            PayloadType::new::<Self>(Vec::new)
        }
    }

    #[derive(Debug)]
    struct Square {
        side: u32,
    }
    impl PayloadKind for Square {
        fn kind() -> PayloadType {
            PayloadType::new::<Self>(|| vec![Polygon::kind(), Labelled::kind()])
        }
    }

    #[test]
    fn assignability_is_reflexive_and_transitive() {
        let square = Square::kind();
        assert!(square.is_assignable_from(&square));
        assert!(Polygon::kind().is_assignable_from(&square));
        assert!(Shape::kind().is_assignable_from(&square));
        assert!(Labelled::kind().is_assignable_from(&square));
        assert!(AnyPayload::kind().is_assignable_from(&square));

        assert!(!square.is_assignable_from(&Shape::kind()));
        assert!(!Labelled::kind().is_assignable_from(&Polygon::kind()));
    }

    #[test]
    fn strict_supertype_excludes_self() {
        assert!(!Square::kind().is_strict_supertype_of(&Square::kind()));
        assert!(Shape::kind().is_strict_supertype_of(&Polygon::kind()));
        assert!(!Polygon::kind().is_strict_supertype_of(&Shape::kind()));
    }

    #[test]
    fn dyn_payload_downcasts_to_concrete_type() {
        let payload: Arc<dyn EventPayload> = Arc::new(Square { side: 3 });
        assert_eq!(payload.runtime_type(), Square::kind());
        assert!(payload.is::<Square>());
        assert_eq!(payload.downcast_ref::<Square>().map(|s| s.side), Some(3));

        let concrete = downcast_payload::<Square>(payload).unwrap();
        assert_eq!(concrete.side, 3);
    }
}
