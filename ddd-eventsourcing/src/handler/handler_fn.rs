use super::param::Param;
use super::slot::{ParameterSlot, ResolvedValue};
use crate::error::{HandlerError, HandlerResult};

/// 处理器返回值：`()` 或 `Result<(), E>`
pub trait HandlerOutput {
    fn into_handler_result(self) -> anyhow::Result<()>;
}

impl HandlerOutput for () {
    fn into_handler_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<Er> HandlerOutput for Result<(), Er>
where
    Er: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// 可作为事件处理器的函数：`Fn(&mut E, A1, .., An) -> R`，`n <= 6`
///
/// `Args` 仅用于区分不同元数的实现，调用方无需指定。
pub trait Handler<E, Args>: Send + Sync + 'static {
    /// 按声明顺序给出全部参数槽
    fn slots() -> Vec<ParameterSlot>;

    /// 参数已全部解析后调用处理器；方法体的错误包装为 `HandlerError::Handler`
    fn call(&self, entity: &mut E, args: Vec<ResolvedValue>) -> HandlerResult<()>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<E, F, R, $($ty,)*> Handler<E, ($($ty,)*)> for F
        where
            E: 'static,
            F: Fn(&mut E, $($ty,)*) -> R + Send + Sync + 'static,
            R: HandlerOutput,
            $($ty: Param,)*
        {
            fn slots() -> Vec<ParameterSlot> {
                vec![$(<$ty as Param>::slot(),)*]
            }

            fn call(&self, entity: &mut E, args: Vec<ResolvedValue>) -> HandlerResult<()> {
                let expected = Self::slots().len();
                if args.len() != expected {
                    return Err(HandlerError::ArgumentCount {
                        expected,
                        actual: args.len(),
                    });
                }

                let mut args = args.into_iter();
                $(
                    let $ty = args
                        .next()
                        .ok_or(HandlerError::ArgumentCount { expected, actual: 0 })
                        .and_then(<$ty as Param>::from_resolved)?;
                )*

                (self)(entity, $($ty,)*)
                    .into_handler_result()
                    .map_err(HandlerError::Handler)
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
