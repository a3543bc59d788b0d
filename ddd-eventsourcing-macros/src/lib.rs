use proc_macro::TokenStream;
use syn::spanned::Spanned;
use syn::{DeriveInput, Item, parse_macro_input};

mod event_payload;
mod event_sourced;
mod utils;

/// 载荷派生宏
/// - 为目标类型实现 `::ddd_eventsourcing::payload::PayloadKind`
/// - 支持参数：`#[payload(extends(A, B))]`，声明直接超类型（顺序即声明顺序）
/// - 不支持泛型类型
#[proc_macro_derive(EventPayload, attributes(payload))]
pub fn derive_event_payload(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    event_payload::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 事件溯源实体宏
/// - 标注在实体的固有 impl 块上，收集其中 `#[event_handler]` 标记的方法
/// - 自动实现 `::ddd_eventsourcing::entity::EventSourcedEntity`（`describe` 等）
/// - 支持参数：
///   - `extends = field`：祖先类作为字段组合，其处理器与子实体被继承
///   - `child = field` / `children = field`：单个（或可选）子实体、子实体集合，可重复，保持声明顺序
///   - `cache = field`：`InvokerSlot<Self>` 字段，缓存调用器
///   - `name = "..."`：实体名，默认取类型名
///
/// 处理器方法形如 `fn on_x(&mut self, ...) -> R`，至多 6 个参数；
/// 首个参数不是载荷时需显式给出 `#[event_handler(payload = Type)]`。
#[proc_macro_attribute]
pub fn event_sourced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as event_sourced::SourcedConfig);
    let input = parse_macro_input!(item as Item);

    let item_impl = match input {
        Item::Impl(item_impl) => item_impl,
        other => {
            return syn::Error::new(other.span(), "#[event_sourced] only on impl block")
                .to_compile_error()
                .into();
        }
    };

    event_sourced::expand(cfg, item_impl)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 处理器标记，仅在 `#[event_sourced]` impl 块内有效（由外层宏消费）
#[proc_macro_attribute]
pub fn event_handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item2: proc_macro2::TokenStream = item.into();
    let error = syn::Error::new(
        item2.span(),
        "#[event_handler] must be used inside an #[event_sourced] impl block",
    )
    .to_compile_error();
    quote::quote! {
        #error
        #item2
    }
    .into()
}
