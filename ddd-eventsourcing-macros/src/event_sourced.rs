use crate::utils::{AttrKv, KvType, duplicate_key, field_ident, lit_str};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, Ident, ImplItem, ItemImpl, LitStr, Result as SynResult, Signature, Token,
    Type,
};

// 处理器参数上限（不含 &mut self），与核心库 Handler 的实现一致
const MAX_HANDLER_PARAMS: usize = 6;

enum ChildKind {
    Single,
    Collection,
}

struct ChildDecl {
    kind: ChildKind,
    field: Ident,
}

// 解析 event_sourced 宏键值参数
pub(crate) struct SourcedConfig {
    extends: Option<Ident>,
    children: Vec<ChildDecl>,
    cache: Option<Ident>,
    name: Option<LitStr>,
}

impl Parse for SourcedConfig {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let mut cfg = Self {
            extends: None,
            children: Vec::new(),
            cache: None,
            name: None,
        };

        if input.is_empty() {
            return Ok(cfg);
        }

        let pairs = Punctuated::<AttrKv, Token![,]>::parse_terminated(input)?;
        for kv in pairs {
            match kv.key.to_string().as_str() {
                "extends" => {
                    if cfg.extends.is_some() {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "an entity can extend at most one ancestor",
                        ));
                    }
                    cfg.extends = Some(field_ident(&kv.key, &kv.value)?);
                }
                "child" => cfg.children.push(ChildDecl {
                    kind: ChildKind::Single,
                    field: field_ident(&kv.key, &kv.value)?,
                }),
                "children" => cfg.children.push(ChildDecl {
                    kind: ChildKind::Collection,
                    field: field_ident(&kv.key, &kv.value)?,
                }),
                "cache" => {
                    if cfg.cache.is_some() {
                        return Err(duplicate_key(&kv.key));
                    }
                    cfg.cache = Some(field_ident(&kv.key, &kv.value)?);
                }
                "name" => {
                    if cfg.name.is_some() {
                        return Err(duplicate_key(&kv.key));
                    }
                    cfg.name = Some(lit_str(&kv.key, kv.value)?);
                }
                _ => {
                    return Err(syn::Error::new(
                        kv.key.span(),
                        "unknown key; expected 'extends' | 'child' | 'children' | 'cache' | 'name'",
                    ));
                }
            }
        }

        Ok(cfg)
    }
}

struct HandlerAttr {
    payload: Option<Type>,
}

pub(crate) fn expand(cfg: SourcedConfig, mut item: ItemImpl) -> SynResult<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(
            path.span(),
            "#[event_sourced] must be placed on an inherent impl block",
        ));
    }

    // 收集被 #[event_handler] 标记的方法，并移除该标记
    let mut registrations = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let Some(handler) = take_handler_attr(&mut method.attrs)? else {
            continue;
        };
        check_signature(&method.sig)?;

        let ident = &method.sig.ident;
        let method_name = LitStr::new(&ident.to_string(), ident.span());
        let payload = handler.payload.map(|ty| quote! { .payload::<#ty>() });
        registrations.push(quote! {
            class.handler(#method_name, Self::#ident) #payload;
        });
    }

    let children = cfg.children.iter().map(|decl| {
        let field = &decl.field;
        let name = LitStr::new(&field.to_string(), field.span());
        match decl.kind {
            ChildKind::Single => quote! { class.child(#name, |entity| &mut entity.#field); },
            ChildKind::Collection => quote! { class.children(#name, |entity| &mut entity.#field); },
        }
    });

    let extends = cfg
        .extends
        .map(|field| quote! { class.extends(|entity| &mut entity.#field); });

    let name_fn = cfg.name.map(|lit| {
        quote! {
            fn entity_name() -> &'static str {
                #lit
            }
        }
    });

    let cache_fn = cfg.cache.map(|field| {
        quote! {
            fn invoker_slot(
                &self,
            ) -> ::std::option::Option<&::ddd_eventsourcing::entity::InvokerSlot<Self>> {
                ::std::option::Option::Some(&self.#field)
            }
        }
    });

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    Ok(quote! {
        #item

        impl #impl_generics ::ddd_eventsourcing::entity::EventSourcedEntity for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn describe(class: &mut ::ddd_eventsourcing::entity::EntityClass<Self>) {
                #( #registrations )*
                #( #children )*
                #extends
            }

            #name_fn

            #cache_fn
        }
    })
}

fn take_handler_attr(attrs: &mut Vec<Attribute>) -> SynResult<Option<HandlerAttr>> {
    let mut found: Option<HandlerAttr> = None;
    let mut retained = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        if !attr.path().is_ident("event_handler") {
            retained.push(attr);
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "duplicate #[event_handler] on this method",
            ));
        }
        found = Some(parse_handler_attr(&attr)?);
    }

    *attrs = retained;
    Ok(found)
}

fn parse_handler_attr(attr: &Attribute) -> SynResult<HandlerAttr> {
    match &attr.meta {
        syn::Meta::Path(_) => Ok(HandlerAttr { payload: None }),
        syn::Meta::List(_) => {
            let mut payload: Option<Type> = None;
            let pairs = attr.parse_args_with(Punctuated::<KvType, Token![,]>::parse_terminated)?;
            for kv in pairs {
                match kv.key.to_string().as_str() {
                    "payload" => {
                        if payload.is_some() {
                            return Err(duplicate_key(&kv.key));
                        }
                        payload = Some(kv.ty);
                    }
                    _ => {
                        return Err(syn::Error::new(
                            kv.key.span(),
                            "unknown key; expected 'payload'",
                        ));
                    }
                }
            }
            Ok(HandlerAttr { payload })
        }
        other => Err(syn::Error::new(
            other.span(),
            "expected #[event_handler] or #[event_handler(payload = Type)]",
        )),
    }
}

fn check_signature(sig: &Signature) -> SynResult<()> {
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_some() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "event handler must take `&mut self` as its first parameter",
            ));
        }
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "event handler methods cannot be generic",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(
            sig.span(),
            "event handler methods must be synchronous",
        ));
    }
    if sig.inputs.len() - 1 > MAX_HANDLER_PARAMS {
        return Err(syn::Error::new(
            sig.inputs.span(),
            format!("event handler takes at most {MAX_HANDLER_PARAMS} parameters besides `&mut self`"),
        ));
    }
    Ok(())
}
