use syn::parse::{Parse, ParseStream};
use syn::spanned::Spanned;
use syn::{Expr, Ident, LitStr, Result as SynResult, Token, Type};

// 键值参数：key = <expr>
pub(crate) struct AttrKv {
    pub(crate) key: Ident,
    #[allow(dead_code)]
    pub(crate) eq: Token![=],
    pub(crate) value: Expr,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> SynResult<Self> {
        Ok(Self {
            key: input.parse()?,
            eq: input.parse()?,
            value: input.parse()?,
        })
    }
}

// 键值参数：key = <Type>
pub(crate) struct KvType {
    pub(crate) key: Ident,
    #[allow(dead_code)]
    pub(crate) eq: Token![=],
    pub(crate) ty: Type,
}

impl Parse for KvType {
    fn parse(input: ParseStream) -> SynResult<Self> {
        let key: Ident = input.parse()?;
        let eq: Token![=] = input.parse()?;
        let ty: Type = input.parse()?;
        Ok(Self { key, eq, ty })
    }
}

// 取出单个标识符形式的字段名，例如 `lines`
pub(crate) fn field_ident(key: &Ident, value: &Expr) -> SynResult<Ident> {
    match value {
        Expr::Path(p) if p.qself.is_none() => p.path.get_ident().cloned().ok_or_else(|| {
            syn::Error::new(
                p.span(),
                format!("expected a field name for '{key}'"),
            )
        }),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected a field name for '{key}'"),
        )),
    }
}

pub(crate) fn lit_str(key: &Ident, value: Expr) -> SynResult<LitStr> {
    match value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(lit),
        other => Err(syn::Error::new(
            other.span(),
            format!("expected string literal for '{key}'"),
        )),
    }
}

pub(crate) fn duplicate_key(key: &Ident) -> syn::Error {
    syn::Error::new(key.span(), format!("duplicate key '{key}' in attribute"))
}
