extern crate proc_macro;
extern crate proc_macro2;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::parse_macro_input;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, LitStr, Token};

mod parsers;

use parsers::{parse_format, ArgKind, Slot};

/// Builds an `evecmd::strfmt::Message` from an EVE printf-style format
/// string and the values for its verbs.
///
/// Each verb decides how its argument is encoded: `%d` and `%i` take a
/// signed integer, `%u`, `%o`, `%x` and `%X` take an unsigned integer and
/// `%c` takes a `char`. String verbs (`%s`) would need a pointer into the
/// chip's memory and are rejected.
///
/// A string with no verbs at all produces a literal message, which draws
/// without the format option.
#[proc_macro]
pub fn eve_format(input: TokenStream) -> TokenStream {
    let call = parse_macro_input!(input as FormatCall);
    match expand(&call) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn wrap(kind: ArgKind, expr: &Expr) -> TokenStream2 {
    match kind {
        ArgKind::Int => quote!(::evecmd::strfmt::Argument::Int(#expr)),
        ArgKind::UInt => quote!(::evecmd::strfmt::Argument::UInt(#expr)),
        ArgKind::Char => quote!(::evecmd::strfmt::Argument::Char(#expr)),
    }
}

fn expand(call: &FormatCall) -> syn::Result<TokenStream2> {
    let fmt = &call.fmt;
    let format = parse_format(&fmt.value().into_bytes())
        .map_err(|err| syn::Error::new(fmt.span(), err.to_string()))?;

    let wanted = format.given_count();
    if call.args.len() < wanted {
        return Err(syn::Error::new(
            fmt.span(),
            format!(
                "format string has {} verbs but only {} arguments were given",
                wanted,
                call.args.len()
            ),
        ));
    }
    if call.args.len() > wanted {
        return Err(syn::Error::new(
            call.args[wanted].span(),
            "too many arguments for format string",
        ));
    }

    let text = syn::LitByteStr::new(&format.text, fmt.span());
    if !format.needs_format {
        return Ok(quote!(::evecmd::strfmt::Message::new_literal(#text)));
    }

    let zero: Expr = syn::parse_quote!('\0');
    let mut given = call.args.iter();
    let mut elems: Vec<TokenStream2> = Vec::with_capacity(format.slots.len());
    for slot in format.slots.iter() {
        let elem = match *slot {
            Slot::Zero => wrap(ArgKind::Char, &zero),
            Slot::Given(kind) => match given.next() {
                Some(expr) => wrap(kind, expr),
                None => return Err(syn::Error::new(Span::call_site(), "ran out of arguments")),
            },
        };
        elems.push(elem);
    }

    Ok(quote!(::evecmd::strfmt::Message::new(#text, &[#(#elems),*])))
}

struct FormatCall {
    fmt: LitStr,
    args: Punctuated<Expr, Token![,]>,
}

impl Parse for FormatCall {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let fmt: LitStr = input.parse()?;
        let args = if input.parse::<Option<Token![,]>>()?.is_some() {
            Punctuated::parse_terminated(input)?
        } else {
            Punctuated::new()
        };
        Ok(FormatCall {
            fmt: fmt,
            args: args,
        })
    }
}
