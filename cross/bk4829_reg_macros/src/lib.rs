//! `#[address(..)]` attribute for BK4829 register structs.
//!
//! Written against the bare `proc_macro` API so the crate stays dependency-free.

use proc_macro::{Delimiter, Literal, TokenStream, TokenTree};

/// Highest register address the 3-wire bus can encode. Bit 7 of the
/// command byte is the read flag.
const MAX_ADDRESS: u32 = 0x7F;

/// Bind a register address to a register struct.
///
/// ```ignore
/// #[address(0x30)]
/// #[bitfield(u16)]
/// pub struct Reg30 { .. }
/// ```
///
/// Adds an inherent `ADDRESS` constant and implements
/// `crate::regmap::RegisterAddress` for the struct.
#[proc_macro_attribute]
pub fn address(attr: TokenStream, item: TokenStream) -> TokenStream {
    let address = match register_address(attr) {
        Ok(address) => address,
        Err(msg) => return compile_error(msg),
    };
    let name = match struct_name(&item) {
        Some(name) => name,
        None => return compile_error("#[address] expects a `struct` item"),
    };

    let generated = format!(
        "impl {name} {{ pub const ADDRESS: u8 = {address:#04x}; }}\n\
         impl crate::regmap::RegisterAddress for {name} {{ const ADDRESS: u8 = {address:#04x}; }}"
    );

    let mut out = item;
    match generated.parse::<TokenStream>() {
        Ok(ts) => out.extend(ts),
        Err(_) => return compile_error("#[address] failed to generate impls"),
    }
    out
}

fn register_address(attr: TokenStream) -> Result<u32, &'static str> {
    let mut tokens = attr.into_iter();
    let literal = match tokens.next() {
        Some(TokenTree::Literal(lit)) => lit,
        // Some formatters wrap the argument in an extra pair of parentheses.
        Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Parenthesis => {
            match g.stream().into_iter().next() {
                Some(TokenTree::Literal(lit)) => lit,
                _ => return Err("expected #[address(<integer>)]"),
            }
        }
        _ => return Err("expected #[address(<integer>)]"),
    };
    if tokens.next().is_some() {
        return Err("#[address] takes exactly one integer literal");
    }

    let value = parse_integer(&literal).ok_or("#[address] argument is not an integer literal")?;
    if value > MAX_ADDRESS {
        return Err("register address must be in 0x00..=0x7F");
    }
    Ok(value)
}

fn parse_integer(literal: &Literal) -> Option<u32> {
    let text = literal.to_string().replace('_', "");
    let text = text.trim_end_matches("u8");
    match text.get(..2) {
        Some("0x") | Some("0X") => u32::from_str_radix(&text[2..], 16).ok(),
        Some("0b") | Some("0B") => u32::from_str_radix(&text[2..], 2).ok(),
        _ => text.parse().ok(),
    }
}

fn struct_name(item: &TokenStream) -> Option<String> {
    let mut after_struct = false;
    for tt in item.clone() {
        if let TokenTree::Ident(ident) = tt {
            let ident = ident.to_string();
            if after_struct {
                return Some(ident);
            }
            after_struct = ident == "struct";
        }
    }
    None
}

fn compile_error(msg: &str) -> TokenStream {
    format!("compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}
