//! Short-i matra reordering
//!
//! A glyph-by-glyph text operator draws characters in storage order, so the
//! short-i matra (U+093F) lands after its consonant instead of before it.
//! Swapping the pair in the string makes such an operator show the right
//! order for this one matra. Conjuncts and other matras are not handled; use
//! the rasterizer for anything that needs real shaping.
//!
//! Visual order is ambiguous as a plain string: the visual form of "गणित"
//! is the storage form of a different word. Reordered text therefore stays
//! in [`VisualText`], which hands out characters but never a `&str`, and
//! [`reorder_short_i`] passes a `VisualText` through as is.

use crate::script::VOWEL_SIGN_I;
use std::fmt;
use std::str::Chars;

/// Text in visual order, as produced by [`reorder_short_i`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualText(String);

impl VisualText {
    pub fn chars(&self) -> Chars<'_> {
        self.0.chars()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VisualText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text the short-i transform accepts
///
/// Storage-order strings are reordered. A [`VisualText`] is already in
/// visual order and comes back unchanged.
pub trait ShortIText {
    fn to_visual(&self) -> VisualText;
}

impl ShortIText for str {
    fn to_visual(&self) -> VisualText {
        VisualText(reorder_logical(self))
    }
}

impl ShortIText for String {
    fn to_visual(&self) -> VisualText {
        self.as_str().to_visual()
    }
}

impl ShortIText for VisualText {
    fn to_visual(&self) -> VisualText {
        self.clone()
    }
}

/// A character the matra can be moved in front of
fn is_reorder_base(c: char) -> bool {
    !c.is_whitespace() && c != VOWEL_SIGN_I
}

/// Move every U+093F in front of the base character it follows
///
/// A matra at the start of the text, after whitespace or after another
/// U+093F is left where it is. Passing the result back in is a no-op.
///
/// # Example
/// ```ignore
/// let visual = reorder_short_i("कि");
/// assert_eq!(visual.to_string(), "\u{093F}क");
/// assert_eq!(reorder_short_i(&visual), visual);
/// ```
pub fn reorder_short_i<T: ShortIText + ?Sized>(text: &T) -> VisualText {
    text.to_visual()
}

fn reorder_logical(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;

    for c in text.chars() {
        match prev {
            Some(base) if c == VOWEL_SIGN_I && is_reorder_base(base) => {
                out.pop();
                out.push(VOWEL_SIGN_I);
                out.push(base);
            }
            _ => out.push(c),
        }
        prev = Some(c);
    }

    out
}
