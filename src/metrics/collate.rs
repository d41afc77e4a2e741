//! Locale-style string ordering for display labels.
//!
//! Uses the Unicode Collation Algorithm with the CLDR root tailoring and
//! punctuation kept significant, matching a browser's `localeCompare`.
//! Byte order breaks any remaining tie so the ordering is total.

use std::cell::RefCell;
use std::cmp::Ordering;

use feruca::{Collator, Locale, Tailoring};

thread_local! {
    static COLLATOR: RefCell<Collator> =
        RefCell::new(Collator::new(Tailoring::Cldr(Locale::Root), false, false));
}

pub fn compare(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|c| c.borrow_mut().collate(a, b))
        .then_with(|| a.cmp(b))
}
