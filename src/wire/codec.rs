//! `|`-delimited sub-field encoding used inside a [`super::Frame`]'s payload (§6).
//!
//! Representative encodings: an SN-address reply is `"<ip>|<port>"`; a view reply is
//! `"<file>|<owner>|<words>|<chars>|"` repeated; an edit script is
//! `"<sent-idx>|<w-idx>|<word>|..."`. All of them are flat, ordered lists of fields
//! joined and split on a single `|` byte — nothing here escapes or length-prefixes,
//! per the §9 "edit-script injectivity" note (a field may not itself contain `|`).

/// Splits `s` on `|`, dropping a single trailing empty field left by a trailing
/// separator (the `"...|"` convention the view/list replies use).
pub fn decode_fields(s: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = s.split('|').collect();
    if fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

/// Joins `fields` with `|`, appending a trailing separator (matching the
/// `"<file>|<owner>|<words>|<chars>|"` convention used for repeated records).
pub fn encode_fields(fields: &[String]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let mut out = fields.join("|");
    out.push('|');
    out
}
