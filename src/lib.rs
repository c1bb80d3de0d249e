// Maxplace — TGVmax open-seat probability backend
// Serves precomputed opening-probability tables for TGVmax routes

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_unit_value,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

#[macro_use]
extern crate serde;

pub mod fetch;
pub mod index_builders;
pub mod models;
pub mod resolve;
pub mod table_parse;

use unicode_normalization::UnicodeNormalization;

/// Separator between origin and destination inside a route key.
/// A double pipe never occurs in station names.
pub const ROUTE_KEY_DELIM: &str = "||";

/// NFKC-normalize, collapse whitespace runs to a single space, trim.
/// Idempotent: `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(s: &str) -> String {
    let composed: String = s.nfkc().collect();

    let mut out = String::with_capacity(composed.len());
    let mut pending_space = false;
    for c in composed.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }

    out
}

/// Station names keep their case on purpose; the precomputed tables are
/// written with the same casing as the station list. Uppercasing both sides
/// is a possible future option if the pipeline ever stops guaranteeing that.
pub fn normalize_station(s: &str) -> String {
    normalize_text(s)
}

/// Directional route key: `route_key(A, B) != route_key(B, A)`.
pub fn route_key(origin: &str, destination: &str) -> String {
    format!(
        "{}{}{}",
        normalize_station(origin),
        ROUTE_KEY_DELIM,
        normalize_station(destination)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(
            normalize_text("  Paris   Gare de Lyon \t"),
            "Paris Gare de Lyon"
        );
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for s in [
            "  Paris  ",
            "Lyon\u{00a0}Part-Dieu",
            "ＭＡＲＳＥＩＬＬＥ",
            "",
            "   a\tb\nc   ",
        ] {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once);
        }
    }

    #[test]
    fn normalize_applies_nfkc() {
        // fullwidth forms compose to ASCII under NFKC
        assert_eq!(normalize_text("Ｐａｒｉｓ"), "Paris");
        // non-breaking space is whitespace after NFKC
        assert_eq!(normalize_text("Lyon\u{00a0}Perrache"), "Lyon Perrache");
    }

    #[test]
    fn station_case_is_preserved() {
        assert_eq!(
            normalize_station("Paris gare de lyon"),
            "Paris gare de lyon"
        );
    }

    #[test]
    fn route_keys_are_directional() {
        assert_ne!(route_key("PARIS", "LYON"), route_key("LYON", "PARIS"));
        assert_eq!(route_key(" PARIS ", "LYON"), "PARIS||LYON");
    }
}
