//! Property tests: printed codes decode back to the ids they were made from.

use cleanflow_scan::parser::{self, format_query_code, format_token_code};
use cleanflow_types::{ParseError, ScanSource};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Lowercase ids, possibly hyphenated ("room-1", "or-suite-a")
fn arb_id() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,2}"
}

/// Any non-empty printable text, including reserved query characters
fn arb_text() -> impl Strategy<Value = String> {
    "[ -~]{1,16}"
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn token_code_roundtrip(area in arb_id(), procedure in arb_id()) {
        let payload = parser::parse(ScanSource::Qr, &format_token_code(&area, &procedure)).unwrap();

        prop_assert_eq!(payload.kind(), ScanSource::Qr);
        prop_assert_eq!(payload.area_id().as_str(), area.as_str());
        prop_assert_eq!(payload.procedure_id().map(|p| p.as_str()), Some(procedure.as_str()));
    }

    #[test]
    fn query_code_roundtrip(
        area in arb_text(),
        procedure in proptest::option::of(arb_text()),
        name in arb_text(),
    ) {
        let code = format_query_code(&area, procedure.as_deref(), &name);
        let payload = parser::parse(ScanSource::Qr, &code).unwrap();

        prop_assert_eq!(payload.area_id().as_str(), area.as_str());
        prop_assert_eq!(payload.procedure_id().map(|p| p.as_str()), procedure.as_deref());
        prop_assert_eq!(payload.label(), Some(name.as_str()));
    }

    #[test]
    fn nfc_roundtrip(area in "[a-z0-9-]{1,12}", asset in "[a-z_]{1,16}") {
        let payload = parser::parse(ScanSource::Nfc, &format!("{area}:{asset}")).unwrap();

        prop_assert_eq!(payload.kind(), ScanSource::Nfc);
        prop_assert_eq!(payload.area_id().as_str(), area.as_str());
        prop_assert_eq!(payload.asset_type(), Some(asset.as_str()));
        prop_assert!(payload.procedure_id().is_none());
    }

    /// NFC input never goes through the QR formats, and vice versa
    #[test]
    fn sources_do_not_cross(area in arb_id(), procedure in arb_id()) {
        let token = format_token_code(&area, &procedure);
        prop_assert!(parser::parse(ScanSource::Nfc, &token).is_err());

        let nfc = format!("{area}:{procedure}");
        let qr = parser::parse(ScanSource::Qr, &nfc);
        prop_assert!(matches!(qr, Err(ParseError::MalformedTokenFormat(_))));
    }

    /// Parsing never panics, whatever the scanner hands over
    #[test]
    fn arbitrary_input_never_panics(raw in "\\PC{0,64}") {
        let _ = parser::parse(ScanSource::Qr, &raw);
        let _ = parser::parse(ScanSource::Nfc, &raw);
    }
}
